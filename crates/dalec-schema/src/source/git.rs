// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use serde::{Deserialize, Serialize};

fn is_false(v: &bool) -> bool {
    !*v
}

/// Source files cloned from a git repository at a fixed commit.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GitSource {
    pub url: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub keep_git_dir: bool,
    #[serde(default, skip_serializing_if = "GitAuth::is_empty")]
    pub auth: GitAuth,
}

/// Names of secrets used to authenticate against the remote.
///
/// Each field selects a different transport: an authorization
/// header value, a bearer token, or an ssh agent socket.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GitAuth {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub header: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh: String,
}

impl GitAuth {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.token.is_empty() && self.ssh.is_empty()
    }
}
