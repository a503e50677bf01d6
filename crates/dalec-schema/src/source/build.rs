// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Source;

pub(crate) const DEFAULT_DOCKERFILE_NAME: &str = "Dockerfile";

/// Source files produced by a dockerfile build of another source.
///
/// The inner source must not itself be a build source.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSource {
    pub source: Box<Source>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dockerfile_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

impl BuildSource {
    pub(crate) fn fill_defaults(&mut self) {
        if self.dockerfile_path.is_empty() {
            self.dockerfile_path = DEFAULT_DOCKERFILE_NAME.to_string();
        }
        self.source.fill_defaults();
    }
}
