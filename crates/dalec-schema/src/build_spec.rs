// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::source::BuildStep;

pub const NETWORK_MODE_NONE: &str = "none";
pub const NETWORK_MODE_SANDBOX: &str = "sandbox";

/// The network configuration of package build steps.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    None,
    Sandbox,
}

/// How the package itself is built: the ordered commands to run
/// and their execution environment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactBuild {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<BuildStep>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// One of `none` (default) or `sandbox`. Kept as written so
    /// that validation can report bad values with a position.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_mode: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub caches: BTreeMap<String, CacheDirConfig>,
}

impl ArtifactBuild {
    pub(crate) fn fill_defaults(&mut self) {
        if self.network_mode.is_empty() {
            self.network_mode = NETWORK_MODE_NONE.to_string();
        }
    }

    /// The validated network mode. Only meaningful after
    /// validation has accepted the raw string.
    pub fn network(&self) -> NetworkMode {
        match self.network_mode.as_str() {
            NETWORK_MODE_SANDBOX => NetworkMode::Sandbox,
            _ => NetworkMode::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
            && self.env.is_empty()
            && self.network_mode.is_empty()
            && self.caches.is_empty()
    }
}

/// A persistent cache directory attached to build or test steps.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheDirConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default)]
    pub mode: CacheSharingMode,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheSharingMode {
    #[default]
    Shared,
    Private,
    Locked,
}
