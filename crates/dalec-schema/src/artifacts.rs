// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn is_false(v: &bool) -> bool {
    !*v
}

/// What the build produces and where it installs.
///
/// Each artifact map is keyed by a path into the build output,
/// with per-entry install configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binaries: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libexec: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manpages: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_dirs: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_files: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub docs: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub licenses: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libs: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, ArtifactConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directories: Option<ArtifactDirectories>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systemd: Option<SystemdConfiguration>,
    /// Symlinks to create at install, keyed by link target (the
    /// existing file) with the link locations to create.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, ArtifactSymlinkConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<AccountConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<AccountConfig>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_strip: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_auto_requires: bool,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Subdirectory under the artifact kind's install root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpath: String,
    /// Replacement file name at install.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub permissions: u32,
}

/// Directories the package creates at install time.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactDirectories {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, DirConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state: BTreeMap<String, DirConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DirConfig {
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub mode: u32,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SystemdConfiguration {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub units: BTreeMap<String, SystemdUnitConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dropins: BTreeMap<String, SystemdUnitConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SystemdUnitConfig {
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Where to create symlinks for one link target.
///
/// `path` and `paths` are mutually exclusive; every resulting
/// link location must be unique across the whole map.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSymlinkConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "crate::is_zero_i64")]
    pub uid: i64,
    #[serde(default, skip_serializing_if = "crate::is_zero_i64")]
    pub gid: i64,
}

impl ArtifactSymlinkConfig {
    pub fn newpaths(&self) -> impl Iterator<Item = &str> {
        self.path
            .is_empty()
            .then_some(self.paths.as_slice())
            .unwrap_or(std::slice::from_ref(&self.path))
            .iter()
            .map(String::as_str)
    }
}

/// A system user or group the package requires.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}
