// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactSymlinkConfig;
use crate::source::{ImageSource, Source, SourceKind};

#[cfg(test)]
#[path = "./image_spec_test.rs"]
mod image_spec_test;

/// The variable name of a `NAME=value` environment entry.
fn env_name(entry: &str) -> &str {
    entry.split('=').next().unwrap_or(entry)
}

/// Configuration applied to output container images.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entrypoint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cmd: String,
    /// `NAME=value` pairs, appended in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Volume>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stop_signal: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Deprecated; migrated into the head of `bases` when filling
    /// defaults.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bases: Option<Vec<BaseImage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<PostInstall>,
}

/// An empty marker, matching the image-config volume format.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Volume {}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BaseImage {
    /// The source producing the base rootfs.
    pub rootfs: Source,
}

/// Modifications applied after package installation.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PostInstall {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub symlinks: BTreeMap<String, ArtifactSymlinkConfig>,
}

impl ImageConfig {
    /// Migrate the deprecated `base` field into `bases`.
    ///
    /// When both fields are set nothing moves; validation rejects
    /// that combination.
    pub(crate) fn fill_defaults(&mut self) {
        if self.base.is_empty() || self.bases.is_some() {
            return;
        }
        let reference = std::mem::take(&mut self.base);
        self.bases = Some(vec![BaseImage {
            rootfs: Source::new(SourceKind::Image(ImageSource {
                reference,
                cmd: None,
            })),
        }]);
    }

    /// Overlay the given config on top of this one.
    ///
    /// Scalars replace when set; env appends with replacement on
    /// duplicate variable names; labels and volumes merge by key;
    /// a set `bases` replaces wholesale, even when empty.
    pub(crate) fn merge(&mut self, other: &ImageConfig) {
        if !other.entrypoint.is_empty() {
            self.entrypoint = other.entrypoint.clone();
        }
        if !other.cmd.is_empty() {
            self.cmd = other.cmd.clone();
        }
        if !other.working_dir.is_empty() {
            self.working_dir = other.working_dir.clone();
        }
        if !other.stop_signal.is_empty() {
            self.stop_signal = other.stop_signal.clone();
        }
        if !other.user.is_empty() {
            self.user = other.user.clone();
        }
        for entry in other.env.iter() {
            let name = env_name(entry);
            let existing = self.env.iter_mut().find(|e| env_name(e) == name);
            match existing {
                Some(slot) => *slot = entry.clone(),
                None => self.env.push(entry.clone()),
            }
        }
        for (key, value) in other.labels.iter() {
            self.labels.insert(key.clone(), value.clone());
        }
        for (key, value) in other.volumes.iter() {
            self.volumes.insert(key.clone(), value.clone());
        }
        if other.bases.is_some() {
            self.bases = other.bases.clone();
        }
        if other.post.is_some() {
            self.post = other.post.clone();
        }
    }
}
