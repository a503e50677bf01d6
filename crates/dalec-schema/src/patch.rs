// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use serde::{Deserialize, Serialize};

pub const DEFAULT_PATCH_STRIP: u32 = 1;

/// One patch application against a source.
///
/// `source` names the spec source holding the patch file and
/// `path` the file within it (required when that source is a
/// directory). Patches in a list apply in declared order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatchSpec {
    pub source: String,
    /// Path components stripped when applying, as `patch -p<n>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip: Option<u32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl PatchSpec {
    pub(crate) fn fill_defaults(&mut self) {
        if self.strip.is_none() {
            self.strip = Some(DEFAULT_PATCH_STRIP);
        }
    }

    pub fn strip(&self) -> u32 {
        self.strip.unwrap_or(DEFAULT_PATCH_STRIP)
    }
}
