// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Source content written directly in the spec, either a single
/// file or a flat directory of files.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InlineSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<InlineFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<InlineDir>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InlineFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contents: String,
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub permissions: u32,
    #[serde(default, skip_serializing_if = "crate::is_zero_i64")]
    pub uid: i64,
    #[serde(default, skip_serializing_if = "crate::is_zero_i64")]
    pub gid: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InlineDir {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, InlineFile>,
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub permissions: u32,
    #[serde(default, skip_serializing_if = "crate::is_zero_i64")]
    pub uid: i64,
    #[serde(default, skip_serializing_if = "crate::is_zero_i64")]
    pub gid: i64,
}
