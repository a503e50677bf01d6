// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_NAME: &str = "context";

/// Source files taken from a locally supplied build context.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl ContextSource {
    pub(crate) fn fill_defaults(&mut self) {
        if self.name.is_empty() {
            self.name = DEFAULT_CONTEXT_NAME.to_string();
        }
    }
}
