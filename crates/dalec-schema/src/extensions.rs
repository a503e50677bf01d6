// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./extensions_test.rs"]
mod extensions_test;

/// Top-level document keys beginning with `x-`/`X-`.
///
/// Extension values are kept as raw yaml sub-trees so that
/// third-party content is not canonicalised: whatever was written
/// survives a marshal round-trip verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extensions(BTreeMap<String, serde_yaml::Value>);

impl Extensions {
    pub fn is_valid_key(key: &str) -> bool {
        key.starts_with("x-") || key.starts_with("X-")
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: serde_yaml::Value) -> Result<()> {
        if !Self::is_valid_key(key) {
            return Err(Error::InvalidExtensionKey(key.to_string()));
        }
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_yaml::Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_yaml::Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
