// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "./platform_test.rs"]
mod platform_test;

/// An execution platform in `<os>/<arch>[/<variant>]` form.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,
}

impl Platform {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
            variant: String::new(),
        }
    }

    /// The platform of the machine running this process.
    pub fn host() -> Self {
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(std::env::consts::OS, arch)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)?;
        if !self.variant.is_empty() {
            write!(f, "/{}", self.variant)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(os), Some(arch)) = (parts.next(), parts.next()) else {
            return Err(Error::InvalidPlatform(s.to_string()));
        };
        let variant = parts.next().unwrap_or_default();
        if os.is_empty() || arch.is_empty() || parts.next().is_some() {
            return Err(Error::InvalidPlatform(s.to_string()));
        }
        Ok(Self {
            os: os.to_string(),
            arch: arch.to_string(),
            variant: variant.to_string(),
        })
    }
}
