// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifacts::Artifacts;
use crate::dependencies::{PackageConstraints, PackageDependencies};
use crate::image_spec::ImageConfig;
use crate::test_spec::TestSpec;

/// Per-target overrides of the root spec configuration.
///
/// Fields left unset fall back to the root; see
/// [`crate::ResolvedSpec`] for the merge rules.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<PackageDependencies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Artifacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_config: Option<PackageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provides: Option<BTreeMap<String, PackageConstraints>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<BTreeMap<String, PackageConstraints>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<BTreeMap<String, PackageConstraints>>,
    /// Appended after the root tests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<PackageSigner>,
}

/// A signing frontend applied to built packages.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSigner {
    /// Image reference of the signing frontend.
    pub image: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}
