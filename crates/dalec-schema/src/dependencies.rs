// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::args::Substituter;
use crate::scalar::ScalarString;
use crate::source::{Source, SourceMount};

#[cfg(test)]
#[path = "./dependencies_test.rs"]
mod dependencies_test;

/// Version and architecture constraints on one package dependency.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConstraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arch: Vec<String>,
}

impl PackageConstraints {
    pub fn is_empty(&self) -> bool {
        self.version.is_empty() && self.arch.is_empty()
    }
}

/// Package names mapped to their constraints.
///
/// Decodes from the mapping form or from the legacy plain list of
/// names, which upgrades to the mapping form with no constraints.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct DependencyList(pub BTreeMap<String, PackageConstraints>);

impl DependencyList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::ops::Deref for DependencyList {
    type Target = BTreeMap<String, PackageConstraints>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for DependencyList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> From<[(&str, PackageConstraints); N]> for DependencyList {
    fn from(entries: [(&str, PackageConstraints); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, constraints)| (name.to_string(), constraints))
                .collect(),
        )
    }
}

struct DependencyListVisitor;

impl<'de> serde::de::Visitor<'de> for DependencyListVisitor {
    type Value = DependencyList;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a map of package names to constraints, or a list of package names")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some(name) = seq.next_element::<ScalarString>()? {
            entries.insert(name.0, PackageConstraints::default());
        }
        Ok(DependencyList(entries))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some(name) = map.next_key::<String>()? {
            let constraints = map
                .next_value::<Option<PackageConstraints>>()?
                .unwrap_or_default();
            entries.insert(name, constraints);
        }
        Ok(DependencyList(entries))
    }

    fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(DependencyList::default())
    }
}

impl<'de> Deserialize<'de> for DependencyList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_any(DependencyListVisitor)
    }
}

/// The package dependencies of a spec, by usage.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDependencies {
    #[serde(default, skip_serializing_if = "DependencyList::is_empty")]
    pub build: DependencyList,
    #[serde(default, skip_serializing_if = "DependencyList::is_empty")]
    pub runtime: DependencyList,
    #[serde(default, skip_serializing_if = "DependencyList::is_empty")]
    pub recommends: DependencyList,
    #[serde(default, skip_serializing_if = "DependencyList::is_empty")]
    pub sysext: DependencyList,
    #[serde(default, skip_serializing_if = "DependencyList::is_empty")]
    pub test: DependencyList,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_repos: Vec<PackageRepositoryConfig>,
}

impl PackageDependencies {
    pub(crate) fn fill_defaults(&mut self) {
        for repo in self.extra_repos.iter_mut() {
            repo.fill_defaults();
        }
    }

    pub(crate) fn process_build_args(&mut self, sub: &mut Substituter<'_>, path: &str) {
        for (field, list) in [
            ("build", &mut self.build),
            ("runtime", &mut self.runtime),
            ("recommends", &mut self.recommends),
            ("sysext", &mut self.sysext),
            ("test", &mut self.test),
        ] {
            for (name, constraints) in list.iter_mut() {
                sub.list(
                    &mut constraints.version,
                    &format!("{path}.{field}.{name}.version"),
                );
            }
        }
        for (i, repo) in self.extra_repos.iter_mut().enumerate() {
            let base = format!("{path}.extra_repos.{i}");
            for (name, source) in repo.keys.iter_mut() {
                source.process_build_args(sub, &format!("{base}.keys.{name}"));
            }
            for (name, source) in repo.config.iter_mut() {
                source.process_build_args(sub, &format!("{base}.config.{name}"));
            }
            for (j, mount) in repo.data.iter_mut().enumerate() {
                mount
                    .spec
                    .process_build_args(sub, &format!("{base}.data.{j}.spec"));
            }
        }
    }
}

/// An additional package repository enabled for some build phases.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageRepositoryConfig {
    /// Signing keys to import, by file name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, Source>,
    /// Repository definition files to install, by file name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Source>,
    /// Additional data mounted while the repository is in use.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<SourceMount>,
    /// Phases the repository is available in; all when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<RepoEnv>,
}

impl PackageRepositoryConfig {
    pub(crate) fn fill_defaults(&mut self) {
        if self.envs.is_empty() {
            self.envs = vec![RepoEnv::Build, RepoEnv::Install, RepoEnv::Test];
        }
    }
}

/// The build phases an extra repository can be enabled for.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RepoEnv {
    Build,
    Install,
    Test,
}
