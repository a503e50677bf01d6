// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::artifacts::Artifacts;
use crate::dependencies::{DependencyList, PackageDependencies, PackageRepositoryConfig, RepoEnv};
use crate::image_spec::ImageConfig;
use crate::target_spec::{PackageConfig, PackageSigner};
use crate::test_spec::TestSpec;
use crate::{PackageConstraints, Spec};

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// A spec view with one target's overrides merged into the root.
///
/// Accessors take no target key; the merge happened once at
/// construction. The original spec stays reachable for callers
/// that need the unmerged document.
#[derive(Clone, Debug)]
pub struct ResolvedSpec {
    spec: Arc<Spec>,
    target: String,
    dependencies: Option<PackageDependencies>,
    package_config: Option<PackageConfig>,
    image: ImageConfig,
    artifacts: Artifacts,
    provides: BTreeMap<String, PackageConstraints>,
    replaces: BTreeMap<String, PackageConstraints>,
    conflicts: BTreeMap<String, PackageConstraints>,
    tests: Vec<TestSpec>,
}

impl Spec {
    /// Produce the effective view of this spec for a build target.
    ///
    /// The target entry is looked up by the full key first, then by
    /// its leading `<distro>` segment; a missing entry yields the
    /// root configuration unchanged.
    pub fn resolve(self: &Arc<Self>, target_key: &str) -> ResolvedSpec {
        let target = self
            .targets
            .get(target_key)
            .or_else(|| {
                let (distro, _) = target_key.split_once('/')?;
                self.targets.get(distro)
            });

        let dependencies = target
            .and_then(|t| t.dependencies.clone())
            .or_else(|| self.dependencies.clone());
        let package_config = target
            .and_then(|t| t.package_config.clone())
            .or_else(|| self.package_config.clone());

        let mut image = self.image.clone().unwrap_or_default();
        if let Some(overlay) = target.and_then(|t| t.image.as_ref()) {
            image.merge(overlay);
        }

        let artifacts = target
            .and_then(|t| t.artifacts.clone())
            .unwrap_or_else(|| self.artifacts.clone());

        let provides = target
            .and_then(|t| t.provides.clone())
            .unwrap_or_else(|| self.provides.clone());
        let replaces = target
            .and_then(|t| t.replaces.clone())
            .unwrap_or_else(|| self.replaces.clone());
        let conflicts = target
            .and_then(|t| t.conflicts.clone())
            .unwrap_or_else(|| self.conflicts.clone());

        let mut tests = self.tests.clone();
        if let Some(target) = target {
            tests.extend(target.tests.iter().cloned());
        }

        ResolvedSpec {
            spec: Arc::clone(self),
            target: target_key.to_string(),
            dependencies,
            package_config,
            image,
            artifacts,
            provides,
            replaces,
            conflicts,
            tests,
        }
    }
}

impl ResolvedSpec {
    /// The unmerged document this view was derived from.
    pub fn spec(&self) -> &Arc<Spec> {
        &self.spec
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn dependencies(&self) -> Option<&PackageDependencies> {
        self.dependencies.as_ref()
    }

    pub fn build_deps(&self) -> Option<&DependencyList> {
        self.dependencies.as_ref().map(|d| &d.build)
    }

    pub fn runtime_deps(&self) -> Option<&DependencyList> {
        self.dependencies.as_ref().map(|d| &d.runtime)
    }

    pub fn recommends(&self) -> Option<&DependencyList> {
        self.dependencies.as_ref().map(|d| &d.recommends)
    }

    pub fn sysext_deps(&self) -> Option<&DependencyList> {
        self.dependencies.as_ref().map(|d| &d.sysext)
    }

    pub fn test_deps(&self) -> Option<&DependencyList> {
        self.dependencies.as_ref().map(|d| &d.test)
    }

    /// Extra repositories enabled for the given phase.
    pub fn extra_repos(&self, env: RepoEnv) -> Vec<&PackageRepositoryConfig> {
        self.dependencies
            .as_ref()
            .map(|d| {
                d.extra_repos
                    .iter()
                    .filter(|repo| repo.envs.contains(&env))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn package_config(&self) -> Option<&PackageConfig> {
        self.package_config.as_ref()
    }

    pub fn signer(&self) -> Option<&PackageSigner> {
        self.package_config.as_ref()?.signer.as_ref()
    }

    pub fn image(&self) -> &ImageConfig {
        &self.image
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn provides(&self) -> &BTreeMap<String, PackageConstraints> {
        &self.provides
    }

    pub fn replaces(&self) -> &BTreeMap<String, PackageConstraints> {
        &self.replaces
    }

    pub fn conflicts(&self) -> &BTreeMap<String, PackageConstraints> {
        &self.conflicts
    }

    pub fn tests(&self) -> &[TestSpec] {
        &self.tests
    }

    /// Render the merged view back as a standalone spec, with the
    /// per-target override table dropped.
    pub fn effective_spec(&self) -> Spec {
        let mut spec = (*self.spec).clone();
        spec.dependencies = self.dependencies.clone();
        spec.package_config = self.package_config.clone();
        spec.image = Some(self.image.clone());
        spec.artifacts = self.artifacts.clone();
        spec.provides = self.provides.clone();
        spec.replaces = self.replaces.clone();
        spec.conflicts = self.conflicts.clone();
        spec.tests = self.tests.clone();
        spec.targets.clear();
        spec
    }
}
