// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use struct_field_names_as_array::FieldNamesAsArray;

use crate::artifacts::Artifacts;
use crate::build_spec::ArtifactBuild;
use crate::changelog::ChangelogEntry;
use crate::dependencies::{PackageConstraints, PackageDependencies};
use crate::extensions::Extensions;
use crate::image_spec::ImageConfig;
use crate::patch::PatchSpec;
use crate::scalar::ScalarString;
use crate::source::{GeneratorKind, Source};
use crate::source_map::SourceMap;
use crate::target_spec::{PackageConfig, Target};
use crate::test_spec::TestSpec;
use crate::unknown_key::unknown_key_error;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// The root of a build specification document.
///
/// Constructed by [`Spec::parse`]; effectively immutable once
/// defaults are filled and validation has run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spec {
    pub name: String,
    pub description: String,
    pub website: String,
    pub version: String,
    pub revision: String,
    pub license: String,
    pub vendor: String,
    pub packager: String,
    pub noarch: bool,
    /// Declared build args and their default values. A `${NAME}`
    /// reference must name an entry here or a recognised built-in.
    pub args: BTreeMap<String, String>,
    pub sources: BTreeMap<String, Source>,
    /// Patches to apply per source, in declared order.
    pub patches: BTreeMap<String, Vec<PatchSpec>>,
    pub build: ArtifactBuild,
    pub artifacts: Artifacts,
    pub dependencies: Option<PackageDependencies>,
    pub provides: BTreeMap<String, PackageConstraints>,
    pub replaces: BTreeMap<String, PackageConstraints>,
    pub conflicts: BTreeMap<String, PackageConstraints>,
    pub image: Option<ImageConfig>,
    pub package_config: Option<PackageConfig>,
    pub tests: Vec<TestSpec>,
    pub changelog: Vec<ChangelogEntry>,
    pub targets: BTreeMap<String, Target>,
    pub extensions: Extensions,
}

impl Spec {
    /// Decode a spec document, without filling defaults or
    /// validating. Failures render against the offending line.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> Result<Self> {
        crate::error::decode_yaml(yaml)
    }

    /// Parse a spec document: decode, index source locations,
    /// fill defaults and validate.
    pub fn parse<S: Into<String>>(yaml: S, filename: &str) -> Result<(Self, SourceMap)> {
        let yaml = yaml.into();
        let smap = SourceMap::index(&yaml, filename);
        let mut spec = Self::from_yaml(yaml)?;
        spec.fill_defaults();
        spec.validate(&smap)?;
        tracing::debug!(name = %spec.name, "loaded spec");
        Ok((spec, smap))
    }

    /// Encode back to yaml, with extension sub-trees merged in
    /// at the root.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::SpecEncodingError)
    }

    /// Normalise optional fields to their documented defaults.
    /// Idempotent.
    pub fn fill_defaults(&mut self) {
        for source in self.sources.values_mut() {
            source.fill_defaults();
        }
        for patches in self.patches.values_mut() {
            for patch in patches.iter_mut() {
                patch.fill_defaults();
            }
        }
        self.build.fill_defaults();
        if let Some(deps) = self.dependencies.as_mut() {
            deps.fill_defaults();
        }
        if let Some(image) = self.image.as_mut() {
            image.fill_defaults();
        }
        for target in self.targets.values_mut() {
            if let Some(deps) = target.dependencies.as_mut() {
                deps.fill_defaults();
            }
            if let Some(image) = target.image.as_mut() {
                image.fill_defaults();
            }
        }
    }

    /// The extension sub-tree stored under the given `x-` key.
    pub fn ext(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.extensions.get(key)
    }

    /// Attach (or replace) an extension sub-tree.
    pub fn with_extension(mut self, key: &str, value: serde_yaml::Value) -> Result<Self> {
        self.extensions.insert(key, value)?;
        Ok(self)
    }

    fn has_generator(&self, kind: GeneratorKind) -> bool {
        self.sources
            .values()
            .any(|source| source.generate.iter().any(|g| g.kind() == kind))
    }

    pub fn has_gomods(&self) -> bool {
        self.has_generator(GeneratorKind::Gomod)
    }

    pub fn has_cargohomes(&self) -> bool {
        self.has_generator(GeneratorKind::Cargohome)
    }

    pub fn has_pips(&self) -> bool {
        self.has_generator(GeneratorKind::Pip)
    }

    pub fn has_node_mods(&self) -> bool {
        self.has_generator(GeneratorKind::NodeMod)
    }
}

#[derive(Default, FieldNamesAsArray)]
struct SpecVisitor {
    name: String,
    description: String,
    website: String,
    version: String,
    revision: String,
    license: String,
    vendor: String,
    packager: String,
    noarch: bool,
    args: BTreeMap<String, String>,
    sources: BTreeMap<String, Source>,
    patches: BTreeMap<String, Vec<PatchSpec>>,
    build: ArtifactBuild,
    artifacts: Artifacts,
    dependencies: Option<PackageDependencies>,
    provides: BTreeMap<String, PackageConstraints>,
    replaces: BTreeMap<String, PackageConstraints>,
    conflicts: BTreeMap<String, PackageConstraints>,
    image: Option<ImageConfig>,
    package_config: Option<PackageConfig>,
    tests: Vec<TestSpec>,
    changelog: Vec<ChangelogEntry>,
    targets: BTreeMap<String, Target>,
    #[field_names_as_array(skip)]
    extensions: Extensions,
}

impl From<SpecVisitor> for Spec {
    fn from(v: SpecVisitor) -> Self {
        Self {
            name: v.name,
            description: v.description,
            website: v.website,
            version: v.version,
            revision: v.revision,
            license: v.license,
            vendor: v.vendor,
            packager: v.packager,
            noarch: v.noarch,
            args: v.args,
            sources: v.sources,
            patches: v.patches,
            build: v.build,
            artifacts: v.artifacts,
            dependencies: v.dependencies,
            provides: v.provides,
            replaces: v.replaces,
            conflicts: v.conflicts,
            image: v.image,
            package_config: v.package_config,
            tests: v.tests,
            changelog: v.changelog,
            targets: v.targets,
            extensions: v.extensions,
        }
    }
}

impl<'de> serde::de::Visitor<'de> for SpecVisitor {
    type Value = SpecVisitor;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a build spec document")
    }

    fn visit_map<A>(mut self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "name" => self.name = map.next_value::<ScalarString>()?.0,
                "description" => self.description = map.next_value::<ScalarString>()?.0,
                "website" => self.website = map.next_value::<ScalarString>()?.0,
                "version" => self.version = map.next_value::<ScalarString>()?.0,
                "revision" => self.revision = map.next_value::<ScalarString>()?.0,
                "license" => self.license = map.next_value::<ScalarString>()?.0,
                "vendor" => self.vendor = map.next_value::<ScalarString>()?.0,
                "packager" => self.packager = map.next_value::<ScalarString>()?.0,
                "noarch" => self.noarch = map.next_value()?,
                "args" => {
                    self.args = map
                        .next_value::<BTreeMap<String, ScalarString>>()?
                        .into_iter()
                        .map(|(k, v)| (k, v.0))
                        .collect()
                }
                "sources" => self.sources = map.next_value()?,
                "patches" => self.patches = map.next_value()?,
                "build" => self.build = map.next_value()?,
                "artifacts" => self.artifacts = map.next_value()?,
                "dependencies" => self.dependencies = map.next_value()?,
                "provides" => self.provides = map.next_value()?,
                "replaces" => self.replaces = map.next_value()?,
                "conflicts" => self.conflicts = map.next_value()?,
                "image" => self.image = map.next_value()?,
                "package_config" => self.package_config = map.next_value()?,
                "tests" => self.tests = map.next_value()?,
                "changelog" => self.changelog = map.next_value()?,
                "targets" => self.targets = map.next_value()?,
                other if Extensions::is_valid_key(other) => {
                    let value = map.next_value::<serde_yaml::Value>()?;
                    self.extensions
                        .insert(other, value)
                        .map_err(serde::de::Error::custom)?;
                }
                unknown_key => {
                    return Err(serde::de::Error::custom(unknown_key_error(
                        "the spec root",
                        unknown_key,
                        &SpecVisitor::FIELD_NAMES_AS_ARRAY,
                    )));
                }
            }
        }
        Ok(self)
    }
}

impl<'de> Deserialize<'de> for Spec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        Ok(deserializer.deserialize_map(SpecVisitor::default())?.into())
    }
}

impl Serialize for Spec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if !self.name.is_empty() {
            map.serialize_entry("name", &self.name)?;
        }
        if !self.description.is_empty() {
            map.serialize_entry("description", &self.description)?;
        }
        if !self.website.is_empty() {
            map.serialize_entry("website", &self.website)?;
        }
        if !self.version.is_empty() {
            map.serialize_entry("version", &self.version)?;
        }
        if !self.revision.is_empty() {
            map.serialize_entry("revision", &self.revision)?;
        }
        if !self.license.is_empty() {
            map.serialize_entry("license", &self.license)?;
        }
        if !self.vendor.is_empty() {
            map.serialize_entry("vendor", &self.vendor)?;
        }
        if !self.packager.is_empty() {
            map.serialize_entry("packager", &self.packager)?;
        }
        if self.noarch {
            map.serialize_entry("noarch", &self.noarch)?;
        }
        if !self.args.is_empty() {
            map.serialize_entry("args", &self.args)?;
        }
        if !self.sources.is_empty() {
            map.serialize_entry("sources", &self.sources)?;
        }
        if !self.patches.is_empty() {
            map.serialize_entry("patches", &self.patches)?;
        }
        if !self.build.is_empty() {
            map.serialize_entry("build", &self.build)?;
        }
        if !self.artifacts.is_empty() {
            map.serialize_entry("artifacts", &self.artifacts)?;
        }
        if let Some(deps) = self.dependencies.as_ref() {
            map.serialize_entry("dependencies", deps)?;
        }
        if !self.provides.is_empty() {
            map.serialize_entry("provides", &self.provides)?;
        }
        if !self.replaces.is_empty() {
            map.serialize_entry("replaces", &self.replaces)?;
        }
        if !self.conflicts.is_empty() {
            map.serialize_entry("conflicts", &self.conflicts)?;
        }
        if let Some(image) = self.image.as_ref() {
            map.serialize_entry("image", image)?;
        }
        if let Some(config) = self.package_config.as_ref() {
            map.serialize_entry("package_config", config)?;
        }
        if !self.tests.is_empty() {
            map.serialize_entry("tests", &self.tests)?;
        }
        if !self.changelog.is_empty() {
            map.serialize_entry("changelog", &self.changelog)?;
        }
        if !self.targets.is_empty() {
            map.serialize_entry("targets", &self.targets)?;
        }
        for (key, value) in self.extensions.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
