// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

mod build;
mod context;
mod generator;
mod git;
mod http;
mod image;
mod inline;

pub use build::BuildSource;
pub use context::{ContextSource, DEFAULT_CONTEXT_NAME};
pub use generator::{
    CargohomeGenerator,
    GeneratorKind,
    GomodAuth,
    GomodGenerator,
    GomodSsh,
    NodeModGenerator,
    PipGenerator,
    SourceGenerator,
};
pub use git::{GitAuth, GitSource};
pub use http::{Digest, HttpSource};
pub use image::{Command, ImageSource};
pub use inline::{InlineDir, InlineFile, InlineSource};

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

use crate::args::Substituter;
use crate::scalar::ScalarString;
use crate::unknown_key::unknown_key_error;


const VARIANT_KEYS: &[&str] = &["git", "http", "image", "context", "build", "inline"];
const COMMON_KEYS: &[&str] = &["path", "includes", "excludes", "generate"];

/// A producer of a filesystem tree or a single file.
///
/// Exactly one variant is set; the wrapper carries the subpath
/// and filter configuration shared by all variants.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Source {
    pub kind: SourceKind,
    /// Subpath to extract from the fetched source.
    pub path: String,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// Dependency generators to run against this source.
    pub generate: Vec<SourceGenerator>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SourceKind {
    Git(GitSource),
    Http(HttpSource),
    Image(ImageSource),
    Context(ContextSource),
    Build(BuildSource),
    Inline(InlineSource),
}

impl SourceKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            SourceKind::Git(_) => "git",
            SourceKind::Http(_) => "http",
            SourceKind::Image(_) => "image",
            SourceKind::Context(_) => "context",
            SourceKind::Build(_) => "build",
            SourceKind::Inline(_) => "inline",
        }
    }

    pub fn as_git(&self) -> Option<&GitSource> {
        match self {
            SourceKind::Git(git) => Some(git),
            _ => None,
        }
    }

    pub fn as_http(&self) -> Option<&HttpSource> {
        match self {
            SourceKind::Http(http) => Some(http),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageSource> {
        match self {
            SourceKind::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&ContextSource> {
        match self {
            SourceKind::Context(context) => Some(context),
            _ => None,
        }
    }

    pub fn as_build(&self) -> Option<&BuildSource> {
        match self {
            SourceKind::Build(build) => Some(build),
            _ => None,
        }
    }

    pub fn as_inline(&self) -> Option<&InlineSource> {
        match self {
            SourceKind::Inline(inline) => Some(inline),
            _ => None,
        }
    }
}

impl Source {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            path: String::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            generate: Vec::new(),
        }
    }

    /// Decode a single source definition, with failures rendered
    /// against the offending line.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        crate::error::decode_yaml(yaml)
    }

    /// Reports whether this source produces a directory tree.
    ///
    /// Only http and inline-file sources produce a single file.
    pub fn is_dir(&self) -> bool {
        match &self.kind {
            SourceKind::Http(_) => false,
            SourceKind::Inline(inline) => inline.dir.is_some(),
            _ => true,
        }
    }

    pub fn has_filters(&self) -> bool {
        !self.path.trim_matches('/').is_empty()
            || !self.includes.is_empty()
            || !self.excludes.is_empty()
    }

    /// A one-line provenance description, written into package docs.
    pub fn doc(&self, name: &str) -> String {
        match &self.kind {
            SourceKind::Git(git) => {
                format!("{name}: git repository {} at commit {}", git.url, git.commit)
            }
            SourceKind::Http(http) => format!("{name}: fetched from {}", http.url),
            SourceKind::Image(image) => format!("{name}: extracted from image {}", image.reference),
            SourceKind::Context(context) => {
                format!("{name}: from local build context {:?}", context.name)
            }
            SourceKind::Build(build) => format!(
                "{name}: built from dockerfile {:?}",
                build.dockerfile_path
            ),
            SourceKind::Inline(_) => format!("{name}: defined inline in the spec"),
        }
    }

    pub fn fill_defaults(&mut self) {
        match &mut self.kind {
            SourceKind::Context(context) => context.fill_defaults(),
            SourceKind::Build(build) => build.fill_defaults(),
            _ => (),
        }
    }

    pub(crate) fn process_build_args(&mut self, sub: &mut Substituter<'_>, path: &str) {
        sub.field(&mut self.path, &format!("{path}.path"));
        match &mut self.kind {
            SourceKind::Git(git) => {
                sub.field(&mut git.url, &format!("{path}.git.url"));
                sub.field(&mut git.commit, &format!("{path}.git.commit"));
            }
            SourceKind::Http(http) => {
                sub.field(&mut http.url, &format!("{path}.http.url"));
            }
            SourceKind::Image(image) => {
                sub.field(&mut image.reference, &format!("{path}.image.ref"));
                if let Some(cmd) = image.cmd.as_mut() {
                    sub.env_map(&mut cmd.env, &format!("{path}.image.cmd.env"));
                    for (i, step) in cmd.steps.iter_mut().enumerate() {
                        sub.env_map(&mut step.env, &format!("{path}.image.cmd.steps.{i}.env"));
                    }
                    for (i, mount) in cmd.mounts.iter_mut().enumerate() {
                        mount
                            .spec
                            .process_build_args(sub, &format!("{path}.image.cmd.mounts.{i}.spec"));
                    }
                }
            }
            SourceKind::Context(context) => {
                sub.field(&mut context.name, &format!("{path}.context.name"));
            }
            SourceKind::Build(build) => {
                sub.env_map(&mut build.args, &format!("{path}.build.args"));
                build
                    .source
                    .process_build_args(sub, &format!("{path}.build.source"));
            }
            SourceKind::Inline(_) => (),
        }
        for (i, generator) in self.generate.iter_mut().enumerate() {
            generator.process_build_args(sub, &format!("{path}.generate.{i}"));
        }
    }
}

/// A source mounted into an executor step.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceMount {
    pub dest: String,
    pub spec: Box<Source>,
}

/// One command executed during a build or source-extraction step.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
    pub command: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<SourceMount>,
}

#[derive(Default)]
struct SourceVisitor {
    variants: Vec<SourceKind>,
    path: Option<String>,
    includes: Vec<String>,
    excludes: Vec<String>,
    generate: Vec<SourceGenerator>,
}

impl<'de> serde::de::Visitor<'de> for SourceVisitor {
    type Value = Source;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a source definition")
    }

    fn visit_map<A>(mut self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "git" => self
                    .variants
                    .push(SourceKind::Git(map.next_value::<GitSource>()?)),
                "http" => self
                    .variants
                    .push(SourceKind::Http(map.next_value::<HttpSource>()?)),
                "image" => self
                    .variants
                    .push(SourceKind::Image(map.next_value::<ImageSource>()?)),
                "context" => self
                    .variants
                    .push(SourceKind::Context(map.next_value::<ContextSource>()?)),
                "build" => self
                    .variants
                    .push(SourceKind::Build(map.next_value::<BuildSource>()?)),
                "inline" => self
                    .variants
                    .push(SourceKind::Inline(map.next_value::<InlineSource>()?)),
                "path" => self.path = Some(map.next_value::<ScalarString>()?.0),
                "includes" => {
                    self.includes = map
                        .next_value::<Vec<ScalarString>>()?
                        .into_iter()
                        .map(|s| s.0)
                        .collect()
                }
                "excludes" => {
                    self.excludes = map
                        .next_value::<Vec<ScalarString>>()?
                        .into_iter()
                        .map(|s| s.0)
                        .collect()
                }
                "generate" => self.generate = map.next_value::<Vec<SourceGenerator>>()?,
                unknown_key => {
                    let all_keys: Vec<&str> =
                        VARIANT_KEYS.iter().chain(COMMON_KEYS).copied().collect();
                    return Err(serde::de::Error::custom(unknown_key_error(
                        "a source definition",
                        unknown_key,
                        &all_keys,
                    )));
                }
            }
        }
        match self.variants.len() {
            0 => Err(serde::de::Error::custom(format!(
                "source must set one of: {VARIANT_KEYS:?}"
            ))),
            1 => Ok(Source {
                kind: self.variants.remove(0),
                path: self.path.unwrap_or_default(),
                includes: self.includes,
                excludes: self.excludes,
                generate: self.generate,
            }),
            _ => {
                let set: Vec<_> = self.variants.iter().map(|v| v.variant_name()).collect();
                Err(serde::de::Error::custom(format!(
                    "source sets multiple variants: {}",
                    set.join(", ")
                )))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_map(SourceVisitor::default())
    }
}

impl Serialize for Source {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let mut entries = 1usize;
        entries += usize::from(!self.path.is_empty());
        entries += usize::from(!self.includes.is_empty());
        entries += usize::from(!self.excludes.is_empty());
        entries += usize::from(!self.generate.is_empty());
        let mut map = serializer.serialize_map(Some(entries))?;
        match &self.kind {
            SourceKind::Git(git) => map.serialize_entry("git", git)?,
            SourceKind::Http(http) => map.serialize_entry("http", http)?,
            SourceKind::Image(image) => map.serialize_entry("image", image)?,
            SourceKind::Context(context) => map.serialize_entry("context", context)?,
            SourceKind::Build(build) => map.serialize_entry("build", build)?,
            SourceKind::Inline(inline) => map.serialize_entry("inline", inline)?,
        }
        if !self.path.is_empty() {
            map.serialize_entry("path", &self.path)?;
        }
        if !self.includes.is_empty() {
            map.serialize_entry("includes", &self.includes)?;
        }
        if !self.excludes.is_empty() {
            map.serialize_entry("excludes", &self.excludes)?;
        }
        if !self.generate.is_empty() {
            map.serialize_entry("generate", &self.generate)?;
        }
        map.end()
    }
}
