// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use miette::Diagnostic;
use thiserror::Error;

use crate::artifacts::{Artifacts, ArtifactSymlinkConfig};
use crate::build_spec::{ArtifactBuild, NETWORK_MODE_NONE, NETWORK_MODE_SANDBOX};
use crate::image_spec::ImageConfig;
use crate::source::{Command, Source, SourceKind, SourceMount};
use crate::source_map::{SourceMap, Span};
use crate::test_spec::TestSpec;
use crate::Spec;

#[cfg(test)]
#[path = "./validation_test.rs"]
mod validation_test;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationErrorKind {
    #[error("source sets no variant")]
    InvalidSource,
    #[error("source name {name:?} must not contain a path separator")]
    SourceNameHasSeparator { name: String },
    #[error("patch references source {patch_source:?} which is not declared in sources")]
    InvalidPatch { patch_source: String },
    #[error("patches declared for {source_name:?} which is not declared in sources")]
    UnknownPatchedSource { source_name: String },
    #[error("patch source {patch_source:?} is a file, the patch must not set a subpath")]
    PatchFileNoSubpath { patch_source: String },
    #[error("patch source {patch_source:?} is a directory, the patch requires a subpath")]
    PatchRequiresSubpath { patch_source: String },
    #[error("invalid mount at {dest:?}: {reason}")]
    InvalidMountConfig { dest: String, reason: String },
    #[error("symlink destination {newpath:?} declared by multiple entries: {oldpaths:?}")]
    SymlinkDuplicateNewpath {
        newpath: String,
        oldpaths: Vec<String>,
    },
    #[error("symlink entry has an empty path")]
    SymlinkEmptyPath,
    #[error("symlink entry sets both path and paths")]
    SymlinkPathConflict,
    #[error("invalid network mode {mode:?}, must be one of: none, sandbox")]
    InvalidNetworkMode { mode: String },
    #[error("image source with cmd requires a non-empty extract path")]
    NoImageSourcePath,
    #[error("inline file source cannot have path, includes or excludes")]
    InlineSourceFilters,
    #[error("inline source must set exactly one of file or dir")]
    InlineSourceVariant,
    #[error("inline source uid and gid must not be negative")]
    InlineSourceNegativeOwner,
    #[error("inline dir file name {file:?} must not contain a path separator")]
    InlineDirSeparator { file: String },
    #[error("build source cannot nest another build source")]
    BuildSourceRecursive,
    #[error("image cannot set both base and bases")]
    ImageBaseConflict,
    #[error("invalid regular expression {pattern:?}")]
    InvalidCheckRegex { pattern: String },
}

/// One invariant violation, located in the document.
#[derive(Clone, Debug, Error)]
#[error("{span}: {path}: {kind}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Dotted document path of the offending node.
    pub path: String,
    pub span: Span,
}

/// Every violation found in one validation run, reported together.
#[derive(Debug, Default, Diagnostic, Error)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "spec failed validation with {} error(s):", self.0.len())?;
        for err in self.0.iter() {
            writeln!(f, "  {err}")?;
        }
        Ok(())
    }
}

impl ValidationErrors {
    pub fn contains(&self, kind: &ValidationErrorKind) -> bool {
        self.0.iter().any(|e| &e.kind == kind)
    }
}

fn clean(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Whether `child` equals or lives under `parent`.
fn is_descendant(child: &str, parent: &str) -> bool {
    let parent = clean(parent);
    let child = clean(child);
    if parent == "/" {
        return true;
    }
    child == parent || child.starts_with(&format!("{parent}/"))
}

struct Validator<'a> {
    smap: &'a SourceMap,
    errors: Vec<ValidationError>,
}

impl<'a> Validator<'a> {
    fn error(&mut self, kind: ValidationErrorKind, path: &str) {
        self.errors.push(ValidationError {
            kind,
            path: path.to_string(),
            span: self.smap.locate(path),
        });
    }

    fn source(&mut self, source: &Source, path: &str) {
        match &source.kind {
            SourceKind::Inline(inline) => {
                match (inline.file.as_ref(), inline.dir.as_ref()) {
                    (Some(file), None) => {
                        if source.has_filters() {
                            self.error(ValidationErrorKind::InlineSourceFilters, path);
                        }
                        if file.uid < 0 || file.gid < 0 {
                            self.error(ValidationErrorKind::InlineSourceNegativeOwner, path);
                        }
                    }
                    (None, Some(dir)) => {
                        if dir.uid < 0 || dir.gid < 0 {
                            self.error(ValidationErrorKind::InlineSourceNegativeOwner, path);
                        }
                        for (name, file) in dir.files.iter() {
                            if name.contains('/') || name.contains('\\') {
                                self.error(
                                    ValidationErrorKind::InlineDirSeparator {
                                        file: name.clone(),
                                    },
                                    &format!("{path}.inline.dir.files.{name}"),
                                );
                            }
                            if file.uid < 0 || file.gid < 0 {
                                self.error(
                                    ValidationErrorKind::InlineSourceNegativeOwner,
                                    &format!("{path}.inline.dir.files.{name}"),
                                );
                            }
                        }
                    }
                    _ => self.error(ValidationErrorKind::InlineSourceVariant, path),
                }
            }
            SourceKind::Image(image) => {
                if let Some(cmd) = image.cmd.as_ref() {
                    if source.path.trim_matches('/').is_empty() && source.path != "/" {
                        self.error(ValidationErrorKind::NoImageSourcePath, path);
                    }
                    self.image_command(cmd, &source.path, &format!("{path}.image.cmd"));
                }
            }
            SourceKind::Build(build) => {
                if matches!(build.source.kind, SourceKind::Build(_)) {
                    self.error(
                        ValidationErrorKind::BuildSourceRecursive,
                        &format!("{path}.build.source"),
                    );
                } else {
                    self.source(&build.source, &format!("{path}.build.source"));
                }
            }
            SourceKind::Git(_) | SourceKind::Http(_) | SourceKind::Context(_) => (),
        }
    }

    fn image_command(&mut self, cmd: &Command, extract_path: &str, path: &str) {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        let all_mounts = cmd.mounts.iter().map(|m| (m, path.to_string())).chain(
            cmd.steps.iter().enumerate().flat_map(|(i, step)| {
                step.mounts
                    .iter()
                    .map(move |m| (m, format!("{path}.steps.{i}")))
            }),
        );
        for (mount, base) in all_mounts {
            let mount_path = format!("{base}.mounts");
            if clean(&mount.dest) == "/" {
                self.error(
                    ValidationErrorKind::InvalidMountConfig {
                        dest: mount.dest.clone(),
                        reason: "mount destination cannot be /".to_string(),
                    },
                    &mount_path,
                );
            } else if !extract_path.is_empty()
                && clean(extract_path) != "/"
                && is_descendant(&mount.dest, extract_path)
            {
                self.error(
                    ValidationErrorKind::InvalidMountConfig {
                        dest: mount.dest.clone(),
                        reason: format!(
                            "mount destination cannot be under the extract path {extract_path:?}"
                        ),
                    },
                    &mount_path,
                );
            }
            *seen.entry(mount.dest.as_str()).or_default() += 1;
            self.source(&mount.spec, &format!("{mount_path}.spec"));
        }
        for (dest, count) in seen {
            if count > 1 {
                self.error(
                    ValidationErrorKind::InvalidMountConfig {
                        dest: dest.to_string(),
                        reason: "duplicate mount destination".to_string(),
                    },
                    path,
                );
            }
        }
    }

    fn mounts(&mut self, mounts: &[SourceMount], path: &str) {
        for (i, mount) in mounts.iter().enumerate() {
            self.source(&mount.spec, &format!("{path}.{i}.spec"));
        }
    }

    fn build(&mut self, build: &ArtifactBuild, path: &str) {
        match build.network_mode.as_str() {
            "" | NETWORK_MODE_NONE | NETWORK_MODE_SANDBOX => (),
            other => self.error(
                ValidationErrorKind::InvalidNetworkMode {
                    mode: other.to_string(),
                },
                &format!("{path}.network_mode"),
            ),
        }
    }

    fn symlinks(
        &mut self,
        links: &BTreeMap<String, ArtifactSymlinkConfig>,
        path: &str,
    ) {
        let mut newpaths: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (oldpath, config) in links.iter() {
            let entry_path = format!("{path}.{oldpath}");
            if oldpath.is_empty() {
                self.error(ValidationErrorKind::SymlinkEmptyPath, path);
            }
            if !config.path.is_empty() && !config.paths.is_empty() {
                self.error(ValidationErrorKind::SymlinkPathConflict, &entry_path);
            }
            let mut any = false;
            for newpath in config.newpaths() {
                any = true;
                if newpath.is_empty() {
                    self.error(ValidationErrorKind::SymlinkEmptyPath, &entry_path);
                } else {
                    newpaths.entry(newpath).or_default().push(oldpath.clone());
                }
            }
            if !any {
                self.error(ValidationErrorKind::SymlinkEmptyPath, &entry_path);
            }
        }
        for (newpath, oldpaths) in newpaths {
            if oldpaths.len() > 1 {
                self.error(
                    ValidationErrorKind::SymlinkDuplicateNewpath {
                        newpath: newpath.to_string(),
                        oldpaths,
                    },
                    path,
                );
            }
        }
    }

    fn artifacts(&mut self, artifacts: &Artifacts, path: &str) {
        self.symlinks(&artifacts.links, &format!("{path}.links"));
    }

    fn image(&mut self, image: &ImageConfig, path: &str) {
        if !image.base.is_empty() && image.bases.is_some() {
            self.error(ValidationErrorKind::ImageBaseConflict, path);
        }
        if let Some(post) = image.post.as_ref() {
            self.symlinks(&post.symlinks, &format!("{path}.post.symlinks"));
        }
    }

    fn check_regexes(&mut self, patterns: &[String], path: &str) {
        for pattern in patterns.iter() {
            if regex::Regex::new(pattern).is_err() {
                self.error(
                    ValidationErrorKind::InvalidCheckRegex {
                        pattern: pattern.clone(),
                    },
                    path,
                );
            }
        }
    }

    fn test(&mut self, test: &TestSpec, path: &str) {
        for (i, step) in test.steps.iter().enumerate() {
            self.check_regexes(&step.stdout.matches, &format!("{path}.steps.{i}.stdout"));
            self.check_regexes(&step.stderr.matches, &format!("{path}.steps.{i}.stderr"));
        }
        for (file, check) in test.files.iter() {
            self.check_regexes(&check.matches, &format!("{path}.files.{file}"));
        }
        self.mounts(&test.mounts, &format!("{path}.mounts"));
    }
}

impl Spec {
    /// Check every structural invariant, reporting all violations
    /// together with their document locations.
    pub fn validate(&self, smap: &SourceMap) -> Result<(), ValidationErrors> {
        let mut v = Validator {
            smap,
            errors: Vec::new(),
        };

        for (name, source) in self.sources.iter() {
            if name.contains('/') || name.contains('\\') {
                v.error(
                    ValidationErrorKind::SourceNameHasSeparator { name: name.clone() },
                    "sources",
                );
            }
            v.source(source, &format!("sources.{name}"));
        }

        for (name, patches) in self.patches.iter() {
            if !self.sources.contains_key(name) {
                v.error(
                    ValidationErrorKind::UnknownPatchedSource {
                        source_name: name.clone(),
                    },
                    &format!("patches.{name}"),
                );
            }
            for (i, patch) in patches.iter().enumerate() {
                let path = format!("patches.{name}.{i}");
                let Some(patch_source) = self.sources.get(&patch.source) else {
                    v.error(
                        ValidationErrorKind::InvalidPatch {
                            patch_source: patch.source.clone(),
                        },
                        &path,
                    );
                    continue;
                };
                if patch_source.is_dir() && patch.path.is_empty() {
                    v.error(
                        ValidationErrorKind::PatchRequiresSubpath {
                            patch_source: patch.source.clone(),
                        },
                        &path,
                    );
                } else if !patch_source.is_dir() && !patch.path.is_empty() {
                    v.error(
                        ValidationErrorKind::PatchFileNoSubpath {
                            patch_source: patch.source.clone(),
                        },
                        &path,
                    );
                }
            }
        }

        v.build(&self.build, "build");
        v.artifacts(&self.artifacts, "artifacts");
        if let Some(image) = self.image.as_ref() {
            v.image(image, "image");
        }
        if let Some(deps) = self.dependencies.as_ref() {
            for (i, repo) in deps.extra_repos.iter().enumerate() {
                let base = format!("dependencies.extra_repos.{i}");
                for (name, source) in repo.keys.iter() {
                    v.source(source, &format!("{base}.keys.{name}"));
                }
                for (name, source) in repo.config.iter() {
                    v.source(source, &format!("{base}.config.{name}"));
                }
                v.mounts(&repo.data, &format!("{base}.data"));
            }
        }
        for (i, test) in self.tests.iter().enumerate() {
            v.test(test, &format!("tests.{i}"));
        }
        for (name, target) in self.targets.iter() {
            let base = format!("targets.{name}");
            if let Some(artifacts) = target.artifacts.as_ref() {
                v.artifacts(artifacts, &format!("{base}.artifacts"));
            }
            if let Some(image) = target.image.as_ref() {
                v.image(image, &format!("{base}.image"));
            }
            for (i, test) in target.tests.iter().enumerate() {
                v.test(test, &format!("{base}.tests.{i}"));
            }
        }

        if v.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(v.errors))
        }
    }
}
