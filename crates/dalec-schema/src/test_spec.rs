// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::args::Substituter;
use crate::build_spec::CacheDirConfig;
use crate::source::SourceMount;

#[cfg(test)]
#[path = "./test_spec_test.rs"]
mod test_spec_test;

fn is_false(v: &bool) -> bool {
    !*v
}

/// A declarative test executed against the built package.
///
/// Each test runs on its own copy of the prepared rootfs; steps
/// within a test share that rootfs serially.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<SourceMount>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cache_dirs: BTreeMap<String, CacheDirConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TestStep>,
    /// Checks applied to files in the rootfs after all steps ran.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, FileCheckOutput>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TestStep {
    pub command: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdin: String,
    #[serde(default, skip_serializing_if = "CheckOutput::is_empty")]
    pub stdout: CheckOutput,
    #[serde(default, skip_serializing_if = "CheckOutput::is_empty")]
    pub stderr: CheckOutput,
}

impl TestSpec {
    pub(crate) fn process_build_args(&mut self, sub: &mut Substituter<'_>, path: &str) {
        sub.env_map(&mut self.env, &format!("{path}.env"));
        for (i, step) in self.steps.iter_mut().enumerate() {
            let base = format!("{path}.steps.{i}");
            sub.field(&mut step.command, &format!("{base}.command"));
            sub.field(&mut step.stdin, &format!("{base}.stdin"));
            sub.env_map(&mut step.env, &format!("{base}.env"));
            step.stdout.process_build_args(sub, &format!("{base}.stdout"));
            step.stderr.process_build_args(sub, &format!("{base}.stderr"));
        }
        for (file, check) in self.files.iter_mut() {
            check.process_build_args(sub, &format!("{path}.files.{file}"));
        }
        for (i, mount) in self.mounts.iter_mut().enumerate() {
            mount
                .spec
                .process_build_args(sub, &format!("{path}.mounts.{i}.spec"));
        }
    }
}

/// Assertions against a captured output stream or file contents.
/// Every set field must hold.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CheckOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
    /// Regular expressions the output must match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_with: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub empty: bool,
}

/// Assertions against a file in the rootfs after a test ran.
///
/// Carries the same content assertions as [`CheckOutput`] plus
/// file-metadata checks. (`flatten` cannot be combined with strict
/// decoding, so the content fields are spelled out.)
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileCheckOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_with: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub empty: bool,
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub permissions: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_exist: bool,
}

impl FileCheckOutput {
    pub(crate) fn process_build_args(&mut self, sub: &mut Substituter<'_>, path: &str) {
        if let Some(equals) = self.equals.as_mut() {
            sub.field(equals, &format!("{path}.equals"));
        }
        sub.list(&mut self.contains, &format!("{path}.contains"));
        sub.list(&mut self.matches, &format!("{path}.matches"));
        if let Some(starts_with) = self.starts_with.as_mut() {
            sub.field(starts_with, &format!("{path}.starts_with"));
        }
        if let Some(ends_with) = self.ends_with.as_mut() {
            sub.field(ends_with, &format!("{path}.ends_with"));
        }
    }

    /// The content assertions of this file check.
    pub fn contents(&self) -> CheckOutput {
        CheckOutput {
            equals: self.equals.clone(),
            contains: self.contains.clone(),
            matches: self.matches.clone(),
            starts_with: self.starts_with.clone(),
            ends_with: self.ends_with.clone(),
            empty: self.empty,
        }
    }
}

/// The kind of a failed output check.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CheckKind {
    Equals,
    Contains,
    Matches,
    StartsWith,
    EndsWith,
    Empty,
    Mode,
    Permissions,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{path}: check {kind} failed: expected {expected:?}, actual {actual:?}")]
pub struct CheckOutputError {
    pub kind: CheckKind,
    pub expected: String,
    pub actual: String,
    /// What was checked, eg `stdout` of a step or a file path.
    pub path: String,
}

impl CheckOutput {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn process_build_args(&mut self, sub: &mut Substituter<'_>, path: &str) {
        if let Some(equals) = self.equals.as_mut() {
            sub.field(equals, &format!("{path}.equals"));
        }
        sub.list(&mut self.contains, &format!("{path}.contains"));
        sub.list(&mut self.matches, &format!("{path}.matches"));
        if let Some(starts_with) = self.starts_with.as_mut() {
            sub.field(starts_with, &format!("{path}.starts_with"));
        }
        if let Some(ends_with) = self.ends_with.as_mut() {
            sub.field(ends_with, &format!("{path}.ends_with"));
        }
    }

    /// Apply every configured assertion to the given output,
    /// returning all failures.
    pub fn check(&self, actual: &str, path: &str) -> Vec<CheckOutputError> {
        let mut failures = Vec::new();
        let fail = |kind: CheckKind, expected: &str| CheckOutputError {
            kind,
            expected: expected.to_string(),
            actual: actual.to_string(),
            path: path.to_string(),
        };
        if let Some(expected) = self.equals.as_deref() {
            if actual != expected {
                failures.push(fail(CheckKind::Equals, expected));
            }
        }
        for expected in self.contains.iter() {
            if !actual.contains(expected.as_str()) {
                failures.push(fail(CheckKind::Contains, expected));
            }
        }
        for pattern in self.matches.iter() {
            match regex::Regex::new(pattern) {
                Ok(re) if re.is_match(actual) => (),
                _ => failures.push(fail(CheckKind::Matches, pattern)),
            }
        }
        if let Some(expected) = self.starts_with.as_deref() {
            if !actual.starts_with(expected) {
                failures.push(fail(CheckKind::StartsWith, expected));
            }
        }
        if let Some(expected) = self.ends_with.as_deref() {
            if !actual.ends_with(expected) {
                failures.push(fail(CheckKind::EndsWith, expected));
            }
        }
        if self.empty && !actual.is_empty() {
            failures.push(fail(CheckKind::Empty, ""));
        }
        failures
    }
}
