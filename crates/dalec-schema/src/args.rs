// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use miette::Diagnostic;
use thiserror::Error;

use crate::source_map::{SourceMap, Span};
use crate::Spec;

#[cfg(test)]
#[path = "./args_test.rs"]
mod args_test;

pub const ARG_BUILDKIT_SYNTAX: &str = "BUILDKIT_SYNTAX";
pub const ARG_DISABLE_DIFF_MERGE: &str = "DALEC_DISABLE_DIFF_MERGE";
pub const ARG_SKIP_SIGNING: &str = "DALEC_SKIP_SIGNING";
pub const ARG_SIGNING_CONFIG_CONTEXT_NAME: &str = "DALEC_SIGNING_CONFIG_CONTEXT_NAME";
pub const ARG_SIGNING_CONFIG_PATH: &str = "DALEC_SIGNING_CONFIG_PATH";
pub const ARG_SKIP_TESTS: &str = "DALEC_SKIP_TESTS";
pub const ARG_SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";
pub const ARG_TARGET: &str = "DALEC_TARGET";

/// Args always recognised by the substituter without a declaration
/// in `spec.args`. They are opt-in: referencing one that the build
/// request did not supply is an error.
pub const BUILTIN_ARGS: &[&str] = &[
    ARG_BUILDKIT_SYNTAX,
    ARG_DISABLE_DIFF_MERGE,
    ARG_SKIP_SIGNING,
    ARG_SIGNING_CONFIG_CONTEXT_NAME,
    ARG_SIGNING_CONFIG_PATH,
    ARG_SKIP_TESTS,
    ARG_SOURCE_DATE_EPOCH,
    ARG_TARGET,
];

/// The platform args known from the build environment.
pub const PLATFORM_ARGS: &[&str] = &[
    "TARGETOS",
    "TARGETARCH",
    "TARGETPLATFORM",
    "TARGETVARIANT",
    "BUILDOS",
    "BUILDARCH",
    "BUILDPLATFORM",
    "BUILDVARIANT",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_ARGS.contains(&name) || PLATFORM_ARGS.contains(&name)
}

/// An `allow_arg` predicate accepting every name, for harnesses
/// that substitute without a fully declared arg set.
pub fn allow_any(_: &str) -> bool {
    true
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SubstitutionCause {
    #[error("unknown arg {0:?}: not declared in args and not a built-in")]
    UnknownArg(String),
    #[error("arg {0:?} is built-in but was not supplied by the build request")]
    ArgNotSupplied(String),
}

#[derive(Clone, Debug, Error)]
#[error("{span}: {field_path}: {cause}")]
pub struct SubstitutionError {
    pub field_path: String,
    pub span: Span,
    pub cause: SubstitutionCause,
}

/// The full set of substitution failures for one spec,
/// reported together so that large documents can be fixed
/// in a single pass.
#[derive(Debug, Default, Diagnostic, Error)]
pub struct SubstitutionErrors(pub Vec<SubstitutionError>);

impl std::fmt::Display for SubstitutionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "spec contains {} substitution error(s):", self.0.len())?;
        for err in self.0.iter() {
            writeln!(f, "  {err}")?;
        }
        Ok(())
    }
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Expand `$NAME` and `${NAME}` references in the given string.
///
/// A backslash escapes the following character. References for
/// which `lookup` has no value are kept verbatim and returned as
/// the unmatched set; the caller decides whether that is an error.
pub fn expand<F>(input: &str, mut lookup: F) -> (String, Vec<String>)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut unmatched = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            },
            '$' => match chars.peek().copied() {
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    let valid = closed
                        && !name.is_empty()
                        && name.starts_with(is_name_start)
                        && name.chars().all(is_name_char);
                    if !valid {
                        out.push_str("${");
                        out.push_str(&name);
                        if closed {
                            out.push('}');
                        }
                        continue;
                    }
                    match lookup(&name) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push_str("${");
                            out.push_str(&name);
                            out.push('}');
                            unmatched.push(name);
                        }
                    }
                }
                Some(c) if is_name_start(c) => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if !is_name_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    match lookup(&name) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push('$');
                            out.push_str(&name);
                            unmatched.push(name);
                        }
                    }
                }
                _ => out.push('$'),
            },
            _ => out.push(ch),
        }
    }
    (out, unmatched)
}

/// Walks the substitutable fields of a spec, expanding arg
/// references and collecting every failure.
pub(crate) struct Substituter<'a> {
    declared: BTreeMap<String, String>,
    env: &'a BTreeMap<String, String>,
    allow: &'a dyn Fn(&str) -> bool,
    smap: &'a SourceMap,
    errors: Vec<SubstitutionError>,
}

impl<'a> Substituter<'a> {
    pub(crate) fn new(
        declared: &BTreeMap<String, String>,
        env: &'a BTreeMap<String, String>,
        allow: &'a dyn Fn(&str) -> bool,
        smap: &'a SourceMap,
    ) -> Self {
        Self {
            declared: declared.clone(),
            env,
            allow,
            smap,
            errors: Vec::new(),
        }
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if let Some(default) = self.declared.get(name) {
            return Some(
                self.env
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| default.clone()),
            );
        }
        // env values for undeclared names are never consulted unless
        // the name is a built-in or the caller widened the accepted set
        if is_builtin(name) || (self.allow)(name) {
            return self.env.get(name).cloned();
        }
        None
    }

    /// Expand references in a single field, recording failures
    /// against the given document path.
    pub(crate) fn field(&mut self, value: &mut String, path: &str) {
        if !value.contains('$') {
            return;
        }
        let (expanded, unmatched) = expand(value, |name| self.resolve(name));
        for name in unmatched {
            let cause = if is_builtin(&name) {
                SubstitutionCause::ArgNotSupplied(name)
            } else if self.declared.contains_key(&name) || (self.allow)(&name) {
                // declared or explicitly allowed but unset: left verbatim
                continue;
            } else {
                SubstitutionCause::UnknownArg(name)
            };
            self.errors.push(SubstitutionError {
                field_path: path.to_string(),
                span: self.smap.locate(path),
                cause,
            });
        }
        *value = expanded;
    }

    /// Expand references in every value of a string map.
    pub(crate) fn env_map(&mut self, map: &mut BTreeMap<String, String>, path: &str) {
        for (key, value) in map.iter_mut() {
            let path = format!("{path}.{key}");
            self.field(value, &path);
        }
    }

    pub(crate) fn list(&mut self, values: &mut [String], path: &str) {
        for (i, value) in values.iter_mut().enumerate() {
            let path = format!("{path}.{i}");
            self.field(value, &path);
        }
    }

    fn into_result(self) -> Result<(), SubstitutionErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SubstitutionErrors(self.errors))
        }
    }
}

impl Spec {
    /// Expand `${…}` arg references across the spec.
    ///
    /// Values are taken from `env` for declared and built-in args,
    /// falling back to the defaults in `spec.args`. The `allow_arg`
    /// predicate can widen the accepted set beyond declared args and
    /// built-ins. All failures are collected and returned together.
    pub fn process_build_args(
        &mut self,
        env: &BTreeMap<String, String>,
        allow_arg: impl Fn(&str) -> bool,
        smap: &SourceMap,
    ) -> Result<(), SubstitutionErrors> {
        let mut sub = Substituter::new(&self.args, env, &allow_arg, smap);

        sub.field(&mut self.version, "version");
        sub.field(&mut self.revision, "revision");
        sub.env_map(&mut self.build.env, "build.env");
        for (i, step) in self.build.steps.iter_mut().enumerate() {
            sub.env_map(&mut step.env, &format!("build.steps.{i}.env"));
        }
        for (name, source) in self.sources.iter_mut() {
            source.process_build_args(&mut sub, &format!("sources.{name}"));
        }
        for (name, patches) in self.patches.iter_mut() {
            for (i, patch) in patches.iter_mut().enumerate() {
                sub.field(&mut patch.source, &format!("patches.{name}.{i}.source"));
            }
        }
        for (i, test) in self.tests.iter_mut().enumerate() {
            test.process_build_args(&mut sub, &format!("tests.{i}"));
        }
        if let Some(image) = self.image.as_mut() {
            sub.env_map(&mut image.labels, "image.labels");
        }
        if let Some(config) = self.package_config.as_mut() {
            if let Some(signer) = config.signer.as_mut() {
                sub.env_map(&mut signer.args, "package_config.signer.args");
            }
        }
        if let Some(deps) = self.dependencies.as_mut() {
            deps.process_build_args(&mut sub, "dependencies");
        }
        for (name, target) in self.targets.iter_mut() {
            let base = format!("targets.{name}");
            if let Some(deps) = target.dependencies.as_mut() {
                deps.process_build_args(&mut sub, &format!("{base}.dependencies"));
            }
            if let Some(image) = target.image.as_mut() {
                sub.env_map(&mut image.labels, &format!("{base}.image.labels"));
            }
            if let Some(config) = target.package_config.as_mut() {
                if let Some(signer) = config.signer.as_mut() {
                    sub.env_map(&mut signer.args, &format!("{base}.package_config.signer.args"));
                }
            }
            for (i, test) in target.tests.iter_mut().enumerate() {
                test.process_build_args(&mut sub, &format!("{base}.tests.{i}"));
            }
        }

        sub.into_result()
    }
}
