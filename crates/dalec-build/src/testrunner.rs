// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use async_trait::async_trait;
use dalec_graph::{CacheSharing, ExecCommand, OpMetadata, SourceOpts, State};
use dalec_schema::{CacheSharingMode, CheckKind, CheckOutputError, ResolvedSpec, TestSpec};
use miette::Diagnostic;
use thiserror::Error;

use crate::{source, Result};

#[cfg(test)]
#[path = "./testrunner_test.rs"]
mod testrunner_test;

const OUTPUT_DIR: &str = "/dalec/output";

/// The file metadata checks compare against.
#[derive(Clone, Debug, Default)]
pub struct FileStat {
    pub exists: bool,
    pub is_dir: bool,
    pub mode: u32,
}

/// Evaluates states so that captured outputs and rootfs contents
/// can be inspected. Graph composition stays in the runner; the
/// harness only reads results back.
#[async_trait]
pub trait TestHarness: Send + Sync {
    async fn read_file(&self, state: &State, path: &str) -> Result<String>;
    async fn stat(&self, state: &State, path: &str) -> Result<FileStat>;
}

/// All check failures of one test.
#[derive(Debug, Error)]
#[error("test {name:?} failed {} check(s)", errors.len())]
pub struct TestFailure {
    pub name: String,
    pub errors: Vec<CheckOutputError>,
}

/// Every failed test of a run, reported together.
#[derive(Debug, Default, Diagnostic, Error)]
pub struct TestFailures(pub Vec<TestFailure>);

impl std::fmt::Display for TestFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} test(s) failed:", self.0.len())?;
        for failure in self.0.iter() {
            writeln!(f, "  {}:", failure.name)?;
            for err in failure.errors.iter() {
                writeln!(f, "    {err}")?;
            }
        }
        Ok(())
    }
}

fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

/// Whether the build request opted out of running tests via the
/// `DALEC_SKIP_TESTS` build arg.
pub fn tests_skipped(build_args: &std::collections::BTreeMap<String, String>) -> bool {
    matches!(
        build_args
            .get(dalec_schema::args::ARG_SKIP_TESTS)
            .map(String::as_str),
        Some("1") | Some("true")
    )
}

fn sharing(mode: CacheSharingMode) -> CacheSharing {
    match mode {
        CacheSharingMode::Shared => CacheSharing::Shared,
        CacheSharingMode::Private => CacheSharing::Private,
        CacheSharingMode::Locked => CacheSharing::Locked,
    }
}

/// Run every test of a resolved spec against the prepared rootfs.
///
/// Each test runs on its own copy of the rootfs and cannot observe
/// another test; the steps of one test share their rootfs
/// serially. All failures are aggregated.
pub async fn run_tests(
    resolved: &ResolvedSpec,
    rootfs: &State,
    opts: &SourceOpts,
    harness: &dyn TestHarness,
) -> Result<()> {
    let mut failures = Vec::new();
    for test in resolved.tests() {
        let errors = run_test(test, rootfs.clone(), opts, harness).await?;
        if !errors.is_empty() {
            failures.push(TestFailure {
                name: test.name.clone(),
                errors,
            });
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(TestFailures(failures).into())
    }
}

async fn run_test(
    test: &TestSpec,
    rootfs: State,
    opts: &SourceOpts,
    harness: &dyn TestHarness,
) -> Result<Vec<CheckOutputError>> {
    tracing::debug!(test = %test.name, "running test");
    let mut root = rootfs;
    let mut captures = Vec::with_capacity(test.steps.len());

    for (i, step) in test.steps.iter().enumerate() {
        // capture the streams to well-known files in an ephemeral mount
        let mut script = format!("{{ {}; }}", step.command);
        if !step.stdin.is_empty() {
            script = format!("printf '%s' {} | {script}", shell_quote(&step.stdin));
        }
        script = format!("{script} >{OUTPUT_DIR}/stdout 2>{OUTPUT_DIR}/stderr");

        let mut command = ExecCommand::shell(&script)
            .envs(test.env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .envs(step.env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .output_mount(OUTPUT_DIR, &State::scratch())
            .metadata(OpMetadata::named(format!("test {}: step {i}", test.name)));
        if !test.dir.is_empty() {
            command = command.current_dir(&test.dir);
        }
        for (path, cache) in test.cache_dirs.iter() {
            let key = if cache.key.is_empty() { path } else { &cache.key };
            command = command.mount_cache(path, key, sharing(cache.mode));
        }
        for (j, mount) in test.mounts.iter().enumerate() {
            let (state, options) = source::to_mount(
                &format!("{}-mount-{j}", test.name),
                &mount.spec,
                opts,
                None,
            )
            .await?;
            command = if options.source_path.is_empty() {
                command.mount(&mount.dest, &state)
            } else {
                command.mount_file(&mount.dest, &state, &options.source_path)
            };
        }

        let exec = root.run(command);
        captures.push(
            exec.mount_output(OUTPUT_DIR)
                .expect("an output mount was attached for the captures"),
        );
        root = exec.root();
    }

    let mut errors = Vec::new();
    for (i, step) in test.steps.iter().enumerate() {
        if !step.stdout.is_empty() {
            let actual = harness.read_file(&captures[i], "/stdout").await?;
            errors.extend(step.stdout.check(&actual, &format!("steps.{i}.stdout")));
        }
        if !step.stderr.is_empty() {
            let actual = harness.read_file(&captures[i], "/stderr").await?;
            errors.extend(step.stderr.check(&actual, &format!("steps.{i}.stderr")));
        }
    }

    for (path, check) in test.files.iter() {
        let stat = harness.stat(&root, path).await?;
        if check.not_exist {
            if stat.exists {
                errors.push(CheckOutputError {
                    kind: CheckKind::Mode,
                    expected: "absent".to_string(),
                    actual: "present".to_string(),
                    path: path.clone(),
                });
            }
            continue;
        }
        if !stat.exists {
            errors.push(CheckOutputError {
                kind: CheckKind::Mode,
                expected: "present".to_string(),
                actual: "absent".to_string(),
                path: path.clone(),
            });
            continue;
        }
        if check.is_dir != stat.is_dir {
            errors.push(CheckOutputError {
                kind: CheckKind::Mode,
                expected: if check.is_dir { "directory" } else { "file" }.to_string(),
                actual: if stat.is_dir { "directory" } else { "file" }.to_string(),
                path: path.clone(),
            });
        }
        if check.permissions != 0 && check.permissions != stat.mode & 0o7777 {
            errors.push(CheckOutputError {
                kind: CheckKind::Permissions,
                expected: format!("0{:o}", check.permissions),
                actual: format!("0{:o}", stat.mode & 0o7777),
                path: path.clone(),
            });
        }
        let contents = check.contents();
        if !contents.is_empty() && !stat.is_dir {
            let actual = harness.read_file(&root, path).await?;
            errors.extend(contents.check(&actual, path));
        }
    }

    Ok(errors)
}
