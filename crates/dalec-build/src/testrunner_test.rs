// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dalec_graph::{SourceOpts, State};
use dalec_schema::{CheckKind, Spec};
use rstest::rstest;

use super::{run_tests, FileStat, TestHarness};
use crate::Error;

/// Serves canned step outputs and file stats instead of
/// evaluating the graph.
#[derive(Default)]
struct FakeHarness {
    stdout: String,
    stderr: String,
    files: BTreeMap<String, (FileStat, String)>,
}

#[async_trait]
impl TestHarness for FakeHarness {
    async fn read_file(&self, _state: &State, path: &str) -> crate::Result<String> {
        match path {
            "/stdout" => Ok(self.stdout.clone()),
            "/stderr" => Ok(self.stderr.clone()),
            other => Ok(self
                .files
                .get(other)
                .map(|(_, contents)| contents.clone())
                .unwrap_or_default()),
        }
    }

    async fn stat(&self, _state: &State, path: &str) -> crate::Result<FileStat> {
        Ok(self
            .files
            .get(path)
            .map(|(stat, _)| stat.clone())
            .unwrap_or_default())
    }
}

fn resolved(yaml: &str) -> dalec_schema::ResolvedSpec {
    let mut spec = Spec::from_yaml(yaml).unwrap();
    spec.fill_defaults();
    Arc::new(spec).resolve("jammy/deb")
}

fn rootfs() -> State {
    State::image("rootfs", dalec_graph::OpMetadata::default())
}

const CHECKS: &str = r#"name: demo
tests:
  - name: greeting
    steps:
      - command: greet
        stdout:
          equals: "hello world\n"
          contains: [hello]
          matches: ["^hello"]
          starts_with: hello
          ends_with: "\n"
        stderr: {empty: true}
"#;

#[rstest]
#[tokio::test]
async fn test_all_checks_pass() {
    let harness = FakeHarness {
        stdout: "hello world\n".to_string(),
        ..Default::default()
    };
    run_tests(&resolved(CHECKS), &rootfs(), &SourceOpts::default(), &harness)
        .await
        .unwrap();
}

#[rstest]
#[tokio::test]
async fn test_equals_failure_reported_with_kind() {
    let spec = CHECKS.replace("equals: \"hello world\\n\"", "equals: bye");
    let harness = FakeHarness {
        stdout: "hello world\n".to_string(),
        ..Default::default()
    };
    let err = run_tests(&resolved(&spec), &rootfs(), &SourceOpts::default(), &harness)
        .await
        .unwrap_err();
    let Error::TestFailures(failures) = err else {
        panic!("expected test failures, got {err}");
    };
    assert_eq!(failures.0.len(), 1);
    assert_eq!(failures.0[0].name, "greeting");
    let check = &failures.0[0].errors[0];
    assert_eq!(check.kind, CheckKind::Equals);
    assert_eq!(check.expected, "bye");
    assert_eq!(check.actual, "hello world\n");
    assert_eq!(check.path, "steps.0.stdout");
}

#[rstest]
#[tokio::test]
async fn test_failures_aggregate_across_tests() {
    let yaml = r#"name: demo
tests:
  - name: one
    steps:
      - command: a
        stdout: {equals: nope}
  - name: two
    steps:
      - command: b
        stdout: {equals: nope}
"#;
    let harness = FakeHarness {
        stdout: "yes".to_string(),
        ..Default::default()
    };
    let err = run_tests(&resolved(yaml), &rootfs(), &SourceOpts::default(), &harness)
        .await
        .unwrap_err();
    let Error::TestFailures(failures) = err else {
        panic!("expected test failures");
    };
    assert_eq!(failures.0.len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_file_checks() {
    let yaml = r#"name: demo
tests:
  - name: files
    steps:
      - command: install-things
    files:
      /usr/bin/app:
        permissions: 0o755
        contains: [ELF]
      /var/empty:
        is_dir: true
      /tmp/scratch-file:
        not_exist: true
"#;
    let mut harness = FakeHarness::default();
    harness.files.insert(
        "/usr/bin/app".to_string(),
        (
            FileStat {
                exists: true,
                is_dir: false,
                mode: 0o755,
            },
            "ELF binary".to_string(),
        ),
    );
    harness.files.insert(
        "/var/empty".to_string(),
        (
            FileStat {
                exists: true,
                is_dir: true,
                mode: 0o755,
            },
            String::new(),
        ),
    );
    run_tests(&resolved(yaml), &rootfs(), &SourceOpts::default(), &harness)
        .await
        .unwrap();
}

#[rstest]
#[tokio::test]
async fn test_file_check_failures() {
    let yaml = r#"name: demo
tests:
  - name: files
    steps:
      - command: install-things
    files:
      /usr/bin/app:
        permissions: 0o755
      /tmp/scratch-file:
        not_exist: true
"#;
    let mut harness = FakeHarness::default();
    harness.files.insert(
        "/usr/bin/app".to_string(),
        (
            FileStat {
                exists: true,
                is_dir: false,
                mode: 0o644,
            },
            String::new(),
        ),
    );
    harness.files.insert(
        "/tmp/scratch-file".to_string(),
        (
            FileStat {
                exists: true,
                is_dir: false,
                mode: 0o644,
            },
            String::new(),
        ),
    );
    let err = run_tests(&resolved(yaml), &rootfs(), &SourceOpts::default(), &harness)
        .await
        .unwrap_err();
    let Error::TestFailures(failures) = err else {
        panic!("expected test failures");
    };
    let kinds: Vec<CheckKind> = failures.0[0].errors.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&CheckKind::Permissions));
    assert!(kinds.contains(&CheckKind::Mode));
}

#[rstest]
fn test_tests_skipped_build_arg() {
    let mut args = BTreeMap::new();
    assert!(!super::tests_skipped(&args));
    args.insert("DALEC_SKIP_TESTS".to_string(), "1".to_string());
    assert!(super::tests_skipped(&args));
}

#[rstest]
#[tokio::test]
async fn test_steps_share_one_rootfs_serially() {
    let yaml = r#"name: demo
tests:
  - name: steps
    dir: /srv
    env: {LANG: C}
    steps:
      - command: echo one
      - command: echo two
        stdin: "input text"
"#;
    let harness = FakeHarness::default();
    // composition must succeed; the emitted chain is step two on
    // top of step one's rootfs
    run_tests(&resolved(yaml), &rootfs(), &SourceOpts::default(), &harness)
        .await
        .unwrap();
}
