// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::sync::Arc;

use rstest::rstest;

use crate::{RepoEnv, Spec};

fn spec(yaml: &str) -> Arc<Spec> {
    let mut spec = Spec::from_yaml(yaml).unwrap();
    spec.fill_defaults();
    Arc::new(spec)
}

#[rstest]
fn test_image_env_merge_order() {
    let spec = spec(
        r#"name: demo
image:
  env: ["A=1", "B=2"]
targets:
  t:
    image:
      env: ["B=3", "C=4"]
"#,
    );
    let resolved = spec.resolve("t");
    assert_eq!(resolved.image().env, vec!["A=1", "B=3", "C=4"]);
}

#[rstest]
fn test_unknown_target_uses_root_config() {
    let spec = spec("name: demo\nimage: {entrypoint: /bin/app}\n");
    let resolved = spec.resolve("jammy/deb");
    assert_eq!(resolved.image().entrypoint, "/bin/app");
    assert!(resolved.dependencies().is_none());
}

#[rstest]
fn test_target_looked_up_by_distro_segment() {
    let spec = spec(
        r#"name: demo
targets:
  mariner2:
    dependencies:
      runtime: [systemd]
"#,
    );
    let resolved = spec.resolve("mariner2/container");
    assert!(resolved.runtime_deps().unwrap().contains_key("systemd"));
}

#[rstest]
fn test_target_dependencies_replace_root() {
    let spec = spec(
        r#"name: demo
dependencies:
  build: [gcc]
  runtime: [libfoo]
targets:
  t:
    dependencies:
      runtime: [libbar]
"#,
    );
    let resolved = spec.resolve("t");
    // the whole dependencies object is replaced, not merged
    assert!(resolved.runtime_deps().unwrap().contains_key("libbar"));
    assert!(!resolved.runtime_deps().unwrap().contains_key("libfoo"));
    assert!(resolved.build_deps().unwrap().is_empty());
}

#[rstest]
fn test_root_dependencies_used_when_target_has_none() {
    let spec = spec(
        r#"name: demo
dependencies:
  runtime: [libfoo]
targets:
  t: {}
"#,
    );
    let resolved = spec.resolve("t");
    assert!(resolved.runtime_deps().unwrap().contains_key("libfoo"));
}

#[rstest]
fn test_tests_concatenate() {
    let spec = spec(
        r#"name: demo
tests:
  - name: root-test
targets:
  t:
    tests:
      - name: target-test
"#,
    );
    let resolved = spec.resolve("t");
    let names: Vec<_> = resolved.tests().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["root-test", "target-test"]);
}

#[rstest]
fn test_provides_replaced_even_when_empty() {
    let spec = spec(
        r#"name: demo
provides:
  foo: {}
targets:
  t:
    provides: {}
"#,
    );
    let resolved = spec.resolve("t");
    assert!(resolved.provides().is_empty());
    let other = spec.resolve("other");
    assert!(other.provides().contains_key("foo"));
}

#[rstest]
fn test_extra_repos_filtered_by_env() {
    let spec = spec(
        r#"name: demo
dependencies:
  extra_repos:
    - envs: [build]
    - envs: [build, test]
"#,
    );
    let resolved = spec.resolve("t");
    assert_eq!(resolved.extra_repos(RepoEnv::Build).len(), 2);
    assert_eq!(resolved.extra_repos(RepoEnv::Test).len(), 1);
    assert_eq!(resolved.extra_repos(RepoEnv::Install).len(), 0);
}

#[rstest]
fn test_resolution_is_deterministic() {
    let spec = spec(
        r#"name: demo
dependencies:
  runtime: [a, b, c]
targets:
  t1:
    dependencies:
      runtime: [x]
  t2: {}
  t3: {}
"#,
    );
    let first: Vec<String> = spec
        .resolve("t2")
        .runtime_deps()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    for _ in 0..8 {
        let again: Vec<String> = spec
            .resolve("t2")
            .runtime_deps()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(first, again);
    }
}

#[rstest]
fn test_signer_accessor() {
    let spec = spec(
        r#"name: demo
package_config:
  signer:
    image: signer:latest
    args: {KEY: prod}
targets:
  t:
    package_config:
      signer:
        image: other-signer:latest
"#,
    );
    assert_eq!(spec.resolve("t").signer().unwrap().image, "other-signer:latest");
    assert_eq!(spec.resolve("u").signer().unwrap().image, "signer:latest");
}

#[rstest]
fn test_back_reference_to_original() {
    let spec = spec("name: demo\n");
    let resolved = spec.resolve("t");
    assert_eq!(resolved.spec().name, "demo");
    assert_eq!(resolved.target(), "t");
}
