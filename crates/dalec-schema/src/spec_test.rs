// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use rstest::rstest;

use super::Spec;
use crate::ValidationErrorKind;

const FULL: &str = r#"name: demo
description: a demo package
version: 1.0.0
revision: 1
license: MIT
vendor: Example Corp
packager: Example Corp
website: https://example.com
args:
  REV: HEAD
sources:
  app:
    git:
      url: https://example.com/app.git
      commit: ${REV}
    generate:
      - gomod: {}
  p1:
    inline:
      file:
        contents: |
          --- a/main.go
          +++ b/main.go
patches:
  app:
    - source: p1
build:
  env:
    CGO_ENABLED: "0"
  steps:
    - command: go build ./...
dependencies:
  build:
    golang: {}
  runtime: [libc6]
artifacts:
  binaries:
    out/app: {}
image:
  entrypoint: /usr/bin/app
  env: ["A=1", "B=2"]
targets:
  jammy:
    image:
      env: ["B=3", "C=4"]
tests:
  - name: version
    steps:
      - command: app --version
        stdout: {contains: ["1.0"]}
changelog:
  - date: "2024-04-02"
    author: dev
    changes: [initial release]
x-custom:
  anything:
    goes: [1, 2, 3]
"#;

#[rstest]
fn test_parse_full_spec() {
    crate::fixtures::init_logging();
    let (spec, _) = Spec::parse(FULL, "dalec.yml").unwrap();
    assert_eq!(spec.name, "demo");
    assert_eq!(spec.version, "1.0.0");
    assert_eq!(spec.revision, "1");
    assert_eq!(spec.sources.len(), 2);
    assert_eq!(spec.tests.len(), 1);
    assert_eq!(spec.changelog[0].date.as_str(), "2024-04-02");
    assert!(spec.has_gomods());
    assert!(!spec.has_pips());
}

#[rstest]
fn test_unknown_top_level_key_rejected() {
    let err = Spec::from_yaml("name: demo\nsorces: {}\n").unwrap_err();
    assert!(err.to_string().contains("sources"), "{err}");
}

#[rstest]
fn test_extension_keys_preserved() {
    let spec = Spec::from_yaml(FULL).unwrap();
    let ext = spec.ext("x-custom").unwrap();
    assert!(ext.get("anything").is_some());
}

#[rstest]
fn test_round_trip_is_stable() {
    let spec = Spec::from_yaml(FULL).unwrap();
    let emitted = spec.to_yaml().unwrap();
    let reparsed = Spec::from_yaml(emitted).unwrap();
    assert_eq!(spec, reparsed);
}

#[rstest]
fn test_extensions_survive_round_trip() {
    let spec = Spec::from_yaml(FULL).unwrap();
    let emitted = spec.to_yaml().unwrap();
    let reparsed = Spec::from_yaml(emitted).unwrap();
    assert_eq!(spec.ext("x-custom"), reparsed.ext("x-custom"));
}

#[rstest]
fn test_fill_defaults_idempotent() {
    let mut spec = Spec::from_yaml(FULL).unwrap();
    spec.fill_defaults();
    let once = spec.clone();
    spec.fill_defaults();
    assert_eq!(spec, once);
}

#[rstest]
fn test_fill_defaults_normalises() {
    let yaml = r#"name: demo
sources:
  c:
    context: {}
patches:
  c:
    - source: p
      path: x
build: {}
"#;
    let mut spec = Spec::from_yaml(yaml).unwrap();
    spec.fill_defaults();
    let context = spec.sources.get("c").unwrap().kind.as_context().unwrap();
    assert_eq!(context.name, "context");
    assert_eq!(spec.patches.get("c").unwrap()[0].strip, Some(1));
    assert_eq!(spec.build.network_mode, "none");
}

#[rstest]
fn test_patches_key_must_name_a_source() {
    let yaml = r#"name: demo
sources:
  app:
    git: {url: x, commit: y}
  p1:
    inline:
      file: {contents: fix}
patches:
  app:
    - source: p1
  p1: []
"#;
    let (mut spec, smap) = {
        let mut spec = Spec::from_yaml(yaml).unwrap();
        spec.fill_defaults();
        (spec, crate::SourceMap::index(yaml, "dalec.yml"))
    };
    // `p1` holds a patch, nothing patches it; dropping the entry fixes the spec
    let errs = spec.validate(&smap).unwrap_err();
    assert!(errs.contains(&ValidationErrorKind::UnknownPatchedSource {
        source_name: "p1".to_string()
    }));
    spec.patches.remove("p1");
    spec.validate(&smap).unwrap();
}

#[rstest]
fn test_legacy_dependency_list_round_trips_as_mapping() {
    let spec = Spec::from_yaml(FULL).unwrap();
    let deps = spec.dependencies.as_ref().unwrap();
    assert!(deps.runtime.contains_key("libc6"));
    let emitted = spec.to_yaml().unwrap();
    assert!(emitted.contains("libc6: {}"), "{emitted}");
}

#[rstest]
fn test_with_extension() {
    let spec = Spec::from_yaml("name: demo\n").unwrap();
    let spec = spec
        .with_extension("x-extra", serde_yaml::Value::String("v".to_string()))
        .unwrap();
    assert!(spec.ext("x-extra").is_some());
    let emitted = spec.to_yaml().unwrap();
    assert!(emitted.contains("x-extra"), "{emitted}");
}

#[rstest]
fn test_with_extension_rejects_bad_key() {
    let spec = Spec::from_yaml("name: demo\n").unwrap();
    spec.with_extension("custom", serde_yaml::Value::Null)
        .unwrap_err();
}

#[rstest]
fn test_invalid_yaml_error_carries_position() {
    let err = Spec::from_yaml("name: demo\n  bad indent: [\n").unwrap_err();
    // the formatted error names the offending line
    assert!(!err.to_string().is_empty());
}
