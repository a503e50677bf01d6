// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use rstest::rstest;

use super::{allow_any, expand, SubstitutionCause};
use crate::source_map::SourceMap;
use crate::Spec;

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[rstest]
#[case("plain text", "plain text")]
#[case("${V} and $V", "1.2 and 1.2")]
#[case("prefix-${V}-suffix", "prefix-1.2-suffix")]
#[case(r"\${V}", "${V}")]
#[case(r"\$V", "$V")]
#[case("$$V", "$1.2")]
#[case("${V", "${V")]
#[case("$ {V}", "$ {V}")]
#[case("${}", "${}")]
fn test_expand(#[case] input: &str, #[case] expected: &str) {
    let (out, _) = expand(input, |name| (name == "V").then(|| "1.2".to_string()));
    assert_eq!(out, expected);
}

#[rstest]
fn test_expand_unset_kept_verbatim() {
    let (out, unmatched) = expand("${MISSING}-x", |_| None);
    assert_eq!(out, "${MISSING}-x");
    assert_eq!(unmatched, vec!["MISSING".to_string()]);
}

#[rstest]
fn test_declared_arg_env_override() {
    let yaml = "name: demo\nversion: ${V}\nargs: {V: \"\"}\n";
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    spec.process_build_args(&env(&[("V", "1.2")]), |_| false, &smap)
        .unwrap();
    assert_eq!(spec.version, "1.2");
}

#[rstest]
fn test_declared_arg_default_value() {
    let yaml = "name: demo\nversion: ${V}\nargs: {V: default}\n";
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    spec.process_build_args(&env(&[]), |_| false, &smap).unwrap();
    assert_eq!(spec.version, "default");
}

#[rstest]
fn test_undeclared_arg_is_error_even_when_env_supplies_it() {
    let yaml = "name: demo\nversion: ${V}\n";
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    let errs = spec
        .process_build_args(&env(&[("V", "1.2")]), |_| false, &smap)
        .unwrap_err();
    assert_eq!(errs.0.len(), 1);
    assert_eq!(errs.0[0].field_path, "version");
    assert_eq!(
        errs.0[0].cause,
        SubstitutionCause::UnknownArg("V".to_string())
    );
}

#[rstest]
fn test_platform_arg_not_supplied() {
    let yaml = "name: demo\nversion: ${TARGETOS}\n";
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    let errs = spec
        .process_build_args(&env(&[]), |_| false, &smap)
        .unwrap_err();
    assert_eq!(
        errs.0[0].cause,
        SubstitutionCause::ArgNotSupplied("TARGETOS".to_string())
    );
}

#[rstest]
fn test_platform_arg_supplied() {
    let yaml = "name: demo\nversion: ${TARGETOS}\n";
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    spec.process_build_args(&env(&[("TARGETOS", "linux")]), |_| false, &smap)
        .unwrap();
    assert_eq!(spec.version, "linux");
}

#[rstest]
fn test_allow_any_never_errors() {
    let yaml = "name: demo\nversion: ${FOO}\n";
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    spec.process_build_args(&env(&[]), allow_any, &smap).unwrap();
    // unset and merely allowed: the reference stays verbatim
    assert_eq!(spec.version, "${FOO}");
}

#[rstest]
fn test_substitution_into_git_commit() {
    let yaml = r#"name: demo
args: {REV: HEAD}
sources:
  app:
    git:
      url: https://example.com/app.git
      commit: ${REV}
"#;
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    spec.process_build_args(&env(&[("REV", "cafebabe")]), |_| false, &smap)
        .unwrap();
    let source = spec.sources.get("app").unwrap();
    let git = source.kind.as_git().unwrap();
    assert_eq!(git.commit, "cafebabe");
}

#[rstest]
fn test_errors_aggregate_across_fields() {
    let yaml = r#"name: demo
version: ${A}
revision: ${B}
sources:
  app:
    git:
      url: ${C}
      commit: x
"#;
    let mut spec = Spec::from_yaml(yaml).unwrap();
    let smap = SourceMap::index(yaml, "dalec.yml");
    let errs = spec
        .process_build_args(&env(&[]), |_| false, &smap)
        .unwrap_err();
    let mut paths: Vec<_> = errs.0.iter().map(|e| e.field_path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["revision", "sources.app.git.url", "version"]);
}
