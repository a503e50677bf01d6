// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use rstest::rstest;

use super::Definition;
use crate::op::OpMetadata;
use crate::state::{ExecCommand, State};

fn sample() -> State {
    let base = State::image("busybox", OpMetadata::named("load base"));
    base.run(ExecCommand::shell("echo hi").metadata(OpMetadata::named("say hi")))
        .root()
}

#[rstest]
fn test_marshal_is_deterministic() {
    let first = Definition::marshal(&sample()).unwrap().to_bytes().unwrap();
    let second = Definition::marshal(&sample()).unwrap().to_bytes().unwrap();
    assert_eq!(first, second);
}

#[rstest]
fn test_ops_in_dependency_order() {
    let def = Definition::marshal(&sample()).unwrap();
    assert_eq!(def.ops.len(), 2);
    // the source op must precede the exec op that consumes it
    assert!(def.ops[1].inputs.iter().any(|i| i.digest == def.ops[0].digest));
    assert_eq!(def.result.digest, def.ops[1].digest);
}

#[rstest]
fn test_shared_nodes_marshal_once() {
    let base = State::image("busybox", OpMetadata::default());
    let left = base.run(ExecCommand::shell("echo a")).root();
    let right = base.run(ExecCommand::shell("echo b")).root();
    let merged = State::merge(&[left, right], OpMetadata::default());
    let def = Definition::marshal(&merged).unwrap();
    let source_ops = def
        .ops
        .iter()
        .filter(|op| op.op.get("source").is_some())
        .count();
    assert_eq!(source_ops, 1);
}

#[rstest]
fn test_marshal_scratch_fails() {
    Definition::marshal(&State::scratch()).unwrap_err();
}

#[rstest]
fn test_metadata_carries_description_and_location() {
    let yaml = "sources:\n  app:\n    git: {url: x, commit: y}\n";
    let smap = dalec_schema::SourceMap::index(yaml, "dalec.yml");
    let span = smap.locate("sources.app");
    let state = State::image(
        "busybox",
        OpMetadata::named("fetch app").with_span(Some(span)),
    );
    let def = Definition::marshal(&state).unwrap();
    let meta = def.metadata.get(&def.result.digest).unwrap();
    assert_eq!(
        meta.description.get("llb.customname").unwrap(),
        "fetch app"
    );
    let location = meta.location.as_ref().unwrap();
    assert_eq!(location.filename, "dalec.yml");
    assert_eq!(location.start_line, 2);
}

#[rstest]
fn test_identical_content_gets_identical_digest() {
    let a = State::image("busybox", OpMetadata::default());
    let b = State::image("busybox", OpMetadata::default());
    let da = Definition::marshal(&a).unwrap();
    let db = Definition::marshal(&b).unwrap();
    assert_eq!(da.result.digest, db.result.digest);
}
