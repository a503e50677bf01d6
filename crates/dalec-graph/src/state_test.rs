// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use rstest::rstest;

use super::{CopyOptions, ExecCommand, GitOptions, State};
use crate::op::{Op, OpMetadata};

#[rstest]
fn test_scratch_has_no_output() {
    assert!(State::scratch().output().is_none());
    assert!(State::scratch().is_scratch());
}

#[rstest]
fn test_image_source_identifier() {
    let state = State::image("docker.io/library/busybox:latest", OpMetadata::default());
    let edge = state.output().unwrap();
    let Op::Source(source) = &edge.node.op else {
        panic!("expected a source op");
    };
    assert_eq!(
        source.identifier,
        "docker-image://docker.io/library/busybox:latest"
    );
}

#[rstest]
fn test_git_source_attrs() {
    let state = State::git(
        "https://example.com/app.git",
        "abcdef",
        GitOptions {
            keep_git_dir: true,
            auth_token_secret: "tok".to_string(),
            ..Default::default()
        },
        OpMetadata::default(),
    );
    let Op::Source(source) = &state.output().unwrap().node.op else {
        panic!("expected a source op");
    };
    assert_eq!(source.identifier, "git://https://example.com/app.git#abcdef");
    assert_eq!(source.attrs.get("git.keepgitdir").unwrap(), "true");
    assert_eq!(source.attrs.get("git.authtokensecret").unwrap(), "tok");
}

#[rstest]
fn test_run_roots_and_inputs() {
    let base = State::image("busybox", OpMetadata::default());
    let exec = base.run(ExecCommand::shell("echo hi").env("A", "1"));
    let root = exec.root();
    let edge = root.output().unwrap();
    assert_eq!(edge.output, 0);
    let Op::Exec(op) = &edge.node.op else {
        panic!("expected an exec op");
    };
    assert_eq!(op.args, vec!["/bin/sh", "-c", "echo hi"]);
    assert_eq!(op.env, vec!["A=1"]);
    assert_eq!(op.mounts[0].dest, "/");
    assert_eq!(op.mounts[0].output, Some(0));
    assert_eq!(edge.node.inputs.len(), 1);
}

#[rstest]
fn test_output_mount_gets_distinct_output_index() {
    let base = State::image("busybox", OpMetadata::default());
    let out = State::scratch();
    let exec = base.run(
        ExecCommand::shell("echo hi > /out/a").output_mount("/out", &out),
    );
    let mounted = exec.mount_output("/out").unwrap();
    assert_eq!(mounted.output().unwrap().output, 1);
    assert!(exec.mount_output("/missing").is_none());
    // the root and the mount share one underlying node
    assert!(std::ptr::eq(
        std::sync::Arc::as_ptr(&exec.root().output().unwrap().node),
        std::sync::Arc::as_ptr(&mounted.output().unwrap().node),
    ));
}

#[rstest]
fn test_states_are_immutable_handles() {
    let base = State::image("busybox", OpMetadata::default());
    let before = std::sync::Arc::as_ptr(&base.output().unwrap().node);
    let _exec = base.run(ExecCommand::shell("true"));
    let _copy = State::scratch().copy_from(
        &base,
        "/",
        "/",
        CopyOptions::default(),
        OpMetadata::default(),
    );
    // composing never rewrites the operand
    assert!(std::ptr::eq(
        before,
        std::sync::Arc::as_ptr(&base.output().unwrap().node)
    ));
}

#[rstest]
fn test_copy_from_scratch_base() {
    let src = State::image("busybox", OpMetadata::default());
    let copied = State::scratch().copy_from(
        &src,
        "/etc",
        "/",
        CopyOptions {
            dir_contents: true,
            ..Default::default()
        },
        OpMetadata::default(),
    );
    let edge = copied.output().unwrap();
    let Op::File(op) = &edge.node.op else {
        panic!("expected a file op");
    };
    assert_eq!(op.base, None);
    assert_eq!(edge.node.inputs.len(), 1);
}

#[rstest]
fn test_merge_collapses_trivial_cases() {
    assert!(State::merge(&[], OpMetadata::default()).is_scratch());
    let one = State::image("a", OpMetadata::default());
    let merged = State::merge(&[one.clone()], OpMetadata::default());
    assert!(std::ptr::eq(
        std::sync::Arc::as_ptr(&one.output().unwrap().node),
        std::sync::Arc::as_ptr(&merged.output().unwrap().node)
    ));
    let two = State::image("b", OpMetadata::default());
    let merged = State::merge(&[one, two], OpMetadata::default());
    assert_eq!(merged.output().unwrap().node.inputs.len(), 2);
}

#[rstest]
fn test_diff_of_two_states() {
    let lower = State::image("base", OpMetadata::default());
    let upper = lower.run(ExecCommand::shell("touch /a")).root();
    let diff = State::diff(&lower, &upper, OpMetadata::default());
    let edge = diff.output().unwrap();
    assert!(matches!(edge.node.op, Op::Diff(_)));
    assert_eq!(edge.node.inputs.len(), 2);
}

#[rstest]
fn test_file_actions_chain() {
    let state = State::scratch()
        .mkdir("/etc", 0o755, 0, 0, OpMetadata::default())
        .mkfile("/etc/motd", 0o644, "hi", 0, 0, OpMetadata::default())
        .symlink("/etc/motd", "/etc/issue", 0, 0, OpMetadata::default())
        .rm("/etc/unwanted", OpMetadata::default());
    let edge = state.output().unwrap();
    let Op::File(op) = &edge.node.op else {
        panic!("expected a file op");
    };
    assert!(matches!(op.actions[0], crate::FileAction::Rm(_)));
    // each action node keeps its base chain as input 0
    assert_eq!(op.base, Some(0));
    assert_eq!(edge.node.inputs.len(), 1);
}

#[rstest]
fn test_mounts_capture_cache_and_secret_settings() {
    let base = State::image("busybox", OpMetadata::default());
    let exec = base.run(
        ExecCommand::shell("true")
            .mount_cache("/root/.cache", "go-cache", crate::CacheSharing::Locked)
            .mount_secret("/run/secrets/tok", "tok")
            .mount_tmpfs("/tmp"),
    );
    let output = exec.root().output().unwrap();
    let Op::Exec(op) = &output.node.op else {
        panic!("expected an exec op");
    };
    assert_eq!(op.mounts.len(), 4);
    assert_eq!(op.mounts[1].cache_id, "go-cache");
    assert!(op.mounts[2].readonly);
    assert_eq!(op.mounts[2].secret_id, "tok");
}
