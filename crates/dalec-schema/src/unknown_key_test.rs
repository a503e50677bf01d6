// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use rstest::rstest;

use super::unknown_key_error;

#[rstest]
fn test_close_key_is_suggested() {
    let message = unknown_key_error("the spec root", "sorces", &["sources", "patches"]);
    assert!(message.contains("\"sorces\""), "{message}");
    assert!(message.contains("did you mean \"sources\"?"), "{message}");
}

#[rstest]
fn test_unrelated_key_lists_accepted_set() {
    let message = unknown_key_error("a source definition", "zzz", &["git", "http"]);
    assert!(message.contains("accepted keys are: git, http"), "{message}");
}

#[rstest]
fn test_context_is_named() {
    let message = unknown_key_error("a source definition", "gti", &["git"]);
    assert!(message.contains("a source definition"), "{message}");
}
