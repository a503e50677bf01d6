// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use ngrammatic::CorpusBuilder;

/// The rejection message for a document key that is not part of
/// the schema at its position.
///
/// Names the key and where in the document it sat; when the key
/// looks like a typo of an accepted one, that one is suggested,
/// otherwise the accepted set is listed. The decode layer attaches
/// the line position.
pub(crate) fn unknown_key_error(context: &str, key: &str, accepted: &[&str]) -> String {
    let mut corpus = CorpusBuilder::new().finish();
    for candidate in accepted.iter() {
        corpus.add_text(candidate);
    }
    match corpus.search(key, 0.6).into_iter().next() {
        Some(close) => format!(
            "unknown key {key:?} in {context}, did you mean {:?}?",
            close.text
        ),
        None => format!(
            "unknown key {key:?} in {context}, accepted keys are: {}",
            accepted.join(", ")
        ),
    }
}

#[cfg(test)]
#[path = "./unknown_key_test.rs"]
mod unknown_key_test;
