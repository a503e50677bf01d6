// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use rstest::rstest;

use super::{ChangelogEntry, Date};

#[rstest]
fn test_date_round_trip() {
    let entry = serde_yaml::from_str::<ChangelogEntry>("date: '2024-03-01'\nauthor: dev\n").unwrap();
    assert_eq!(entry.date.as_str(), "2024-03-01");
    let emitted = serde_yaml::to_string(&entry).unwrap();
    let reparsed = serde_yaml::from_str::<ChangelogEntry>(&emitted).unwrap();
    assert_eq!(entry, reparsed);
}

#[rstest]
#[case("2024-1-01")]
#[case("24-01-01")]
#[case("2024/01/01")]
#[case("yesterday")]
fn test_invalid_dates_rejected(#[case] raw: &str) {
    raw.parse::<Date>().unwrap_err();
}

#[rstest]
fn test_unquoted_date_decodes_as_string() {
    // yaml may hand the scalar through without quotes
    let entry = serde_yaml::from_str::<ChangelogEntry>("date: 2024-03-01\n").unwrap();
    assert_eq!(entry.date.to_string(), "2024-03-01");
}
