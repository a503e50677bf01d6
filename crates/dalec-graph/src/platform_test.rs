// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use rstest::rstest;

use super::Platform;

#[rstest]
#[case("linux/amd64", "linux", "amd64", "")]
#[case("linux/arm64/v8", "linux", "arm64", "v8")]
#[case("windows/amd64", "windows", "amd64", "")]
fn test_parse(#[case] raw: &str, #[case] os: &str, #[case] arch: &str, #[case] variant: &str) {
    let platform: Platform = raw.parse().unwrap();
    assert_eq!(platform.os, os);
    assert_eq!(platform.arch, arch);
    assert_eq!(platform.variant, variant);
    assert_eq!(platform.to_string(), raw);
}

#[rstest]
#[case("linux")]
#[case("linux/")]
#[case("/amd64")]
#[case("linux/amd64/v8/extra")]
fn test_parse_invalid(#[case] raw: &str) {
    raw.parse::<Platform>().unwrap_err();
}

#[rstest]
fn test_host_is_wellformed() {
    let host = Platform::host();
    assert!(!host.os.is_empty());
    assert!(!host.arch.is_empty());
}
