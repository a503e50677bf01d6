// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

//! Compiles a resolved spec into build-graph fragments: source
//! states, the patch pipeline, dependency generators, signing and
//! the declarative test protocol.

mod error;
pub mod generators;
mod image_cmd;
mod patch;
mod prepare;
mod sign;
pub mod source;
pub mod testrunner;

pub use error::{Error, Result};
pub use generators::{
    generate_cargohome,
    generate_gomod,
    generate_node_mods,
    generate_pip,
    gomod_edit_commands,
    record_gomod_patches,
    GOMOD_PATCHES_EXT,
};
pub use patch::apply_patches;
pub use prepare::{prepare_build, GeneratorWorkers, PreparedBuild};
pub use sign::maybe_sign;
pub use source::{compile_sources, to_mount, to_state, MountOptions};
pub use testrunner::{run_tests, tests_skipped, FileStat, TestFailure, TestFailures, TestHarness};
