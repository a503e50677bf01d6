// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

//! The lazy build graph the compiler emits: immutable op/state
//! handles, deterministic definition marshalling and the traits
//! the external engine is reached through.

mod definition;
mod engine;
mod error;
mod op;
mod platform;
mod state;

pub use definition::{Definition, Location, MarshaledMetadata, MarshaledOp, OutputRef};
pub use engine::{
    BuildConfig,
    ContextFetcher,
    DockerfileForwarder,
    GitCredHelper,
    ImageMetaResolver,
    SourceOpts,
};
pub use error::{Error, Result};
pub use op::{
    BuildOp,
    CacheSharing,
    CopyAction,
    DiffOp,
    Edge,
    ExecNetwork,
    ExecOp,
    FileAction,
    FileOp,
    MergeOp,
    MkdirAction,
    MkfileAction,
    MountSpec,
    MountType,
    Node,
    Op,
    OpMetadata,
    RmAction,
    SourceOp,
    SymlinkAction,
};
pub use platform::Platform;
pub use state::{
    CopyOptions,
    Exec,
    ExecCommand,
    GitOptions,
    HttpOptions,
    LocalOptions,
    State,
};
