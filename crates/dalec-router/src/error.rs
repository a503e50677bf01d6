// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Diagnostic, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(forward(0))]
    Schema(#[from] dalec_schema::Error),
    #[error(transparent)]
    #[diagnostic(forward(0))]
    Graph(#[from] dalec_graph::Error),
    #[error(transparent)]
    #[diagnostic(forward(0))]
    Build(#[from] dalec_build::Error),
    #[error("Unknown build target {requested:?}, known targets: {}", known.join(", "))]
    UnknownTarget {
        requested: String,
        known: Vec<String>,
    },
    #[error("This build supports a single base image, {0} were configured")]
    MultipleBaseImages(usize),
    #[error("Error: {0}")]
    String(String),
}
