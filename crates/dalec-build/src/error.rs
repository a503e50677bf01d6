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
    #[error("Source {0:?} is not present in the compiled source set")]
    MissingSource(String),
    #[error("No build context named {0:?} was supplied")]
    MissingContext(String),
    #[error("The engine connection does not provide {0}")]
    MissingCapability(&'static str),
    #[error("The spec has {0} generators but no worker image was supplied for them")]
    MissingWorker(dalec_schema::GeneratorKind),
    #[error(transparent)]
    #[diagnostic(forward(0))]
    TestFailures(#[from] crate::testrunner::TestFailures),
    #[error("Error: {0}")]
    String(String),
}
