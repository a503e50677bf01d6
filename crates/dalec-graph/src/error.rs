// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Diagnostic, Debug, Error)]
pub enum Error {
    #[error("Failed to marshal graph definition: {0}")]
    MarshalError(#[source] serde_json::Error),
    #[error("Invalid platform {0:?}, expected <os>/<arch>[/<variant>]")]
    InvalidPlatform(String),
    #[error("The engine connection does not provide {0}")]
    MissingCapability(&'static str),
    #[error("Engine error: {0}")]
    Engine(String),
    #[error("Error: {0}")]
    String(String),
}
