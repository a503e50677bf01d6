// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use format_serde_error::SerdeError;
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Decode a yaml document, rendering any failure against the
/// offending line of the input.
pub fn decode_yaml<T, S>(yaml: S) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    S: Into<String>,
{
    let yaml = yaml.into();
    serde_yaml::from_str(&yaml).map_err(|err| {
        // serde_yaml 0.9 no longer exposes positions in a form
        // format_serde_error consumes, so they are carried over by
        // hand
        let position = err
            .location()
            .map(|at| (at.line(), at.column().saturating_sub(1)));
        let cause: Box<dyn std::error::Error> = Box::new(err);
        Error::InvalidYaml(SerdeError::new(
            yaml,
            (cause, position.map(|p| p.0), position.map(|p| p.1)),
        ))
    })
}

#[derive(Diagnostic, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidYaml(#[from] format_serde_error::SerdeError),
    #[error("Failed to encode spec: {0}")]
    SpecEncodingError(#[source] serde_yaml::Error),
    #[error("Invalid extension key {0:?}: extension keys must begin with 'x-' or 'X-'")]
    InvalidExtensionKey(String),
    #[error(transparent)]
    #[diagnostic(forward(0))]
    Validation(#[from] crate::validation::ValidationErrors),
    #[error(transparent)]
    #[diagnostic(forward(0))]
    Substitution(#[from] crate::args::SubstitutionErrors),
    #[error("Unknown build target {0:?}")]
    UnknownTarget(String),
    #[error("Error: {0}")]
    String(String),
}

impl Error {
    /// Wraps an error message with a prefix, creating a contextual but generic error
    pub fn wrap<S: AsRef<str>>(prefix: S, err: Self) -> Self {
        Error::String(format!("{}: {:?}", prefix.as_ref(), err))
    }
}
