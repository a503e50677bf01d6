// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{OpMetadata, State};
use dalec_schema::args::{
    ARG_SIGNING_CONFIG_CONTEXT_NAME,
    ARG_SIGNING_CONFIG_PATH,
    ARG_SKIP_SIGNING,
};
use dalec_schema::ResolvedSpec;

use crate::Result;

#[cfg(test)]
#[path = "./sign_test.rs"]
mod sign_test;

fn truthy(value: Option<&String>) -> bool {
    matches!(value.map(String::as_str), Some("1") | Some("true"))
}

/// Forward built artifacts through the configured signing
/// frontend.
///
/// Returns the input unchanged when no signer is configured, or
/// when the build request set `DALEC_SKIP_SIGNING`.
pub async fn maybe_sign(
    resolved: &ResolvedSpec,
    artifacts: &State,
    build_args: &BTreeMap<String, String>,
) -> Result<State> {
    let Some(signer) = resolved.signer() else {
        return Ok(artifacts.clone());
    };
    if truthy(build_args.get(ARG_SKIP_SIGNING)) {
        tracing::warn!(
            target_key = resolved.target(),
            "signing was skipped by request"
        );
        return Ok(artifacts.clone());
    }

    let mut args = signer.args.clone();
    args.insert("dalec.target".to_string(), resolved.target().to_string());
    for arg in [ARG_SIGNING_CONFIG_CONTEXT_NAME, ARG_SIGNING_CONFIG_PATH] {
        if let Some(value) = build_args.get(arg) {
            args.insert(arg.to_string(), value.clone());
        }
    }
    tracing::debug!(frontend = %signer.image, "signing artifacts");
    Ok(State::frontend_build(
        artifacts,
        &signer.image,
        "",
        "",
        args,
        OpMetadata::named(format!("sign artifacts with {}", signer.image)),
    ))
}
