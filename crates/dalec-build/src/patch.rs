// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{ExecCommand, OpMetadata, State};
use dalec_schema::{SourceMap, Spec};

use crate::source::named_span;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./patch_test.rs"]
mod patch_test;

/// Apply the spec's patches to the compiled source states.
///
/// The input map is not modified; patched entries replace their
/// originals in the returned clone. Sources are visited in sorted
/// name order and each patch list applies sequentially, so a later
/// patch always sees the effect of earlier ones. This runs before
/// dependency generators so that, eg, a patched `go.mod` is what
/// `go mod download` reads.
pub fn apply_patches(
    spec: &Spec,
    states: &BTreeMap<String, State>,
    worker: &State,
    smap: Option<&SourceMap>,
) -> Result<BTreeMap<String, State>> {
    let mut patched = states.clone();
    // BTreeMap iteration is already lexicographic
    for (name, patches) in spec.patches.iter() {
        let mut state = patched
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MissingSource(name.clone()))?;
        for (i, patch) in patches.iter().enumerate() {
            let patch_state = states
                .get(&patch.source)
                .ok_or_else(|| Error::MissingSource(patch.source.clone()))?;
            let patch_source = spec
                .sources
                .get(&patch.source)
                .ok_or_else(|| Error::MissingSource(patch.source.clone()))?;
            // mount just the patch file at a well-known path
            let selector = if patch_source.is_dir() {
                format!("/{}", patch.path.trim_start_matches('/'))
            } else {
                format!("/{}", crate::source::file_name(&patch.source, patch_source))
            };
            let span = named_span(smap, &format!("patches.{name}.{i}"));
            let command = format!("cd /src && patch -p{} < /patch", patch.strip());
            tracing::debug!(source = %name, patch = %patch.source, "applying patch");
            let exec = worker.run(
                ExecCommand::shell(&command)
                    .output_mount("/src", &state)
                    .mount_file("/patch", patch_state, &selector)
                    .metadata(
                        OpMetadata::named(format!("patch {name} with {}", patch.source))
                            .with_span(span),
                    ),
            );
            state = exec
                .mount_output("/src")
                .expect("an output mount was attached at /src");
        }
        patched.insert(name.clone(), state);
    }
    Ok(patched)
}
