// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{SourceOpts, State};
use dalec_schema::{GeneratorKind, SourceMap, Spec};

use crate::{generators, patch, source, Error, Result};

#[cfg(test)]
#[path = "./prepare_test.rs"]
mod prepare_test;

/// Everything a distro handler mounts into its package build:
/// the patched source trees plus the vendored dependency caches.
#[derive(Clone, Debug, Default)]
pub struct PreparedBuild {
    pub sources: BTreeMap<String, State>,
    pub gomod_cache: Option<State>,
    pub cargo_home: Option<State>,
    pub pip_downloads: Option<State>,
    pub node_cache: Option<State>,
}

/// Toolchain images the dependency generators run in, supplied by
/// the distro handler. A worker is only required when the spec
/// carries a generator of that kind.
#[derive(Clone, Debug, Default)]
pub struct GeneratorWorkers {
    pub gomod: Option<State>,
    pub cargo: Option<State>,
    pub pip: Option<State>,
    pub node: Option<State>,
}

impl GeneratorWorkers {
    fn require(&self, kind: GeneratorKind) -> Result<&State> {
        let worker = match kind {
            GeneratorKind::Gomod => self.gomod.as_ref(),
            GeneratorKind::Cargohome => self.cargo.as_ref(),
            GeneratorKind::Pip => self.pip.as_ref(),
            GeneratorKind::NodeMod => self.node.as_ref(),
        };
        worker.ok_or(Error::MissingWorker(kind))
    }
}

/// Compile the spec's sources, apply its patches and run its
/// dependency generators, in that order.
///
/// Patches land before any generator runs, so a patch that edits
/// eg `go.mod` is what the module download sees.
pub async fn prepare_build(
    spec: &Spec,
    patch_worker: &State,
    workers: &GeneratorWorkers,
    opts: &SourceOpts,
    smap: Option<&SourceMap>,
) -> Result<PreparedBuild> {
    let states = source::compile_sources(spec, opts, smap).await?;
    let patched = patch::apply_patches(spec, &states, patch_worker, smap)?;

    let mut prepared = PreparedBuild {
        sources: patched,
        ..Default::default()
    };
    if spec.has_gomods() {
        let worker = workers.require(GeneratorKind::Gomod)?;
        prepared.gomod_cache =
            generators::generate_gomod(spec, &prepared.sources, worker, opts).await?;
    }
    if spec.has_cargohomes() {
        let worker = workers.require(GeneratorKind::Cargohome)?;
        prepared.cargo_home =
            generators::generate_cargohome(spec, &prepared.sources, worker, opts).await?;
    }
    if spec.has_pips() {
        let worker = workers.require(GeneratorKind::Pip)?;
        prepared.pip_downloads =
            generators::generate_pip(spec, &prepared.sources, worker, opts).await?;
    }
    if spec.has_node_mods() {
        let worker = workers.require(GeneratorKind::NodeMod)?;
        prepared.node_cache =
            generators::generate_node_mods(spec, &prepared.sources, worker, opts).await?;
    }
    Ok(prepared)
}
