// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{ExecCommand, OpMetadata, State};
use dalec_schema::{GeneratorKind, SourceGenerator, Spec};

use super::{sources_with, work_dir};
use crate::{Error, Result};

const CARGO_HOME_DIR: &str = "/dalec/cargo-home";
const WORK_DIR: &str = "/work/src";

/// Populate a cargo home (registry cache) from the lockfiles of
/// every cargohome generator, or `None` when there are none.
pub async fn generate(
    spec: &Spec,
    sources: &BTreeMap<String, State>,
    worker: &State,
    _opts: &dalec_graph::SourceOpts,
) -> Result<Option<State>> {
    if !spec.has_cargohomes() {
        return Ok(None);
    }
    let mut home = State::scratch();
    for (name, _, generators) in sources_with(spec, GeneratorKind::Cargohome) {
        let state = sources
            .get(name)
            .ok_or_else(|| Error::MissingSource(name.clone()))?;
        for generator in generators {
            let SourceGenerator::Cargohome(cargo) = generator else {
                continue;
            };
            for path in cargo.paths.iter() {
                let dir = work_dir(WORK_DIR, &cargo.subpath, path);
                let command = ExecCommand::shell("cargo fetch --locked")
                    .env("CARGO_HOME", CARGO_HOME_DIR)
                    .current_dir(&dir)
                    .mount(WORK_DIR, state)
                    .output_mount(CARGO_HOME_DIR, &home)
                    .metadata(OpMetadata::named(format!("fetch cargo registry for {name}")));
                home = worker
                    .run(command)
                    .mount_output(CARGO_HOME_DIR)
                    .expect("an output mount was attached for the cargo home");
            }
        }
    }
    Ok(Some(home))
}
