// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{ExecCommand, OpMetadata, State};
use dalec_schema::{GeneratorKind, SourceGenerator, Spec};

use super::{sources_with, work_dir};
use crate::{Error, Result};

const CACHE_DIR: &str = "/dalec/node-cache";
const WORK_DIR: &str = "/work/src";

/// Produce an offline mirror of the node packages every nodemod
/// generator resolves, or `None` when there are none.
pub async fn generate(
    spec: &Spec,
    sources: &BTreeMap<String, State>,
    worker: &State,
    _opts: &dalec_graph::SourceOpts,
) -> Result<Option<State>> {
    if !spec.has_node_mods() {
        return Ok(None);
    }
    let mut cache = State::scratch();
    for (name, _, generators) in sources_with(spec, GeneratorKind::NodeMod) {
        let state = sources
            .get(name)
            .ok_or_else(|| Error::MissingSource(name.clone()))?;
        for generator in generators {
            let SourceGenerator::NodeMod(node) = generator else {
                continue;
            };
            for path in node.paths.iter() {
                let dir = work_dir(WORK_DIR, &node.subpath, path);
                let command =
                    ExecCommand::shell(&format!("npm ci --cache {CACHE_DIR} --prefer-offline"))
                        .current_dir(&dir)
                        .mount(WORK_DIR, state)
                        .output_mount(CACHE_DIR, &cache)
                        .metadata(OpMetadata::named(format!(
                            "mirror node packages for {name}"
                        )));
                cache = worker
                    .run(command)
                    .mount_output(CACHE_DIR)
                    .expect("an output mount was attached for the package cache");
            }
        }
    }
    Ok(Some(cache))
}
