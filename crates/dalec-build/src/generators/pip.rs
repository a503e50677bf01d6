// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{ExecCommand, OpMetadata, State};
use dalec_schema::{GeneratorKind, SourceGenerator, Spec};

use super::{sources_with, work_dir};
use crate::{Error, Result};

const DOWNLOAD_DIR: &str = "/dalec/pip-downloads";
const WORK_DIR: &str = "/work/src";

/// Download the python requirements of every pip generator into a
/// shared package directory, or `None` when there are none.
pub async fn generate(
    spec: &Spec,
    sources: &BTreeMap<String, State>,
    worker: &State,
    _opts: &dalec_graph::SourceOpts,
) -> Result<Option<State>> {
    if !spec.has_pips() {
        return Ok(None);
    }
    let mut downloads = State::scratch();
    for (name, _, generators) in sources_with(spec, GeneratorKind::Pip) {
        let state = sources
            .get(name)
            .ok_or_else(|| Error::MissingSource(name.clone()))?;
        for generator in generators {
            let SourceGenerator::Pip(pip) = generator else {
                continue;
            };
            for path in pip.paths.iter() {
                let dir = work_dir(WORK_DIR, &pip.subpath, path);
                let mut script = format!(
                    "python3 -m pip download -r '{}' --dest {DOWNLOAD_DIR}",
                    pip.requirements_file
                );
                if !pip.index_url.is_empty() {
                    script.push_str(&format!(" --index-url '{}'", pip.index_url));
                }
                for extra in pip.extra_index_urls.iter() {
                    script.push_str(&format!(" --extra-index-url '{extra}'"));
                }
                let command = ExecCommand::shell(&script)
                    .current_dir(&dir)
                    .mount(WORK_DIR, state)
                    .output_mount(DOWNLOAD_DIR, &downloads)
                    .metadata(OpMetadata::named(format!(
                        "download python requirements for {name}"
                    )));
                downloads = worker
                    .run(command)
                    .mount_output(DOWNLOAD_DIR)
                    .expect("an output mount was attached for the downloads");
            }
        }
    }
    Ok(Some(downloads))
}
