// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use dalec_graph::{ExecCommand, OpMetadata, SourceOpts, State};
use dalec_schema::{Command, Span};

use crate::{source, Result};

#[cfg(test)]
#[path = "./image_cmd_test.rs"]
mod image_cmd_test;

fn clean(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Run a source's command steps inside its image and extract the
/// configured subtree.
///
/// Steps are sequential: rootfs mutations made by one step are
/// visible to the next, and when the extract path is a subtree its
/// content accumulates across steps via an output mount.
pub(crate) async fn execute(
    name: &str,
    image: State,
    extract_path: &str,
    cmd: &Command,
    opts: &SourceOpts,
    span: Option<Span>,
) -> Result<State> {
    let extract = clean(extract_path);

    // command-level mounts are attached to every step
    let mut mounts = Vec::new();
    for mount in cmd.mounts.iter() {
        let (state, options) =
            Box::pin(source::to_mount(name, &mount.spec, opts, span.clone())).await?;
        mounts.push((mount.dest.clone(), state, options));
    }

    let mut work = image;
    let mut out: Option<State> = None;
    for (i, step) in cmd.steps.iter().enumerate() {
        let mut exec_cmd = ExecCommand::shell(&step.command)
            .envs(cmd.env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .envs(step.env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .metadata(
                OpMetadata::named(format!("{name}: step {i}")).with_span(span.clone()),
            );
        if !cmd.dir.is_empty() {
            exec_cmd = exec_cmd.current_dir(&cmd.dir);
        }
        for (dest, state, options) in mounts.iter() {
            exec_cmd = if options.source_path.is_empty() {
                exec_cmd.mount(dest, state)
            } else {
                exec_cmd.mount_file(dest, state, &options.source_path)
            };
        }
        for mount in step.mounts.iter() {
            let (state, options) =
                Box::pin(source::to_mount(name, &mount.spec, opts, span.clone())).await?;
            exec_cmd = if options.source_path.is_empty() {
                exec_cmd.mount(&mount.dest, &state)
            } else {
                exec_cmd.mount_file(&mount.dest, &state, &options.source_path)
            };
        }

        if extract == "/" {
            let exec = work.run(exec_cmd);
            work = exec.root();
            out = Some(work.clone());
            continue;
        }
        let accumulated = out.take().unwrap_or_else(State::scratch);
        let exec = work.run(exec_cmd.output_mount(extract, &accumulated));
        out = exec.mount_output(extract);
        work = exec.root();
    }

    Ok(out.unwrap_or(work))
}
