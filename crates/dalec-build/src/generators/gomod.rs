// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{ExecCommand, OpMetadata, State};
use dalec_schema::{
    GeneratorKind,
    GomodAuth,
    GomodGenerator,
    GomodSsh,
    SourceGenerator,
    SourceKind,
    Spec,
};

use super::{sources_with, work_dir};
use crate::{Error, Result};

/// Extension key holding generated `go.mod` edit scripts, so a
/// marshalled spec keeps producing the same module graph.
pub const GOMOD_PATCHES_EXT: &str = "x-dalec-gomod-patches";

const MODCACHE_DIR: &str = "/go/pkg/mod";
const WORK_DIR: &str = "/work/src";

/// The `go mod` commands a generator's replace/require directives
/// expand to.
pub fn edit_commands(generator: &GomodGenerator) -> Vec<String> {
    let mut commands = Vec::new();
    for (module, replacement) in generator.replace.iter() {
        commands.push(format!("go mod edit -replace={module}={replacement}"));
    }
    for (module, version) in generator.require.iter() {
        commands.push(format!("go mod edit -require={module}@{version}"));
    }
    if !commands.is_empty() {
        commands.push("go mod tidy".to_string());
        commands.push("go mod download".to_string());
    }
    commands
}

/// Record the generated module edits on the spec as an extension,
/// so they survive a marshal round-trip.
pub fn record_patches(spec: Spec) -> dalec_schema::Result<Spec> {
    let mut recorded: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, _, generators) in sources_with(&spec, GeneratorKind::Gomod) {
        let mut commands = Vec::new();
        for generator in generators {
            let SourceGenerator::Gomod(gomod) = generator else {
                continue;
            };
            commands.extend(edit_commands(gomod));
        }
        if !commands.is_empty() {
            recorded.insert(name.clone(), commands);
        }
    }
    if recorded.is_empty() {
        return Ok(spec);
    }
    let value = serde_yaml::to_value(&recorded).map_err(dalec_schema::Error::SpecEncodingError)?;
    spec.with_extension(GOMOD_PATCHES_EXT, value)
}

fn recorded_commands(spec: &Spec, name: &str) -> Option<Vec<String>> {
    let value = spec.ext(GOMOD_PATCHES_EXT)?;
    let map: BTreeMap<String, Vec<String>> = serde_yaml::from_value(value.clone()).ok()?;
    map.get(name).cloned()
}

/// Authentication for the hosts a module download may touch:
/// explicit generator configuration first, then whatever the
/// enclosing git source authenticates with.
fn resolve_auth(source: &dalec_schema::Source, generator: &GomodGenerator) -> BTreeMap<String, GomodAuth> {
    let mut auth = generator.auth.clone();
    let SourceKind::Git(git) = &source.kind else {
        return auth;
    };
    let Some(host) = git_host(&git.url) else {
        return auth;
    };
    if auth.contains_key(&host) || git.auth.is_empty() {
        return auth;
    }
    let derived = if !git.auth.token.is_empty() {
        GomodAuth {
            token: git.auth.token.clone(),
            ..Default::default()
        }
    } else if !git.auth.header.is_empty() {
        GomodAuth {
            header: git.auth.header.clone(),
            ..Default::default()
        }
    } else {
        GomodAuth {
            ssh: Some(GomodSsh {
                id: git.auth.ssh.clone(),
                username: "git".to_string(),
            }),
            ..Default::default()
        }
    };
    auth.insert(host, derived);
    auth
}

fn git_host(raw: &str) -> Option<String> {
    if let Ok(parsed) = url::Url::parse(raw) {
        return parsed.host_str().map(|h| h.to_string());
    }
    // scp-style: git@host:path
    let rest = raw.split_once('@').map(|(_, rest)| rest).unwrap_or(raw);
    let host = rest.split([':', '/']).next()?;
    (!host.is_empty()).then(|| host.to_string())
}

/// Shell lines wiring git credentials into the go toolchain via
/// GIT_CONFIG_* variables; secret files are read inside the step.
fn auth_script_lines(auth: &BTreeMap<String, GomodAuth>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut count = 0usize;
    for (host, entry) in auth.iter() {
        if !entry.token.is_empty() {
            lines.push(format!(
                "export GIT_CONFIG_KEY_{count}='http.https://{host}/.extraheader' \
                 GIT_CONFIG_VALUE_{count}=\"Authorization: Bearer $(cat /run/secrets/{})\"",
                entry.token
            ));
            count += 1;
        } else if !entry.header.is_empty() {
            lines.push(format!(
                "export GIT_CONFIG_KEY_{count}='http.https://{host}/.extraheader' \
                 GIT_CONFIG_VALUE_{count}=\"$(cat /run/secrets/{})\"",
                entry.header
            ));
            count += 1;
        }
        if let Some(ssh) = entry.ssh.as_ref() {
            let user = if ssh.username.is_empty() { "git" } else { &ssh.username };
            lines.push(format!(
                "git config --global url.'ssh://{user}@{host}/'.insteadOf 'https://{host}/'"
            ));
        }
    }
    if count > 0 {
        lines.push(format!("export GIT_CONFIG_COUNT={count}"));
    }
    lines
}

/// Attach the secret and ssh mounts the auth script lines read.
fn mount_auth(mut command: ExecCommand, auth: &BTreeMap<String, GomodAuth>) -> ExecCommand {
    for entry in auth.values() {
        if !entry.token.is_empty() {
            command = command.mount_secret(format!("/run/secrets/{}", entry.token), &entry.token);
        } else if !entry.header.is_empty() {
            command = command.mount_secret(format!("/run/secrets/{}", entry.header), &entry.header);
        }
        if let Some(ssh) = entry.ssh.as_ref() {
            command = command.mount_ssh(&ssh.id);
        }
    }
    command
}

/// Produce the go module cache for every gomod generator in the
/// spec, or `None` when there are none.
///
/// `sources` must be the patched source states: a patch that edits
/// `go.mod` has to be applied before modules are downloaded.
pub async fn generate(
    spec: &Spec,
    sources: &BTreeMap<String, State>,
    worker: &State,
    opts: &dalec_graph::SourceOpts,
) -> Result<Option<State>> {
    if !spec.has_gomods() {
        return Ok(None);
    }
    let mut cache = State::scratch();
    for (name, source, generators) in sources_with(spec, GeneratorKind::Gomod) {
        let state = sources
            .get(name)
            .ok_or_else(|| Error::MissingSource(name.clone()))?;
        for generator in generators {
            let SourceGenerator::Gomod(gomod) = generator else {
                continue;
            };
            let auth = resolve_auth(source, gomod);
            let hosts: Vec<&str> = auth.keys().map(String::as_str).collect();
            let edit = recorded_commands(spec, name).unwrap_or_else(|| edit_commands(gomod));
            for path in gomod.paths.iter() {
                let dir = work_dir(WORK_DIR, &gomod.subpath, path);
                let mut script = auth_script_lines(&auth);
                script.extend(edit.iter().cloned());
                script.push("go mod download".to_string());

                let mut command = ExecCommand::shell(&script.join("\n"))
                    .env("GOMODCACHE", MODCACHE_DIR)
                    .current_dir(&dir)
                    .mount(WORK_DIR, state)
                    .output_mount(MODCACHE_DIR, &cache)
                    .metadata(OpMetadata::named(format!("download go modules for {name}")));
                if !hosts.is_empty() {
                    command = command
                        .env("GOPRIVATE", hosts.join(","))
                        .env("GOINSECURE", hosts.join(","));
                }
                let mut command = mount_auth(command, &auth);
                if let Some(helper) = opts.git_cred_helper.as_ref() {
                    command = helper.apply(command);
                }
                cache = worker
                    .run(command)
                    .mount_output(MODCACHE_DIR)
                    .expect("an output mount was attached for the module cache");
            }
        }
    }
    tracing::debug!("generated go module cache");
    Ok(Some(cache))
}
