// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use dalec_graph::{
    CopyOptions,
    GitOptions,
    HttpOptions,
    LocalOptions,
    OpMetadata,
    SourceOpts,
    State,
};
use dalec_schema::{Source, SourceKind, SourceMap, Span};

use crate::{image_cmd, Error, Result};

#[cfg(test)]
#[path = "./source_test.rs"]
mod source_test;

/// Extra options returned when a source is prepared for mounting.
#[derive(Clone, Debug, Default)]
pub struct MountOptions {
    /// Subpath selecting the single file of a file-backed source.
    pub source_path: String,
}

pub(crate) fn named_span(smap: Option<&SourceMap>, path: &str) -> Option<Span> {
    smap.map(|m| m.locate(path))
}

fn meta(name: &str, verb: &str, span: Option<Span>) -> OpMetadata {
    OpMetadata::named(format!("{verb} {name}")).with_span(span)
}

/// The file name a file-backed source produces.
pub(crate) fn file_name<'a>(name: &'a str, source: &'a Source) -> &'a str {
    match &source.kind {
        SourceKind::Http(http) => http
            .url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(name),
        _ => name,
    }
}

/// Produce the fully filtered rootfs (or file) of a source.
///
/// `rename` repositions the result under `/<rename>`; for
/// file-backed sources it renames the file itself.
pub async fn to_state(
    name: &str,
    source: &Source,
    rename: &str,
    opts: &SourceOpts,
    span: Option<Span>,
) -> Result<State> {
    let fetched = fetch(name, source, rename, opts, span.clone()).await?;
    Ok(filtered(name, source, rename, fetched, span))
}

/// Produce a source suitable for mounting into an executor step.
pub async fn to_mount(
    name: &str,
    source: &Source,
    opts: &SourceOpts,
    span: Option<Span>,
) -> Result<(State, MountOptions)> {
    let state = to_state(name, source, "", opts, span).await?;
    let mut options = MountOptions::default();
    if !source.is_dir() {
        options.source_path = format!("/{}", file_name(name, source));
    }
    Ok((state, options))
}

async fn fetch(
    name: &str,
    source: &Source,
    rename: &str,
    opts: &SourceOpts,
    span: Option<Span>,
) -> Result<State> {
    match &source.kind {
        SourceKind::Git(git) => Ok(State::git(
            &git.url,
            &git.commit,
            GitOptions {
                keep_git_dir: git.keep_git_dir,
                auth_header_secret: git.auth.header.clone(),
                auth_token_secret: git.auth.token.clone(),
                ssh_socket: git.auth.ssh.clone(),
            },
            meta(name, "clone", span),
        )),
        SourceKind::Http(http) => {
            let filename = if rename.is_empty() {
                file_name(name, source).to_string()
            } else {
                rename.to_string()
            };
            Ok(State::http(
                &http.url,
                HttpOptions {
                    digest: http
                        .digest
                        .as_ref()
                        .map(|d| d.as_str().to_string())
                        .unwrap_or_default(),
                    permissions: http.permissions,
                    filename,
                },
                meta(name, "fetch", span),
            ))
        }
        SourceKind::Image(image) => {
            let mut reference = image.reference.clone();
            // pin the reference so later evaluations see the same image
            if let Some(resolver) = opts.image_resolver.as_ref() {
                if !reference.contains('@') {
                    let (digest, _) = resolver
                        .resolve(&reference, opts.target_platform.as_ref())
                        .await?;
                    if !digest.is_empty() {
                        reference = format!("{reference}@{digest}");
                    }
                }
            }
            let state = State::image(&reference, meta(name, "pull", span.clone()));
            match image.cmd.as_ref() {
                None => Ok(state),
                Some(cmd) => {
                    image_cmd::execute(name, state, &source.path, cmd, opts, span).await
                }
            }
        }
        SourceKind::Context(context) => {
            let fetcher = opts
                .context_fetcher
                .as_ref()
                .ok_or(Error::MissingCapability("a context fetcher"))?;
            let state = fetcher
                .get(&context.name, &context_filters(source))
                .await?
                .ok_or_else(|| Error::MissingContext(context.name.clone()))?;
            Ok(state)
        }
        SourceKind::Build(build) => {
            let forwarder = opts
                .dockerfile_forwarder
                .as_ref()
                .ok_or(Error::MissingCapability("a dockerfile frontend"))?;
            // an inline dockerfile is renamed to the configured path
            let inner_rename = match &build.source.kind {
                SourceKind::Inline(inline) if inline.file.is_some() => {
                    build.dockerfile_path.as_str()
                }
                _ => "",
            };
            let inner = Box::pin(to_state(
                name,
                &build.source,
                inner_rename,
                opts,
                span.clone(),
            ))
            .await?;
            let config = dalec_graph::BuildConfig {
                dockerfile_path: build.dockerfile_path.clone(),
                target: build.target.clone(),
                args: build.args.clone(),
                platform: opts.target_platform.clone(),
            };
            forwarder.forward(inner, config).await
            .map_err(Error::Graph)
        }
        SourceKind::Inline(inline) => {
            let filename = if rename.is_empty() { name } else { rename };
            if let Some(file) = inline.file.as_ref() {
                let mode = if file.permissions == 0 { 0o644 } else { file.permissions };
                return Ok(State::scratch().mkfile(
                    &format!("/{filename}"),
                    mode,
                    file.contents.clone(),
                    file.uid,
                    file.gid,
                    meta(name, "write", span),
                ));
            }
            let dir = inline.dir.as_ref().expect("validated inline source");
            let mode = if dir.permissions == 0 { 0o755 } else { dir.permissions };
            let mut state = State::scratch().mkdir(
                "/",
                mode,
                dir.uid,
                dir.gid,
                meta(name, "write", span.clone()),
            );
            for (fname, file) in dir.files.iter() {
                let mode = if file.permissions == 0 { 0o644 } else { file.permissions };
                state = state.mkfile(
                    &format!("/{fname}"),
                    mode,
                    file.contents.clone(),
                    file.uid,
                    file.gid,
                    meta(name, "write", span.clone()),
                );
            }
            Ok(state)
        }
    }
}

/// Filters for a local-context fetch: the client only transfers
/// what the spec will use.
fn context_filters(source: &Source) -> LocalOptions {
    let subpath = source.path.trim_matches('/');
    let mut options = LocalOptions::default();
    if subpath.is_empty() {
        options.include_patterns = source.includes.clone();
        options.exclude_patterns = source.excludes.clone();
        return options;
    }
    options.follow_paths = vec![subpath.to_string()];
    options.exclude_patterns = vec!["*".to_string(), format!("!{subpath}")];
    options.include_patterns = source
        .includes
        .iter()
        .map(|p| rebase_pattern(subpath, p))
        .collect();
    options
        .exclude_patterns
        .extend(source.excludes.iter().map(|p| rebase_pattern(subpath, p)));
    options
}

/// Rebase a user filter pattern onto a requested subpath.
fn rebase_pattern(subpath: &str, pattern: &str) -> String {
    match pattern.strip_prefix('/') {
        Some(rooted) => format!("{subpath}/{rooted}"),
        None => format!("{subpath}/{pattern}"),
    }
}

fn filtered(name: &str, source: &Source, rename: &str, state: State, span: Option<Span>) -> State {
    if !source.is_dir() {
        // file renames happen at fetch; filters are rejected by validation
        return state;
    }
    // context filters were already applied by the client fetch
    let (includes, excludes) = match &source.kind {
        SourceKind::Context(_) => (Vec::new(), Vec::new()),
        _ => (source.includes.clone(), source.excludes.clone()),
    };
    // command execution already extracted the configured subtree
    let already_extracted =
        matches!(&source.kind, SourceKind::Image(image) if image.cmd.is_some());
    let subpath = if already_extracted {
        ""
    } else {
        source.path.trim_matches('/')
    };
    if subpath.is_empty() && includes.is_empty() && excludes.is_empty() && rename.is_empty() {
        return state;
    }
    let dest = if rename.is_empty() {
        "/".to_string()
    } else {
        format!("/{rename}/")
    };
    State::scratch().copy_from(
        &state,
        &format!("/{subpath}"),
        &dest,
        CopyOptions {
            dir_contents: true,
            include_patterns: includes,
            exclude_patterns: excludes,
            follow_symlinks: true,
        },
        meta(name, "extract", span),
    )
}

/// Compile every source of a spec, keyed by name, iterating in
/// sorted order so the emitted graph is deterministic.
pub async fn compile_sources(
    spec: &dalec_schema::Spec,
    opts: &SourceOpts,
    smap: Option<&SourceMap>,
) -> Result<BTreeMap<String, State>> {
    let mut states = BTreeMap::new();
    for (name, source) in spec.sources.iter() {
        let span = named_span(smap, &format!("sources.{name}"));
        let state = to_state(name, source, "", opts, span).await?;
        states.insert(name.clone(), state);
    }
    Ok(states)
}
