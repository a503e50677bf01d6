// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dalec_graph::{
    BuildConfig,
    ContextFetcher,
    DockerfileForwarder,
    LocalOptions,
    Op,
    OpMetadata,
    SourceOpts,
    State,
};
use dalec_schema::Source;
use rstest::rstest;

use super::{compile_sources, to_mount, to_state};
use crate::Error;

#[derive(Default)]
struct FakeContexts {
    seen: Mutex<Option<(String, LocalOptions)>>,
}

#[async_trait]
impl ContextFetcher for FakeContexts {
    async fn get(
        &self,
        name: &str,
        options: &LocalOptions,
    ) -> dalec_graph::Result<Option<State>> {
        if name == "missing" {
            return Ok(None);
        }
        *self.seen.lock().unwrap() = Some((name.to_string(), options.clone()));
        Ok(Some(State::local(name, options.clone(), OpMetadata::default())))
    }
}

struct EchoForwarder {
    seen: Mutex<Option<BuildConfig>>,
}

#[async_trait]
impl DockerfileForwarder for EchoForwarder {
    async fn forward(&self, inner: State, config: BuildConfig) -> dalec_graph::Result<State> {
        *self.seen.lock().unwrap() = Some(config);
        Ok(inner)
    }
}

fn opts() -> (SourceOpts, Arc<FakeContexts>, Arc<EchoForwarder>) {
    let contexts = Arc::new(FakeContexts::default());
    let forwarder = Arc::new(EchoForwarder {
        seen: Mutex::new(None),
    });
    let opts = SourceOpts {
        context_fetcher: Some(contexts.clone()),
        dockerfile_forwarder: Some(forwarder.clone()),
        ..Default::default()
    };
    (opts, contexts, forwarder)
}

fn source(yaml: &str) -> Source {
    let mut source = Source::from_yaml(yaml).unwrap();
    source.fill_defaults();
    source
}

#[rstest]
#[tokio::test]
async fn test_git_source_state() {
    let (opts, ..) = opts();
    let src = source("git: {url: 'https://example.com/app.git', commit: abc}");
    let state = to_state("app", &src, "", &opts, None).await.unwrap();
    let Op::Source(op) = &state.output().unwrap().node.op else {
        panic!("expected a source op");
    };
    assert_eq!(op.identifier, "git://https://example.com/app.git#abc");
}

#[rstest]
#[tokio::test]
async fn test_pass_through_without_filters() {
    let (opts, ..) = opts();
    let src = source("git: {url: x, commit: y}");
    let state = to_state("app", &src, "", &opts, None).await.unwrap();
    // no filter stage is inserted: the source op is the result
    assert!(matches!(state.output().unwrap().node.op, Op::Source(_)));
}

#[rstest]
#[tokio::test]
async fn test_filters_insert_a_copy_stage() {
    let (opts, ..) = opts();
    let src = source("git: {url: x, commit: y}\npath: sub\nincludes: ['*.go']\n");
    let state = to_state("app", &src, "", &opts, None).await.unwrap();
    let edge = state.output().unwrap();
    let Op::File(op) = &edge.node.op else {
        panic!("expected a file op, got {:?}", edge.node.op);
    };
    let dalec_graph::FileAction::Copy(copy) = &op.actions[0] else {
        panic!("expected a copy action");
    };
    assert_eq!(copy.src, "/sub");
    assert!(copy.dir_contents);
    assert_eq!(copy.include_patterns, vec!["*.go"]);
}

#[rstest]
#[tokio::test]
async fn test_rename_repositions_directory_sources() {
    let (opts, ..) = opts();
    let src = source("git: {url: x, commit: y}");
    let state = to_state("app", &src, "app", &opts, None).await.unwrap();
    let Op::File(op) = &state.output().unwrap().node.op else {
        panic!("expected a file op");
    };
    let dalec_graph::FileAction::Copy(copy) = &op.actions[0] else {
        panic!("expected a copy action");
    };
    assert_eq!(copy.dest, "/app/");
}

#[rstest]
#[tokio::test]
async fn test_http_mount_selects_the_file() {
    let (opts, ..) = opts();
    let src = source("http: {url: 'https://example.com/archive.tar.gz'}");
    let (_, options) = to_mount("archive", &src, &opts, None).await.unwrap();
    assert_eq!(options.source_path, "/archive.tar.gz");
}

#[rstest]
#[tokio::test]
async fn test_inline_file_mount_uses_source_name() {
    let (opts, ..) = opts();
    let src = source("inline:\n  file: {contents: hi}\n");
    let (state, options) = to_mount("notes", &src, &opts, None).await.unwrap();
    assert_eq!(options.source_path, "/notes");
    let Op::File(op) = &state.output().unwrap().node.op else {
        panic!("expected a file op");
    };
    let dalec_graph::FileAction::Mkfile(mkfile) = &op.actions[0] else {
        panic!("expected a mkfile action");
    };
    assert_eq!(mkfile.path, "/notes");
    assert_eq!(mkfile.mode, 0o644);
}

#[rstest]
#[tokio::test]
async fn test_inline_dir_creates_each_file() {
    let (opts, ..) = opts();
    let src = source("inline:\n  dir:\n    files:\n      a.txt: {contents: a}\n      b.txt: {contents: b}\n");
    let state = to_state("d", &src, "", &opts, None).await.unwrap();
    // last node writes b.txt on top of the mkdir + a.txt chain
    let Op::File(op) = &state.output().unwrap().node.op else {
        panic!("expected a file op");
    };
    let dalec_graph::FileAction::Mkfile(mkfile) = &op.actions[0] else {
        panic!("expected a mkfile action");
    };
    assert_eq!(mkfile.path, "/b.txt");
}

#[rstest]
#[tokio::test]
async fn test_context_filters_forwarded_to_client_fetch() {
    let (opts, contexts, _) = opts();
    let src = source("context: {}\nincludes: ['*.c']\nexcludes: ['*.o']\n");
    to_state("ctx", &src, "", &opts, None).await.unwrap();
    let (name, options) = contexts.seen.lock().unwrap().clone().unwrap();
    assert_eq!(name, "context");
    assert_eq!(options.include_patterns, vec!["*.c"]);
    assert_eq!(options.exclude_patterns, vec!["*.o"]);
}

#[rstest]
#[tokio::test]
async fn test_context_subpath_restricts_transfer() {
    let (opts, contexts, _) = opts();
    let src = source("context: {}\npath: sub/dir\nincludes: ['*.c']\n");
    to_state("ctx", &src, "", &opts, None).await.unwrap();
    let (_, options) = contexts.seen.lock().unwrap().clone().unwrap();
    assert_eq!(options.follow_paths, vec!["sub/dir"]);
    assert!(options.exclude_patterns.contains(&"*".to_string()));
    assert!(options.exclude_patterns.contains(&"!sub/dir".to_string()));
    // user patterns are rebased onto the subpath
    assert_eq!(options.include_patterns, vec!["sub/dir/*.c"]);
}

#[rstest]
#[tokio::test]
async fn test_missing_context_is_an_error() {
    let (opts, ..) = opts();
    let src = source("context: {name: missing}");
    let err = to_state("ctx", &src, "", &opts, None).await.unwrap_err();
    assert!(matches!(err, Error::MissingContext(name) if name == "missing"));
}

#[rstest]
#[tokio::test]
async fn test_build_source_forwards_config() {
    let (opts, _, forwarder) = opts();
    let src = source(
        "build:\n  source:\n    context: {}\n  target: final\n  args: {X: '1'}\n",
    );
    to_state("b", &src, "", &opts, None).await.unwrap();
    let config = forwarder.seen.lock().unwrap().clone().unwrap();
    assert_eq!(config.dockerfile_path, "Dockerfile");
    assert_eq!(config.target, "final");
    assert_eq!(config.args.get("X").unwrap(), "1");
}

#[rstest]
#[tokio::test]
async fn test_build_inline_dockerfile_renamed() {
    let (opts, ..) = opts();
    let src = source(
        "build:\n  source:\n    inline:\n      file: {contents: 'FROM scratch'}\n",
    );
    let state = to_state("b", &src, "", &opts, None).await.unwrap();
    // the echo forwarder returns the inner state: the inline file
    // must have been written as /Dockerfile
    let Op::File(op) = &state.output().unwrap().node.op else {
        panic!("expected a file op");
    };
    let dalec_graph::FileAction::Mkfile(mkfile) = &op.actions[0] else {
        panic!("expected a mkfile action");
    };
    assert_eq!(mkfile.path, "/Dockerfile");
}

struct FixedResolver;

#[async_trait]
impl dalec_graph::ImageMetaResolver for FixedResolver {
    async fn resolve(
        &self,
        _reference: &str,
        _platform: Option<&dalec_graph::Platform>,
    ) -> dalec_graph::Result<(String, Vec<u8>)> {
        Ok(("sha256:0011".to_string(), Vec::new()))
    }
}

#[rstest]
#[tokio::test]
async fn test_image_reference_pinned_by_resolver() {
    let opts = SourceOpts {
        image_resolver: Some(Arc::new(FixedResolver)),
        ..Default::default()
    };
    let src = source("image: {ref: 'docker.io/library/busybox:latest'}");
    let state = to_state("base", &src, "", &opts, None).await.unwrap();
    let Op::Source(op) = &state.output().unwrap().node.op else {
        panic!("expected a source op");
    };
    assert_eq!(
        op.identifier,
        "docker-image://docker.io/library/busybox:latest@sha256:0011"
    );
}

#[rstest]
#[tokio::test]
async fn test_compile_sources_compiles_every_entry() {
    let (opts, ..) = opts();
    let spec = dalec_schema::Spec::from_yaml(
        r#"name: demo
sources:
  b:
    git: {url: x, commit: y}
  a:
    git: {url: z, commit: w}
"#,
    )
    .unwrap();
    let states = compile_sources(&spec, &opts, None).await.unwrap();
    let names: Vec<_> = states.keys().cloned().collect();
    assert_eq!(names, vec!["a", "b"]);
}
