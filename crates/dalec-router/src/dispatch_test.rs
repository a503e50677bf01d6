// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dalec_graph::{Platform, SourceOpts};
use dalec_schema::Spec;
use rstest::rstest;

use super::{Frontend, Subrequest};
use crate::router::{BuildProduct, BuildRequest, Handler, Router};
use crate::Error;

#[derive(Default)]
struct RecordingHandler {
    requests: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn build(&self, request: BuildRequest<'_>) -> crate::Result<BuildProduct> {
        self.requests.lock().unwrap().push((
            request.target_key.to_string(),
            request.subtarget.to_string(),
            request.platform.to_string(),
        ));
        Ok(BuildProduct {
            reference: format!("ref-{}", request.platform),
            image_config: Some(request.resolved.image().clone()),
        })
    }
}

fn frontend() -> (Frontend, Arc<RecordingHandler>) {
    let handler = Arc::new(RecordingHandler::default());
    let router = Router::builder()
        .register("mariner2", handler.clone())
        .register("jammy", handler.clone())
        .build();
    (Frontend::new(router), handler)
}

fn spec(yaml: &str) -> Arc<Spec> {
    let mut spec = Spec::from_yaml(yaml).unwrap();
    spec.fill_defaults();
    Arc::new(spec)
}

#[rstest]
#[tokio::test]
async fn test_build_routes_and_resolves() {
    let (frontend, handler) = frontend();
    let spec = spec(
        r#"name: demo
image:
  env: ["A=1"]
targets:
  mariner2:
    image:
      env: ["A=2"]
"#,
    );
    let products = frontend
        .build(
            &spec,
            "mariner2/container",
            &[Platform::new("linux", "amd64")],
            &SourceOpts::default(),
            &BTreeMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    // the handler saw the resolved view, not the root config
    assert_eq!(products[0].image_config.as_ref().unwrap().env, vec!["A=2"]);
    let seen = handler.requests.lock().unwrap();
    assert_eq!(
        seen[0],
        (
            "mariner2/container".to_string(),
            "container".to_string(),
            "linux/amd64".to_string()
        )
    );
}

#[rstest]
#[tokio::test]
async fn test_platform_fan_out() {
    let (frontend, handler) = frontend();
    let spec = spec("name: demo\n");
    let platforms = [
        Platform::new("linux", "amd64"),
        Platform::new("linux", "arm64"),
    ];
    let products = frontend
        .build(
            &spec,
            "jammy/deb",
            &platforms,
            &SourceOpts::default(),
            &BTreeMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].reference, "ref-linux/amd64");
    assert_eq!(products[1].reference, "ref-linux/arm64");
    assert_eq!(handler.requests.lock().unwrap().len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_empty_platform_list_uses_host() {
    let (frontend, handler) = frontend();
    let spec = spec("name: demo\n");
    frontend
        .build(
            &spec,
            "jammy/deb",
            &[],
            &SourceOpts::default(),
            &BTreeMap::new(),
        )
        .await
        .unwrap();
    let seen = handler.requests.lock().unwrap();
    assert_eq!(seen[0].2, Platform::host().to_string());
}

#[rstest]
#[tokio::test]
async fn test_multiple_bases_rejected() {
    let (frontend, _) = frontend();
    let spec = spec(
        r#"name: demo
image:
  bases:
    - rootfs:
        image: {ref: a}
    - rootfs:
        image: {ref: b}
"#,
    );
    let err = frontend
        .build(
            &spec,
            "jammy/deb",
            &[],
            &SourceOpts::default(),
            &BTreeMap::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MultipleBaseImages(2)));
}

#[rstest]
fn test_list_targets_subrequest() {
    let (frontend, _) = frontend();
    let spec = spec("name: demo\n");
    let listing = frontend
        .subrequest(&spec, Subrequest::ListTargets)
        .unwrap();
    assert_eq!(listing, "jammy\nmariner2\n");
}

#[rstest]
fn test_resolve_spec_subrequest() {
    let (frontend, _) = frontend();
    let spec = spec(
        r#"name: demo
dependencies:
  runtime: [libfoo]
targets:
  jammy:
    dependencies:
      runtime: [libbar]
"#,
    );
    let yaml = frontend
        .subrequest(
            &spec,
            Subrequest::ResolveSpec {
                target_key: "jammy/deb".to_string(),
            },
        )
        .unwrap();
    assert!(yaml.contains("libbar"), "{yaml}");
    assert!(!yaml.contains("targets"), "{yaml}");
    // the output is itself a valid spec
    Spec::from_yaml(yaml).unwrap();
}

#[rstest]
fn test_default_platform_subrequest() {
    let (frontend, _) = frontend();
    let spec = spec("name: demo\n");
    let platform = frontend
        .subrequest(&spec, Subrequest::DefaultPlatform)
        .unwrap();
    assert_eq!(platform, Platform::host().to_string());
}
