// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dalec_graph::{Platform, SourceOpts};
use dalec_schema::{ImageConfig, ResolvedSpec, Spec};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./router_test.rs"]
mod router_test;

/// One build invocation handed to a distro handler.
pub struct BuildRequest<'a> {
    pub spec: &'a Arc<Spec>,
    /// The spec view with this target's overrides merged in.
    pub resolved: ResolvedSpec,
    /// The full requested target key.
    pub target_key: &'a str,
    /// What remains of the target key after the matched route
    /// prefix, eg `container` for `mariner2/container`.
    pub subtarget: &'a str,
    pub platform: Platform,
    pub source_opts: &'a SourceOpts,
    pub build_args: &'a BTreeMap<String, String>,
}

/// What a distro handler produced for one platform.
#[derive(Clone, Debug, Default)]
pub struct BuildProduct {
    /// Content-addressed reference of the built image or artifact.
    pub reference: String,
    pub image_config: Option<ImageConfig>,
}

/// A distro backend: turns a resolved spec into packages or
/// images for the targets registered under its prefix.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn build(&self, request: BuildRequest<'_>) -> Result<BuildProduct>;
}

/// Write-once registry from target prefixes to handlers.
#[derive(Default)]
pub struct RouterBuilder {
    routes: BTreeMap<String, Arc<dyn Handler>>,
    default_prefix: Option<String>,
}

impl RouterBuilder {
    pub fn register(mut self, prefix: &str, handler: Arc<dyn Handler>) -> Self {
        self.routes.insert(prefix.to_string(), handler);
        self
    }

    /// The route used when a requested target matches nothing.
    pub fn default_prefix(mut self, prefix: &str) -> Self {
        self.default_prefix = Some(prefix.to_string());
        self
    }

    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
            default_prefix: self.default_prefix,
        }
    }
}

/// Immutable at request time; constructed once at startup.
pub struct Router {
    routes: BTreeMap<String, Arc<dyn Handler>>,
    default_prefix: Option<String>,
}

pub(crate) struct Route<'a> {
    pub handler: &'a Arc<dyn Handler>,
    /// The target suffix after the matched prefix.
    pub subtarget: &'a str,
}

impl std::fmt::Debug for Route<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("subtarget", &self.subtarget)
            .finish()
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// The registered target prefixes, sorted.
    pub fn targets(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    /// Route a target key: exact match wins, then the longest
    /// matching prefix, then the default route.
    pub(crate) fn route<'a>(&'a self, target_key: &'a str) -> Result<Route<'a>> {
        if let Some(handler) = self.routes.get(target_key) {
            return Ok(Route {
                handler,
                subtarget: "",
            });
        }
        let mut best: Option<(&str, &Arc<dyn Handler>)> = None;
        for (prefix, handler) in self.routes.iter() {
            let Some(rest) = target_key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if !rest.starts_with('/') {
                continue;
            }
            if best.is_none_or(|(b, _)| prefix.len() > b.len()) {
                best = Some((prefix, handler));
            }
        }
        if let Some((prefix, handler)) = best {
            return Ok(Route {
                handler,
                subtarget: &target_key[prefix.len() + 1..],
            });
        }
        if let Some(default) = self.default_prefix.as_ref() {
            if let Some(handler) = self.routes.get(default) {
                return Ok(Route {
                    handler,
                    subtarget: target_key,
                });
            }
        }
        Err(Error::UnknownTarget {
            requested: target_key.to_string(),
            known: self.routes.keys().cloned().collect(),
        })
    }
}
