// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use dalec_graph::{Platform, SourceOpts};
use dalec_schema::Spec;

use crate::router::{BuildProduct, BuildRequest, Router};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./dispatch_test.rs"]
mod dispatch_test;

/// Introspection requests served by the dispatcher itself,
/// without invoking a distro handler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Subrequest {
    /// List the registered target prefixes.
    ListTargets,
    /// Return the effective spec for a target as yaml.
    ResolveSpec { target_key: String },
    /// Return the platform builds default to.
    DefaultPlatform,
}

/// The build entrypoint: routes targets to registered handlers
/// and fans builds out across platforms.
pub struct Frontend {
    router: Router,
}

impl Frontend {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serve an introspection subrequest.
    pub fn subrequest(&self, spec: &Arc<Spec>, subrequest: Subrequest) -> Result<String> {
        match subrequest {
            Subrequest::ListTargets => Ok(self
                .router
                .targets()
                .into_iter()
                .map(|t| format!("{t}\n"))
                .collect()),
            Subrequest::ResolveSpec { target_key } => {
                let resolved = spec.resolve(&target_key);
                Ok(resolved.effective_spec().to_yaml()?)
            }
            Subrequest::DefaultPlatform => Ok(Platform::host().to_string()),
        }
    }

    /// Build a target for every requested platform, collecting one
    /// product per platform. An empty platform list builds for the
    /// host platform.
    pub async fn build(
        &self,
        spec: &Arc<Spec>,
        target_key: &str,
        platforms: &[Platform],
        source_opts: &SourceOpts,
        build_args: &BTreeMap<String, String>,
    ) -> Result<Vec<BuildProduct>> {
        let route = self.router.route(target_key)?;
        let resolved = spec.resolve(target_key);
        if let Some(bases) = resolved.image().bases.as_ref() {
            if bases.len() > 1 {
                return Err(Error::MultipleBaseImages(bases.len()));
            }
        }

        let host = [Platform::host()];
        let platforms = if platforms.is_empty() {
            &host[..]
        } else {
            platforms
        };

        let mut products = Vec::with_capacity(platforms.len());
        for platform in platforms {
            tracing::debug!(target_key, %platform, "dispatching build");
            let mut opts = source_opts.clone();
            opts.target_platform = Some(platform.clone());
            let request = BuildRequest {
                spec,
                resolved: spec.resolve(target_key),
                target_key,
                subtarget: route.subtarget,
                platform: platform.clone(),
                source_opts: &opts,
                build_args,
            };
            products.push(route.handler.build(request).await?);
        }
        Ok(products)
    }
}
