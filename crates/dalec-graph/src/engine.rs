// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::platform::Platform;
use crate::state::{ExecCommand, LocalOptions, State};
use crate::Result;

/// Resolves an image reference to its canonical digest and raw
/// image config.
#[async_trait]
pub trait ImageMetaResolver: Send + Sync {
    async fn resolve(
        &self,
        reference: &str,
        platform: Option<&Platform>,
    ) -> Result<(String, Vec<u8>)>;
}

/// Produces states for named, client-supplied build contexts.
#[async_trait]
pub trait ContextFetcher: Send + Sync {
    /// The named context, or `None` when the client did not supply
    /// one under that name.
    async fn get(&self, name: &str, options: &LocalOptions) -> Result<Option<State>>;
}

/// Configuration for a forwarded dockerfile build.
#[derive(Clone, Debug, Default)]
pub struct BuildConfig {
    pub dockerfile_path: String,
    pub target: String,
    pub args: BTreeMap<String, String>,
    pub platform: Option<Platform>,
}

/// Forwards an inner source to the engine's dockerfile frontend.
#[async_trait]
pub trait DockerfileForwarder: Send + Sync {
    async fn forward(&self, inner: State, config: BuildConfig) -> Result<State>;
}

/// Decorates an exec with git credential plumbing.
pub trait GitCredHelper: Send + Sync {
    fn apply(&self, command: ExecCommand) -> ExecCommand;
}

/// The engine-facing capabilities available while compiling
/// sources, plus the platform being built for.
///
/// Everything is optional; compilation fails with a
/// missing-capability error only when a spec actually needs one.
#[derive(Clone, Default)]
pub struct SourceOpts {
    pub image_resolver: Option<Arc<dyn ImageMetaResolver>>,
    pub context_fetcher: Option<Arc<dyn ContextFetcher>>,
    pub dockerfile_forwarder: Option<Arc<dyn DockerfileForwarder>>,
    pub git_cred_helper: Option<Arc<dyn GitCredHelper>>,
    pub target_platform: Option<Platform>,
}

impl std::fmt::Debug for SourceOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceOpts")
            .field("image_resolver", &self.image_resolver.is_some())
            .field("context_fetcher", &self.context_fetcher.is_some())
            .field("dockerfile_forwarder", &self.dockerfile_forwarder.is_some())
            .field("git_cred_helper", &self.git_cred_helper.is_some())
            .field("target_platform", &self.target_platform)
            .finish()
    }
}
