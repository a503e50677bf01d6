// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

//! The declarative build specification: parsing, validation,
//! argument substitution and target resolution.

pub mod args;
mod artifacts;
mod build_spec;
mod changelog;
mod dependencies;
mod error;
mod extensions;
pub mod fixtures;
mod image_spec;
mod patch;
mod resolve;
mod scalar;
mod source;
mod source_map;
mod spec;
mod target_spec;
mod test_spec;
mod unknown_key;
pub mod validation;

pub use args::{
    allow_any,
    expand,
    is_builtin,
    SubstitutionCause,
    SubstitutionError,
    SubstitutionErrors,
    BUILTIN_ARGS,
    PLATFORM_ARGS,
};
pub use artifacts::{
    AccountConfig,
    ArtifactConfig,
    ArtifactDirectories,
    ArtifactSymlinkConfig,
    Artifacts,
    DirConfig,
    SystemdConfiguration,
    SystemdUnitConfig,
};
pub use build_spec::{ArtifactBuild, CacheDirConfig, CacheSharingMode, NetworkMode};
pub use changelog::{ChangelogEntry, Date};
pub use dependencies::{
    DependencyList,
    PackageConstraints,
    PackageDependencies,
    PackageRepositoryConfig,
    RepoEnv,
};
pub use error::{decode_yaml, Error, Result};
pub use extensions::Extensions;
pub use image_spec::{BaseImage, ImageConfig, PostInstall, Volume};
pub use patch::{PatchSpec, DEFAULT_PATCH_STRIP};
pub use resolve::ResolvedSpec;
pub use scalar::ScalarString;
pub use source::{
    BuildSource,
    BuildStep,
    CargohomeGenerator,
    Command,
    ContextSource,
    Digest,
    GeneratorKind,
    GitAuth,
    GitSource,
    GomodAuth,
    GomodGenerator,
    GomodSsh,
    HttpSource,
    ImageSource,
    InlineDir,
    InlineFile,
    InlineSource,
    NodeModGenerator,
    PipGenerator,
    Source,
    SourceGenerator,
    SourceKind,
    SourceMount,
    DEFAULT_CONTEXT_NAME,
};
pub use source_map::{SourceMap, Span};
pub use spec::Spec;
pub use target_spec::{PackageConfig, PackageSigner, Target};
pub use test_spec::{
    CheckKind,
    CheckOutput,
    CheckOutputError,
    FileCheckOutput,
    TestSpec,
    TestStep,
};
pub use validation::{ValidationError, ValidationErrorKind, ValidationErrors};

pub(crate) fn is_zero(v: &u32) -> bool {
    *v == 0
}

pub(crate) fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}
