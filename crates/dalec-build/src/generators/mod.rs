// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

mod cargohome;
mod gomod;
mod nodemod;
mod pip;

pub use cargohome::generate as generate_cargohome;
pub use gomod::{
    edit_commands as gomod_edit_commands,
    generate as generate_gomod,
    record_patches as record_gomod_patches,
    GOMOD_PATCHES_EXT,
};
pub use nodemod::generate as generate_node_mods;
pub use pip::generate as generate_pip;

use dalec_schema::{GeneratorKind, Source, SourceGenerator, Spec};

/// The sources of a spec carrying a generator of the given kind,
/// in sorted name order.
fn sources_with<'a>(
    spec: &'a Spec,
    kind: GeneratorKind,
) -> impl Iterator<Item = (&'a String, &'a Source, Vec<&'a SourceGenerator>)> {
    spec.sources.iter().filter_map(move |(name, source)| {
        let generators: Vec<_> = source
            .generate
            .iter()
            .filter(|g| g.kind() == kind)
            .collect();
        (!generators.is_empty()).then_some((name, source, generators))
    })
}

/// Join a workspace-relative directory out of optional segments.
fn work_dir(base: &str, subpath: &str, path: &str) -> String {
    let mut dir = base.trim_end_matches('/').to_string();
    for segment in [subpath, path] {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() && segment != "." {
            dir.push('/');
            dir.push_str(segment);
        }
    }
    dir
}
