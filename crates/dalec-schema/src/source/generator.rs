// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::args::Substituter;

fn default_paths() -> Vec<String> {
    vec![".".to_string()]
}

fn is_default_paths(paths: &Vec<String>) -> bool {
    paths.len() == 1 && paths[0] == "."
}

/// The language ecosystems a generator can vendor dependencies for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum GeneratorKind {
    Gomod,
    Cargohome,
    Pip,
    NodeMod,
}

/// An auxiliary producer of vendored dependency caches for a source.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceGenerator {
    Gomod(GomodGenerator),
    Cargohome(CargohomeGenerator),
    Pip(PipGenerator),
    #[serde(rename = "nodemod")]
    NodeMod(NodeModGenerator),
}

impl SourceGenerator {
    pub fn kind(&self) -> GeneratorKind {
        match self {
            SourceGenerator::Gomod(_) => GeneratorKind::Gomod,
            SourceGenerator::Cargohome(_) => GeneratorKind::Cargohome,
            SourceGenerator::Pip(_) => GeneratorKind::Pip,
            SourceGenerator::NodeMod(_) => GeneratorKind::NodeMod,
        }
    }

    /// Directory under the source root the generator operates in.
    pub fn subpath(&self) -> &str {
        match self {
            SourceGenerator::Gomod(g) => &g.subpath,
            SourceGenerator::Cargohome(g) => &g.subpath,
            SourceGenerator::Pip(g) => &g.subpath,
            SourceGenerator::NodeMod(g) => &g.subpath,
        }
    }

    pub fn paths(&self) -> &[String] {
        match self {
            SourceGenerator::Gomod(g) => &g.paths,
            SourceGenerator::Cargohome(g) => &g.paths,
            SourceGenerator::Pip(g) => &g.paths,
            SourceGenerator::NodeMod(g) => &g.paths,
        }
    }

    pub(crate) fn process_build_args(&mut self, sub: &mut Substituter<'_>, path: &str) {
        match self {
            SourceGenerator::Gomod(g) => {
                sub.env_map(&mut g.replace, &format!("{path}.gomod.replace"));
                sub.env_map(&mut g.require, &format!("{path}.gomod.require"));
            }
            SourceGenerator::Pip(g) => {
                sub.field(&mut g.index_url, &format!("{path}.pip.index_url"));
                sub.list(&mut g.extra_index_urls, &format!("{path}.pip.extra_index_urls"));
            }
            SourceGenerator::Cargohome(_) | SourceGenerator::NodeMod(_) => (),
        }
    }
}

/// Vendors a go module cache via the go toolchain.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GomodGenerator {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpath: String,
    #[serde(default = "default_paths", skip_serializing_if = "is_default_paths")]
    pub paths: Vec<String>,
    /// Per-host authentication; hosts absent here inherit the
    /// enclosing git source's auth configuration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub auth: BTreeMap<String, GomodAuth>,
    /// `go mod edit -replace` directives applied before download.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replace: BTreeMap<String, String>,
    /// `go mod edit -require` directives applied before download.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub require: BTreeMap<String, String>,
}

impl Default for GomodGenerator {
    fn default() -> Self {
        Self {
            subpath: String::new(),
            paths: default_paths(),
            auth: BTreeMap::new(),
            replace: BTreeMap::new(),
            require: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GomodAuth {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<GomodSsh>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GomodSsh {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
}

/// Vendors a cargo registry cache from Cargo.toml/Cargo.lock.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CargohomeGenerator {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpath: String,
    #[serde(default = "default_paths", skip_serializing_if = "is_default_paths")]
    pub paths: Vec<String>,
}

impl Default for CargohomeGenerator {
    fn default() -> Self {
        Self {
            subpath: String::new(),
            paths: default_paths(),
        }
    }
}

/// Downloads python requirements into a local package directory.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipGenerator {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpath: String,
    #[serde(default = "default_paths", skip_serializing_if = "is_default_paths")]
    pub paths: Vec<String>,
    #[serde(
        default = "PipGenerator::default_requirements_file",
        skip_serializing_if = "PipGenerator::is_default_requirements_file"
    )]
    pub requirements_file: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_index_urls: Vec<String>,
}

impl Default for PipGenerator {
    fn default() -> Self {
        Self {
            subpath: String::new(),
            paths: default_paths(),
            requirements_file: Self::default_requirements_file(),
            index_url: String::new(),
            extra_index_urls: Vec::new(),
        }
    }
}

impl PipGenerator {
    fn default_requirements_file() -> String {
        "requirements.txt".to_string()
    }

    fn is_default_requirements_file(file: &String) -> bool {
        file == "requirements.txt"
    }
}

/// Produces an offline mirror of node package downloads.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NodeModGenerator {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpath: String,
    #[serde(default = "default_paths", skip_serializing_if = "is_default_paths")]
    pub paths: Vec<String>,
}

impl Default for NodeModGenerator {
    fn default() -> Self {
        Self {
            subpath: String::new(),
            paths: default_paths(),
        }
    }
}
