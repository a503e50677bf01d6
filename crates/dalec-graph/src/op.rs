// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use dalec_schema::Span;
use serde::Serialize;

/// One node of the emitted build graph.
///
/// Nodes are immutable and shared; composing states never mutates
/// an existing node. The engine evaluates nodes in dependency
/// order, concurrently where no data dependence connects them.
#[derive(Debug)]
pub struct Node {
    pub op: Op,
    /// Edges to nodes whose outputs this op consumes, in op-defined
    /// positional order.
    pub inputs: Vec<Edge>,
    pub metadata: OpMetadata,
}

/// A reference to one output of a node.
#[derive(Clone, Debug)]
pub struct Edge {
    pub node: Arc<Node>,
    pub output: u32,
}

/// Out-of-band node information carried to the engine: progress
/// descriptions and the spec location that produced the node, so
/// failures surface at the right line of the document.
#[derive(Clone, Debug, Default)]
pub struct OpMetadata {
    pub description: BTreeMap<String, String>,
    pub span: Option<Span>,
}

impl OpMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        let mut description = BTreeMap::new();
        description.insert("llb.customname".to_string(), name.into());
        Self {
            description,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Source(SourceOp),
    Exec(ExecOp),
    File(FileOp),
    Merge(MergeOp),
    Diff(DiffOp),
    Build(BuildOp),
}

/// An external input: an image, git repository, http url or local
/// context, identified by scheme.
#[derive(Debug, Default, Serialize)]
pub struct SourceOp {
    pub identifier: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ExecOp {
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cwd: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    pub network: ExecNetwork,
    /// Mount 0 is the root filesystem.
    pub mounts: Vec<MountSpec>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecNetwork {
    #[default]
    None,
    Sandbox,
}

#[derive(Clone, Debug, Serialize)]
pub struct MountSpec {
    pub dest: String,
    /// Index into the node's inputs backing this mount, when the
    /// mount has filesystem input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<usize>,
    /// Subpath of the input to mount.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub selector: String,
    pub readonly: bool,
    #[serde(rename = "type")]
    pub mount_type: MountType,
    /// Set when the post-exec content of this mount is an output
    /// of the node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cache_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_sharing: Option<CacheSharing>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ssh_id: String,
}

impl MountSpec {
    pub fn bind(dest: impl Into<String>) -> Self {
        Self {
            dest: dest.into(),
            input: None,
            selector: String::new(),
            readonly: false,
            mount_type: MountType::Bind,
            output: None,
            cache_id: String::new(),
            cache_sharing: None,
            secret_id: String::new(),
            ssh_id: String::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Bind,
    Cache,
    Tmpfs,
    Secret,
    Ssh,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSharing {
    Shared,
    Private,
    Locked,
}

#[derive(Debug, Default, Serialize)]
pub struct FileOp {
    /// Index of the input holding the base tree the actions apply
    /// to; the empty tree when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<usize>,
    pub actions: Vec<FileAction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Copy(CopyAction),
    Mkfile(MkfileAction),
    Mkdir(MkdirAction),
    Rm(RmAction),
    Symlink(SymlinkAction),
}

#[derive(Debug, Default, Serialize)]
pub struct CopyAction {
    /// Index into the node's inputs naming the copy source.
    pub input: usize,
    pub src: String,
    pub dest: String,
    /// Copy the contents of a source directory rather than the
    /// directory itself.
    pub dir_contents: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_patterns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_patterns: Vec<String>,
    pub create_dest_path: bool,
    pub follow_symlinks: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct MkfileAction {
    pub path: String,
    pub mode: u32,
    pub data: String,
    pub uid: i64,
    pub gid: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct MkdirAction {
    pub path: String,
    pub mode: u32,
    pub make_parents: bool,
    pub uid: i64,
    pub gid: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct RmAction {
    pub path: String,
    pub allow_not_found: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct SymlinkAction {
    pub oldpath: String,
    pub newpath: String,
    pub uid: i64,
    pub gid: i64,
}

/// A sub-build forwarded to another frontend, eg a dockerfile
/// build or a signing frontend applied to input 0.
#[derive(Debug, Default, Serialize)]
pub struct BuildOp {
    /// Image reference of the frontend; the engine default when
    /// empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub frontend: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dockerfile_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

/// Merge the inputs left to right.
#[derive(Debug, Default, Serialize)]
pub struct MergeOp {}

/// The difference between input 0 (lower) and input 1 (upper).
#[derive(Debug, Default, Serialize)]
pub struct DiffOp {}
