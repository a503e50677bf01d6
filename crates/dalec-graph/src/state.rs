// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::op::{
    BuildOp,
    CacheSharing,
    CopyAction,
    DiffOp,
    Edge,
    ExecNetwork,
    ExecOp,
    FileAction,
    FileOp,
    MergeOp,
    MkdirAction,
    MkfileAction,
    MountSpec,
    MountType,
    Node,
    Op,
    OpMetadata,
    RmAction,
    SourceOp,
    SymlinkAction,
};

#[cfg(test)]
#[path = "./state_test.rs"]
mod state_test;

/// An immutable, lazily evaluated reference to a filesystem tree
/// in the build graph.
///
/// States are cheap handles over shared nodes; every combinator
/// returns a new state and leaves its operands untouched. Nothing
/// executes until the engine evaluates a marshalled definition.
#[derive(Clone, Debug, Default)]
pub struct State {
    edge: Option<Edge>,
}

/// Options for a git source node.
#[derive(Clone, Debug, Default)]
pub struct GitOptions {
    pub keep_git_dir: bool,
    pub auth_header_secret: String,
    pub auth_token_secret: String,
    pub ssh_socket: String,
}

/// Options for an http source node.
#[derive(Clone, Debug, Default)]
pub struct HttpOptions {
    pub digest: String,
    pub permissions: u32,
    pub filename: String,
}

/// Client-side filters applied when fetching a local context.
#[derive(Clone, Debug, Default)]
pub struct LocalOptions {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub follow_paths: Vec<String>,
}

/// Options for a copy between states.
#[derive(Clone, Debug, Default)]
pub struct CopyOptions {
    pub dir_contents: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub follow_symlinks: bool,
}

impl State {
    /// The empty filesystem.
    pub fn scratch() -> Self {
        Self { edge: None }
    }

    pub fn image(reference: &str, meta: OpMetadata) -> Self {
        Self::source(
            format!("docker-image://{reference}"),
            BTreeMap::new(),
            meta,
        )
    }

    pub fn git(url: &str, commit: &str, options: GitOptions, meta: OpMetadata) -> Self {
        let mut attrs = BTreeMap::new();
        if options.keep_git_dir {
            attrs.insert("git.keepgitdir".to_string(), "true".to_string());
        }
        if !options.auth_header_secret.is_empty() {
            attrs.insert(
                "git.authheadersecret".to_string(),
                options.auth_header_secret,
            );
        }
        if !options.auth_token_secret.is_empty() {
            attrs.insert("git.authtokensecret".to_string(), options.auth_token_secret);
        }
        if !options.ssh_socket.is_empty() {
            attrs.insert("git.mountsshsock".to_string(), options.ssh_socket);
        }
        let separator = if url.contains('#') { "" } else { "#" };
        Self::source(format!("git://{url}{separator}{commit}"), attrs, meta)
    }

    pub fn http(url: &str, options: HttpOptions, meta: OpMetadata) -> Self {
        let mut attrs = BTreeMap::new();
        if !options.digest.is_empty() {
            attrs.insert("http.checksum".to_string(), options.digest);
        }
        if options.permissions != 0 {
            attrs.insert(
                "http.perm".to_string(),
                format!("0{:o}", options.permissions),
            );
        }
        if !options.filename.is_empty() {
            attrs.insert("http.filename".to_string(), options.filename);
        }
        Self::source(url.to_string(), attrs, meta)
    }

    /// A locally supplied directory, transferred by the client.
    pub fn local(name: &str, options: LocalOptions, meta: OpMetadata) -> Self {
        let mut attrs = BTreeMap::new();
        if !options.include_patterns.is_empty() {
            attrs.insert(
                "local.includepatterns".to_string(),
                serde_json::to_string(&options.include_patterns).unwrap_or_default(),
            );
        }
        if !options.exclude_patterns.is_empty() {
            attrs.insert(
                "local.excludepatterns".to_string(),
                serde_json::to_string(&options.exclude_patterns).unwrap_or_default(),
            );
        }
        if !options.follow_paths.is_empty() {
            attrs.insert(
                "local.followpaths".to_string(),
                serde_json::to_string(&options.follow_paths).unwrap_or_default(),
            );
        }
        Self::source(format!("local://{name}"), attrs, meta)
    }

    fn source(identifier: String, attrs: BTreeMap<String, String>, meta: OpMetadata) -> Self {
        Self::from_node(Node {
            op: Op::Source(SourceOp { identifier, attrs }),
            inputs: Vec::new(),
            metadata: meta,
        })
    }

    fn from_node(node: Node) -> Self {
        Self {
            edge: Some(Edge {
                node: Arc::new(node),
                output: 0,
            }),
        }
    }

    /// The edge backing this state, absent for scratch.
    pub fn output(&self) -> Option<&Edge> {
        self.edge.as_ref()
    }

    pub fn is_scratch(&self) -> bool {
        self.edge.is_none()
    }

    /// Execute a command with this state as the root filesystem.
    pub fn run(&self, command: ExecCommand) -> Exec {
        let mut inputs = Vec::new();
        let mut mounts = Vec::new();
        let mut outputs = BTreeMap::new();
        let mut next_output = 0u32;

        let mut root = MountSpec::bind("/");
        if let Some(edge) = self.edge.as_ref() {
            root.input = Some(inputs.len());
            inputs.push(edge.clone());
        }
        root.output = Some(next_output);
        outputs.insert("/".to_string(), next_output);
        next_output += 1;
        mounts.push(root);

        for mount in command.mounts {
            let mut spec = MountSpec::bind(mount.dest.clone());
            spec.readonly = mount.readonly;
            spec.selector = mount.selector;
            match mount.source {
                MountSource::State(state) => {
                    if let Some(edge) = state.edge.as_ref() {
                        spec.input = Some(inputs.len());
                        inputs.push(edge.clone());
                    }
                    if mount.output {
                        spec.output = Some(next_output);
                        outputs.insert(mount.dest, next_output);
                        next_output += 1;
                    }
                }
                MountSource::Cache { id, sharing } => {
                    spec.mount_type = MountType::Cache;
                    spec.cache_id = id;
                    spec.cache_sharing = Some(sharing);
                }
                MountSource::Tmpfs => spec.mount_type = MountType::Tmpfs,
                MountSource::Secret { id } => {
                    spec.mount_type = MountType::Secret;
                    spec.secret_id = id;
                    spec.readonly = true;
                }
                MountSource::Ssh { id } => {
                    spec.mount_type = MountType::Ssh;
                    spec.ssh_id = id;
                    spec.readonly = true;
                }
            }
            mounts.push(spec);
        }

        let node = Node {
            op: Op::Exec(ExecOp {
                args: command.args,
                env: command
                    .env
                    .into_iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect(),
                cwd: command.cwd,
                user: command.user,
                network: command.network,
                mounts,
            }),
            inputs,
            metadata: command.metadata,
        };
        Exec {
            node: Arc::new(node),
            outputs,
        }
    }

    /// Copy a subtree of another state into this one.
    pub fn copy_from(
        &self,
        src: &State,
        src_path: &str,
        dest_path: &str,
        options: CopyOptions,
        meta: OpMetadata,
    ) -> State {
        let mut inputs = Vec::new();
        let base = self.edge.as_ref().map(|edge| {
            inputs.push(edge.clone());
            0
        });
        let input = src
            .edge
            .as_ref()
            .map(|edge| {
                inputs.push(edge.clone());
                inputs.len() - 1
            })
            .unwrap_or_default();
        let action = FileAction::Copy(CopyAction {
            input,
            src: src_path.to_string(),
            dest: dest_path.to_string(),
            dir_contents: options.dir_contents,
            include_patterns: options.include_patterns,
            exclude_patterns: options.exclude_patterns,
            create_dest_path: true,
            follow_symlinks: options.follow_symlinks,
        });
        Self::from_node(Node {
            op: Op::File(FileOp {
                base,
                actions: vec![action],
            }),
            inputs,
            metadata: meta,
        })
    }

    pub fn mkfile(
        &self,
        path: &str,
        mode: u32,
        data: impl Into<String>,
        uid: i64,
        gid: i64,
        meta: OpMetadata,
    ) -> State {
        self.file_action(
            FileAction::Mkfile(MkfileAction {
                path: path.to_string(),
                mode,
                data: data.into(),
                uid,
                gid,
            }),
            meta,
        )
    }

    pub fn mkdir(&self, path: &str, mode: u32, uid: i64, gid: i64, meta: OpMetadata) -> State {
        self.file_action(
            FileAction::Mkdir(MkdirAction {
                path: path.to_string(),
                mode,
                make_parents: true,
                uid,
                gid,
            }),
            meta,
        )
    }

    pub fn rm(&self, path: &str, meta: OpMetadata) -> State {
        self.file_action(
            FileAction::Rm(RmAction {
                path: path.to_string(),
                allow_not_found: true,
            }),
            meta,
        )
    }

    pub fn symlink(&self, oldpath: &str, newpath: &str, uid: i64, gid: i64, meta: OpMetadata) -> State {
        self.file_action(
            FileAction::Symlink(SymlinkAction {
                oldpath: oldpath.to_string(),
                newpath: newpath.to_string(),
                uid,
                gid,
            }),
            meta,
        )
    }

    fn file_action(&self, action: FileAction, meta: OpMetadata) -> State {
        let mut inputs = Vec::new();
        let base = self.edge.as_ref().map(|edge| {
            inputs.push(edge.clone());
            0
        });
        Self::from_node(Node {
            op: Op::File(FileOp {
                base,
                actions: vec![action],
            }),
            inputs,
            metadata: meta,
        })
    }

    /// Merge states left to right; later entries win on conflict.
    pub fn merge(states: &[State], meta: OpMetadata) -> State {
        let inputs: Vec<Edge> = states.iter().filter_map(|s| s.edge.clone()).collect();
        match inputs.len() {
            0 => State::scratch(),
            1 => State {
                edge: inputs.into_iter().next(),
            },
            _ => Self::from_node(Node {
                op: Op::Merge(MergeOp {}),
                inputs,
                metadata: meta,
            }),
        }
    }

    /// The changes that `upper` makes on top of `lower`.
    pub fn diff(lower: &State, upper: &State, meta: OpMetadata) -> State {
        let inputs: Vec<Edge> = [lower, upper].iter().filter_map(|s| s.edge.clone()).collect();
        Self::from_node(Node {
            op: Op::Diff(DiffOp {}),
            inputs,
            metadata: meta,
        })
    }

    /// Forward the given state to another build frontend.
    pub fn frontend_build(
        inner: &State,
        frontend: &str,
        dockerfile_path: &str,
        target: &str,
        args: BTreeMap<String, String>,
        meta: OpMetadata,
    ) -> State {
        let inputs: Vec<Edge> = inner.edge.clone().into_iter().collect();
        Self::from_node(Node {
            op: Op::Build(BuildOp {
                frontend: frontend.to_string(),
                dockerfile_path: dockerfile_path.to_string(),
                target: target.to_string(),
                args,
            }),
            inputs,
            metadata: meta,
        })
    }
}

/// The result of [`State::run`]: the root filesystem after the
/// command plus any mounts promoted to outputs.
#[derive(Clone, Debug)]
pub struct Exec {
    node: Arc<Node>,
    outputs: BTreeMap<String, u32>,
}

impl Exec {
    /// The root filesystem after the command ran.
    pub fn root(&self) -> State {
        State {
            edge: Some(Edge {
                node: Arc::clone(&self.node),
                output: 0,
            }),
        }
    }

    /// The post-exec content of an output mount.
    pub fn mount_output(&self, dest: &str) -> Option<State> {
        let output = *self.outputs.get(dest)?;
        Some(State {
            edge: Some(Edge {
                node: Arc::clone(&self.node),
                output,
            }),
        })
    }
}

enum MountSource {
    State(State),
    Cache { id: String, sharing: CacheSharing },
    Tmpfs,
    Secret { id: String },
    Ssh { id: String },
}

struct RunMount {
    dest: String,
    source: MountSource,
    readonly: bool,
    selector: String,
    output: bool,
}

/// A builder for one executed command.
pub struct ExecCommand {
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: String,
    user: String,
    network: ExecNetwork,
    mounts: Vec<RunMount>,
    metadata: OpMetadata,
}

impl ExecCommand {
    /// Run the given command line through `/bin/sh -c`.
    pub fn shell(command: &str) -> Self {
        Self {
            args: vec!["/bin/sh".to_string(), "-c".to_string(), command.to_string()],
            env: Vec::new(),
            cwd: String::new(),
            user: String::new(),
            network: ExecNetwork::default(),
            mounts: Vec::new(),
            metadata: OpMetadata::default(),
        }
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in vars {
            self.env.push((name.into(), value.into()));
        }
        self
    }

    pub fn current_dir(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn network(mut self, network: ExecNetwork) -> Self {
        self.network = network;
        self
    }

    /// Bind-mount a state, read-write, without promoting it to an
    /// output.
    pub fn mount(mut self, dest: impl Into<String>, state: &State) -> Self {
        self.mounts.push(RunMount {
            dest: dest.into(),
            source: MountSource::State(state.clone()),
            readonly: false,
            selector: String::new(),
            output: false,
        });
        self
    }

    pub fn mount_readonly(mut self, dest: impl Into<String>, state: &State) -> Self {
        self.mounts.push(RunMount {
            dest: dest.into(),
            source: MountSource::State(state.clone()),
            readonly: true,
            selector: String::new(),
            output: false,
        });
        self
    }

    /// Bind-mount a single file out of a state.
    pub fn mount_file(
        mut self,
        dest: impl Into<String>,
        state: &State,
        source_path: impl Into<String>,
    ) -> Self {
        self.mounts.push(RunMount {
            dest: dest.into(),
            source: MountSource::State(state.clone()),
            readonly: true,
            selector: source_path.into(),
            output: false,
        });
        self
    }

    /// Bind-mount a state and capture its post-exec content as an
    /// output, retrievable via [`Exec::mount_output`].
    pub fn output_mount(mut self, dest: impl Into<String>, state: &State) -> Self {
        self.mounts.push(RunMount {
            dest: dest.into(),
            source: MountSource::State(state.clone()),
            readonly: false,
            selector: String::new(),
            output: true,
        });
        self
    }

    pub fn mount_cache(
        mut self,
        dest: impl Into<String>,
        id: impl Into<String>,
        sharing: CacheSharing,
    ) -> Self {
        self.mounts.push(RunMount {
            dest: dest.into(),
            source: MountSource::Cache {
                id: id.into(),
                sharing,
            },
            readonly: false,
            selector: String::new(),
            output: false,
        });
        self
    }

    pub fn mount_tmpfs(mut self, dest: impl Into<String>) -> Self {
        self.mounts.push(RunMount {
            dest: dest.into(),
            source: MountSource::Tmpfs,
            readonly: false,
            selector: String::new(),
            output: false,
        });
        self
    }

    pub fn mount_secret(mut self, dest: impl Into<String>, id: impl Into<String>) -> Self {
        self.mounts.push(RunMount {
            dest: dest.into(),
            source: MountSource::Secret { id: id.into() },
            readonly: true,
            selector: String::new(),
            output: false,
        });
        self
    }

    pub fn mount_ssh(mut self, id: impl Into<String>) -> Self {
        self.mounts.push(RunMount {
            dest: String::new(),
            source: MountSource::Ssh { id: id.into() },
            readonly: true,
            selector: String::new(),
            output: false,
        });
        self
    }

    pub fn metadata(mut self, meta: OpMetadata) -> Self {
        self.metadata = meta;
        self
    }
}
