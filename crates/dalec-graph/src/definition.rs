// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use data_encoding::HEXLOWER;
use ring::digest::{digest, SHA256};
use serde::Serialize;

use crate::op::{Edge, Node};
use crate::state::State;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./definition_test.rs"]
mod definition_test;

/// A marshalled build graph, ready to hand to the engine.
///
/// Ops appear in dependency order (post-order from the result) and
/// are content-addressed: marshalling the same state twice yields
/// identical bytes.
#[derive(Debug, Serialize)]
pub struct Definition {
    pub ops: Vec<MarshaledOp>,
    /// Per-op out-of-band information, keyed by op digest.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MarshaledMetadata>,
    /// The op output that is the overall result.
    pub result: OutputRef,
}

#[derive(Debug, Serialize)]
pub struct MarshaledOp {
    pub digest: String,
    pub op: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<OutputRef>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRef {
    pub digest: String,
    pub output: u32,
}

#[derive(Debug, Default, Serialize)]
pub struct MarshaledMetadata {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub description: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// A spec document location attached to an op, so the engine can
/// attribute failures to the yaml line that emitted it.
#[derive(Debug, Serialize)]
pub struct Location {
    pub filename: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Definition {
    /// Serialise the graph reachable from the given state.
    ///
    /// Marshalling scratch is an error: there is no node to point
    /// the engine at.
    pub fn marshal(state: &State) -> Result<Definition> {
        let root = state
            .output()
            .ok_or_else(|| Error::String("cannot marshal the scratch state".to_string()))?;
        let mut marshaller = Marshaller::default();
        let result = marshaller.edge(root)?;
        tracing::trace!(ops = marshaller.ops.len(), "marshalled graph definition");
        Ok(Definition {
            ops: marshaller.ops,
            metadata: marshaller.metadata,
            result,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::MarshalError)
    }
}

#[derive(Default)]
struct Marshaller {
    ops: Vec<MarshaledOp>,
    metadata: BTreeMap<String, MarshaledMetadata>,
    // node identity → already-assigned digest
    seen: BTreeMap<usize, String>,
}

impl Marshaller {
    fn edge(&mut self, edge: &Edge) -> Result<OutputRef> {
        let digest = self.node(&edge.node)?;
        Ok(OutputRef {
            digest,
            output: edge.output,
        })
    }

    fn node(&mut self, node: &Arc<Node>) -> Result<String> {
        let key = Arc::as_ptr(node) as usize;
        if let Some(digest) = self.seen.get(&key) {
            return Ok(digest.clone());
        }

        let mut inputs = Vec::with_capacity(node.inputs.len());
        for input in node.inputs.iter() {
            inputs.push(self.edge(input)?);
        }

        let op = serde_json::to_value(&node.op).map_err(Error::MarshalError)?;
        let payload = serde_json::to_vec(&(&op, &inputs)).map_err(Error::MarshalError)?;
        let digest = format!("sha256:{}", HEXLOWER.encode(digest(&SHA256, &payload).as_ref()));

        if !self.metadata.contains_key(&digest) {
            let meta = &node.metadata;
            if !meta.description.is_empty() || meta.span.is_some() {
                self.metadata.insert(
                    digest.clone(),
                    MarshaledMetadata {
                        description: meta.description.clone(),
                        location: meta.span.as_ref().map(|span| Location {
                            filename: span.filename.to_string(),
                            start_line: span.start_line,
                            end_line: span.end_line,
                            start_col: span.start_col,
                            end_col: span.end_col,
                        }),
                    },
                );
            }
        }
        if !self.ops.iter().any(|op| op.digest == digest) {
            self.ops.push(MarshaledOp {
                digest: digest.clone(),
                op,
                inputs,
            });
        }
        self.seen.insert(key, digest.clone());
        Ok(digest)
    }
}
