// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(test)]
#[path = "./source_map_test.rs"]
mod source_map_test;

/// A location within a spec document.
///
/// Lines and columns are 1-based; an end line of zero
/// denotes an unknown location.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Span {
    pub filename: Arc<str>,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Span {
    /// A span pointing nowhere, used when no document
    /// position is available for a diagnostic.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.end_line == 0
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            f.write_str("<unknown>")
        } else {
            write!(f, "{}:{}:{}", self.filename, self.start_line, self.start_col)
        }
    }
}

static KEY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^("(?P<quoted>[^"]*)"|(?P<plain>[^\s:#]+)):(\s+|$)"#).expect("a valid regex")
});

/// Maps dotted document paths (`sources.app.git`, `patches.app.0`)
/// to their location in the original yaml text.
///
/// The index is built from a structural scan of the raw document:
/// block mappings and sequences are tracked by indentation. Nodes
/// written in flow style (`{a: 1}`) index as their enclosing key,
/// which is why lookups fall back to the longest indexed prefix.
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    filename: Arc<str>,
    spans: BTreeMap<String, Span>,
}

#[derive(Debug)]
enum Frame {
    Mapping { indent: usize, path: String },
    Sequence { indent: usize, base: String, index: usize },
}

impl Frame {
    fn indent(&self) -> usize {
        match self {
            Frame::Mapping { indent, .. } => *indent,
            Frame::Sequence { indent, .. } => *indent,
        }
    }

    fn path(&self) -> String {
        match self {
            Frame::Mapping { path, .. } => path.clone(),
            Frame::Sequence { base, index, .. } => format!("{base}.{index}"),
        }
    }
}

fn extend_enclosing(
    spans: &mut BTreeMap<String, Span>,
    stack: &[Frame],
    lineno: usize,
    raw: &str,
) {
    for frame in stack.iter() {
        if let Some(span) = spans.get_mut(&frame.path()) {
            span.end_line = lineno;
            span.end_col = raw.trim_end().len() + 1;
        }
    }
}

impl SourceMap {
    /// Scan the given yaml text, indexing the location of
    /// every block-style mapping key and sequence item.
    pub fn index(yaml: &str, filename: &str) -> Self {
        let filename: Arc<str> = Arc::from(filename);
        let mut spans = BTreeMap::new();
        // paths with an open span, to have end positions assigned
        let mut stack: Vec<Frame> = Vec::new();

        for (lineno, raw) in yaml.lines().enumerate() {
            let lineno = lineno + 1;
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut indent = raw.len() - trimmed.len();
            let mut rest = trimmed;

            while stack.last().is_some_and(|f| indent < f.indent()) {
                stack.pop();
            }

            // sequence items, including inline `- key: value` entries
            while let Some(stripped) = rest.strip_prefix('-').and_then(|r| {
                (r.is_empty() || r.starts_with(' ')).then_some(r.trim_start())
            }) {
                let base = match stack.last_mut() {
                    Some(Frame::Sequence {
                        indent: seq_indent,
                        index,
                        ..
                    }) if *seq_indent == indent => {
                        *index += 1;
                        stack.last().expect("frame was just matched").path()
                    }
                    _ => {
                        let base = stack.last().map(|f| f.path()).unwrap_or_default();
                        stack.push(Frame::Sequence {
                            indent,
                            base,
                            index: 0,
                        });
                        stack.last().expect("frame was just pushed").path()
                    }
                };
                spans.insert(
                    base.clone(),
                    Span {
                        filename: Arc::clone(&filename),
                        start_line: lineno,
                        end_line: lineno,
                        start_col: indent + 1,
                        end_col: raw.trim_end().len() + 1,
                    },
                );
                indent += rest.len() - stripped.len();
                rest = stripped;
                if rest.is_empty() {
                    break;
                }
            }

            let Some(found) = KEY_LINE.captures(rest) else {
                extend_enclosing(&mut spans, &stack, lineno, raw);
                continue;
            };
            let key = found
                .name("quoted")
                .or_else(|| found.name("plain"))
                .expect("regex requires one of the two groups")
                .as_str();
            // a key at or left of the previous key closes it
            while stack.last().is_some_and(|f| indent <= f.indent()) {
                stack.pop();
            }
            extend_enclosing(&mut spans, &stack, lineno, raw);
            let parent = stack.last().map(|f| f.path()).unwrap_or_default();
            let path = if parent.is_empty() {
                key.to_string()
            } else {
                format!("{parent}.{key}")
            };
            spans.insert(
                path.clone(),
                Span {
                    filename: Arc::clone(&filename),
                    start_line: lineno,
                    end_line: lineno,
                    start_col: indent + 1,
                    end_col: raw.trim_end().len() + 1,
                },
            );
            stack.push(Frame::Mapping { indent, path });
        }

        Self { filename, spans }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The exact span recorded for a document path, if any.
    pub fn get(&self, path: &str) -> Option<&Span> {
        self.spans.get(path)
    }

    /// The span for a document path, falling back to the nearest
    /// enclosing node that was indexed. Returns [`Span::unknown`]
    /// when nothing encloses the path.
    pub fn locate(&self, path: &str) -> Span {
        let mut current = path;
        loop {
            if let Some(span) = self.spans.get(current) {
                return span.clone();
            }
            match current.rsplit_once('.') {
                Some((parent, _)) => current = parent,
                None => return Span::unknown(),
            }
        }
    }
}
