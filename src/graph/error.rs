// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::format::{FormatError, LayoutError};
use crate::osm::NodeId;

/// Error conditions which may occur while turning a [Graph](super::Graph) into bytes.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("{what} of {count} elements does not fit in 16 bits")]
    LengthOverflow { what: &'static str, count: usize },

    #[error("edge {from} -> {to} references unknown {what}")]
    DanglingReference {
        from: NodeId,
        to: NodeId,
        what: &'static str,
    },

    #[error("node {0} has no position")]
    MissingNode(NodeId),

    #[error("invalid record layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Error conditions which may occur while constructing a [GraphAccessor](super::GraphAccessor).
#[derive(Debug, thiserror::Error)]
pub enum AccessorError {
    #[error("missing section: {0}")]
    MissingSection(&'static str),

    #[error("duplicate section: {0}")]
    DuplicateSection(&'static str),

    #[error("invalid record layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] FormatError),
}
