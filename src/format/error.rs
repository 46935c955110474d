// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;

/// Fatal errors encountered while reading or writing a container.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("bad signature: got {got:02x?}, expected {expected:02x?}")]
    BadSignature { got: [u8; 4], expected: [u8; 4] },

    #[error("unsupported format version: {0} (supported: {v})", v = super::FORMAT_VERSION)]
    UnsupportedFormatVersion(u8),

    #[error("unsupported data version: {got} (latest known: {latest})")]
    UnsupportedDataVersion { got: u8, latest: u8 },

    #[error("truncated data: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("section {0:?} is not part of this format")]
    UnknownSection(String),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Digest mismatch detected by [Deserialized::verify](super::Deserialized::verify).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("header digest mismatch")]
    Header,

    #[error("digest mismatch in section {index} ({name})")]
    Section { index: usize, name: &'static str },
}
