// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Generic versioned container format: a fixed-size header, a section table,
//! and a sequence of independently checksummed byte sections.
//!
//! ```text
//! 0x00  signature          4 bytes
//! 0x04  format version     1 byte
//! 0x05  data version       1 byte
//! 0x06  reserved           1 byte
//! 0x07  flags              1 byte (bit 0 is always "bigEndian")
//! 0x08  graph id           8 bytes
//! 0x10  timestamp          8 bytes, milliseconds since the Unix epoch
//! 0x18  digest            20 bytes, SHA-1 over header + table with this field zeroed
//! 0x2c  section table size 4 bytes
//! ```
//!
//! Every multi-byte field after the flags byte uses the byte order selected
//! by the "bigEndian" flag.

mod accessor;
mod codec;
mod error;
mod flags;
mod header;
mod section_table;

pub use accessor::{Column, FieldSpec, FieldWriter, LayoutError, NumericType, RecordLayout};
pub use codec::{Codec, Deserialized, Section};
pub use error::{FormatError, IntegrityError};
pub use flags::Flags;
pub use header::Header;
pub use section_table::{SectionTableEntry, SectionType};

/// Version of the container layout itself (header and section table).
pub const FORMAT_VERSION: u8 = 1;

pub const HEADER_SIZE: usize = 48;
pub const SECTION_TABLE_ENTRY_SIZE: usize = 32;
pub const DIGEST_SIZE: usize = 20;

pub(crate) mod offsets {
    pub const SIGNATURE: usize = 0x00;
    pub const FORMAT_VERSION: usize = 0x04;
    pub const DATA_VERSION: usize = 0x05;
    pub const FLAGS: usize = 0x07;
    pub const ID: usize = 0x08;
    pub const TIMESTAMP: usize = 0x10;
    pub const DIGEST: usize = 0x18;
    pub const SECTION_TABLE_SIZE: usize = 0x2c;

    pub const ENTRY_SIZE: usize = 0x00;
    pub const ENTRY_ID: usize = 0x08;
    pub const ENTRY_FLAGS: usize = 0x0a;
    pub const ENTRY_DIGEST: usize = 0x0c;
}

/// Name of the header flag selecting big-endian byte order.
/// Every [FormatVersion] must declare it as its first flag.
pub const BIG_ENDIAN_FLAG: &str = "bigEndian";

/// Byte order of multi-byte values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

macro_rules! byte_order_accessors {
    ($($get:ident, $put:ident, $t:ty, $n:expr;)*) => {
        impl ByteOrder {
            $(
                #[inline]
                pub fn $get(self, buf: &[u8], offset: usize) -> $t {
                    let mut bytes = [0u8; $n];
                    bytes.copy_from_slice(&buf[offset..offset + $n]);
                    match self {
                        Self::LittleEndian => <$t>::from_le_bytes(bytes),
                        Self::BigEndian => <$t>::from_be_bytes(bytes),
                    }
                }

                #[inline]
                pub fn $put(self, buf: &mut [u8], offset: usize, value: $t) {
                    let bytes = match self {
                        Self::LittleEndian => value.to_le_bytes(),
                        Self::BigEndian => value.to_be_bytes(),
                    };
                    buf[offset..offset + $n].copy_from_slice(&bytes);
                }
            )*
        }
    };
}

byte_order_accessors! {
    get_u16, put_u16, u16, 2;
    get_u32, put_u32, u32, 4;
    get_u64, put_u64, u64, 8;
    get_i16, put_i16, i16, 2;
    get_i32, put_i32, i32, 4;
    get_i64, put_i64, i64, 8;
    get_f32, put_f32, f32, 4;
    get_f64, put_f64, f64, 8;
}

/// Describes one data version of a container: its section alignment
/// and the ordered names of its header flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatVersion {
    pub alignment: usize,
    pub flags: &'static [&'static str],
}

/// Describes a concrete container format: its magic signature
/// and all data versions, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDefinition {
    pub signature: [u8; 4],
    pub versions: &'static [FormatVersion],
}

impl FormatDefinition {
    /// Returns the index and description of the newest data version.
    pub fn latest(&self) -> (u8, &FormatVersion) {
        let idx = self.versions.len() - 1;
        (idx as u8, &self.versions[idx])
    }
}

/// Describes a kind of section which may appear in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDefinition {
    pub name: &'static str,
    pub id: u16,
    pub flags: &'static [&'static str],
}

/// Rounds `size` up to the nearest multiple of `alignment`.
#[inline]
pub fn pad_to_alignment(size: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        size
    } else {
        size.div_ceil(alignment) * alignment
    }
}
