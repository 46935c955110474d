// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{
    offsets, ByteOrder, Flags, FormatDefinition, FormatError, BIG_ENDIAN_FLAG, DIGEST_SIZE,
    FORMAT_VERSION, HEADER_SIZE,
};

/// Fixed-size container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub format_version: u8,
    pub data_version: u8,
    pub flags: Flags,
    pub id: u64,

    /// Creation time, in milliseconds since the Unix epoch.
    pub timestamp: i64,

    pub digest: [u8; DIGEST_SIZE],
    pub section_table_size: u32,
}

impl Header {
    pub fn byte_order(&self) -> ByteOrder {
        if self.flags.get(BIG_ENDIAN_FLAG) {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// Writes the header into the first [HEADER_SIZE] bytes of `buf`.
    pub fn write(&self, buf: &mut [u8], format: &FormatDefinition) {
        let order = self.byte_order();
        let declared = format.versions[self.data_version as usize].flags;

        buf[offsets::SIGNATURE..offsets::SIGNATURE + 4].copy_from_slice(&format.signature);
        buf[offsets::FORMAT_VERSION] = self.format_version;
        buf[offsets::DATA_VERSION] = self.data_version;
        buf[offsets::FLAGS] = self.flags.encode(declared);
        order.put_u64(buf, offsets::ID, self.id);
        order.put_i64(buf, offsets::TIMESTAMP, self.timestamp);
        buf[offsets::DIGEST..offsets::DIGEST + DIGEST_SIZE].copy_from_slice(&self.digest);
        order.put_u32(buf, offsets::SECTION_TABLE_SIZE, self.section_table_size);
    }

    /// Parses a header, rejecting unknown signatures and versions.
    pub fn parse(buf: &[u8; HEADER_SIZE], format: &FormatDefinition) -> Result<Self, FormatError> {
        let mut signature = [0u8; 4];
        signature.copy_from_slice(&buf[offsets::SIGNATURE..offsets::SIGNATURE + 4]);
        if signature != format.signature {
            return Err(FormatError::BadSignature {
                got: signature,
                expected: format.signature,
            });
        }

        let format_version = buf[offsets::FORMAT_VERSION];
        if format_version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedFormatVersion(format_version));
        }

        let data_version = buf[offsets::DATA_VERSION];
        let (latest, _) = format.latest();
        if data_version > latest {
            return Err(FormatError::UnsupportedDataVersion {
                got: data_version,
                latest,
            });
        }

        let flags = Flags::decode(
            buf[offsets::FLAGS],
            format.versions[data_version as usize].flags,
        );

        let mut header = Self {
            format_version,
            data_version,
            flags,
            id: 0,
            timestamp: 0,
            digest: [0; DIGEST_SIZE],
            section_table_size: 0,
        };

        let order = header.byte_order();
        header.id = order.get_u64(buf, offsets::ID);
        header.timestamp = order.get_i64(buf, offsets::TIMESTAMP);
        header.digest.copy_from_slice(&buf[offsets::DIGEST..offsets::DIGEST + DIGEST_SIZE]);
        header.section_table_size = order.get_u32(buf, offsets::SECTION_TABLE_SIZE);
        Ok(header)
    }
}
