// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{offsets, ByteOrder, DIGEST_SIZE, SECTION_TABLE_ENTRY_SIZE};

/// Numeric identifier of a section kind, as stored in the section table.
pub type SectionType = u16;

/// One entry of the section table, describing a single section payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTableEntry {
    /// Size of the payload, excluding alignment padding.
    pub size: u64,
    pub section_type: SectionType,
    pub flags: u8,
    pub digest: [u8; DIGEST_SIZE],
}

impl SectionTableEntry {
    pub fn write(&self, buf: &mut [u8], order: ByteOrder) {
        let entry = &mut buf[..SECTION_TABLE_ENTRY_SIZE];
        entry.fill(0);
        order.put_u64(entry, offsets::ENTRY_SIZE, self.size);
        order.put_u16(entry, offsets::ENTRY_ID, self.section_type);
        entry[offsets::ENTRY_FLAGS] = self.flags;
        entry[offsets::ENTRY_DIGEST..offsets::ENTRY_DIGEST + DIGEST_SIZE]
            .copy_from_slice(&self.digest);
    }

    pub fn parse(buf: &[u8], order: ByteOrder) -> Self {
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&buf[offsets::ENTRY_DIGEST..offsets::ENTRY_DIGEST + DIGEST_SIZE]);
        Self {
            size: order.get_u64(buf, offsets::ENTRY_SIZE),
            section_type: order.get_u16(buf, offsets::ENTRY_ID),
            flags: buf[offsets::ENTRY_FLAGS],
            digest,
        }
    }
}
