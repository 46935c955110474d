// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use sha1::{Digest, Sha1};

use super::{
    offsets, pad_to_alignment, ByteOrder, Flags, FormatDefinition, FormatError, Header,
    IntegrityError, SectionDefinition, SectionTableEntry, DIGEST_SIZE, FORMAT_VERSION,
    HEADER_SIZE, SECTION_TABLE_ENTRY_SIZE,
};

/// A single section payload together with its kind and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub definition: SectionDefinition,
    pub flags: Flags,
    pub data: Vec<u8>,
}

impl Section {
    pub fn new(definition: SectionDefinition, flags: Flags, data: Vec<u8>) -> Self {
        Self {
            definition,
            flags,
            data,
        }
    }

    pub fn name(&self) -> &'static str {
        self.definition.name
    }
}

/// Computes the SHA-1 digest of the provided bytes.
pub(crate) fn sha1_digest(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes the header digest over header and section table bytes,
/// treating the digest field as zeroed.
fn header_digest(header_and_table: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(&header_and_table[..offsets::DIGEST]);
    hasher.update([0u8; DIGEST_SIZE]);
    hasher.update(&header_and_table[offsets::DIGEST + DIGEST_SIZE..]);
    hasher.finalize().into()
}

/// Reads and writes containers of a specific [FormatDefinition]
/// with a specific set of known [SectionDefinition]s.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    pub format: &'static FormatDefinition,
    pub sections: &'static [SectionDefinition],
}

impl Codec {
    pub const fn new(
        format: &'static FormatDefinition,
        sections: &'static [SectionDefinition],
    ) -> Self {
        Self { format, sections }
    }

    fn section_by_type(&self, id: u16) -> Option<&'static SectionDefinition> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Serializes a container using the latest data version of the format.
    ///
    /// Returns a list of buffers which, concatenated, form the file:
    /// first the header with the section table, then every section padded
    /// to the format's alignment.
    pub fn serialize(
        &self,
        id: u64,
        timestamp: i64,
        flags: &Flags,
        sections: &[Section],
    ) -> Result<Vec<Vec<u8>>, FormatError> {
        let (data_version, version) = self.format.latest();

        for section in sections {
            if !self.sections.contains(&section.definition) {
                return Err(FormatError::UnknownSection(section.name().to_string()));
            }
        }

        let table_size = sections.len() * SECTION_TABLE_ENTRY_SIZE;
        let header = Header {
            format_version: FORMAT_VERSION,
            data_version,
            flags: flags.clone(),
            id,
            timestamp,
            digest: [0; DIGEST_SIZE],
            section_table_size: table_size as u32,
        };
        let order = header.byte_order();

        let mut head = vec![0u8; HEADER_SIZE + table_size];
        header.write(&mut head, self.format);

        let mut buffers = Vec::with_capacity(sections.len() + 1);
        buffers.push(Vec::new());

        for (i, section) in sections.iter().enumerate() {
            let entry = SectionTableEntry {
                size: section.data.len() as u64,
                section_type: section.definition.id,
                flags: section.flags.encode(section.definition.flags),
                digest: sha1_digest(&section.data),
            };
            let start = HEADER_SIZE + i * SECTION_TABLE_ENTRY_SIZE;
            entry.write(&mut head[start..], order);

            let mut payload = section.data.clone();
            payload.resize(pad_to_alignment(payload.len(), version.alignment), 0);
            buffers.push(payload);
        }

        let digest = header_digest(&head);
        head[offsets::DIGEST..offsets::DIGEST + DIGEST_SIZE].copy_from_slice(&digest);
        buffers[0] = head;

        Ok(buffers)
    }

    /// Serializes a container straight into a writer.
    pub fn write_to<W: Write>(
        &self,
        mut w: W,
        id: u64,
        timestamp: i64,
        flags: &Flags,
        sections: &[Section],
    ) -> Result<(), FormatError> {
        for buf in self.serialize(id, timestamp, flags, sections)? {
            w.write_all(&buf)?;
        }
        w.flush()?;
        Ok(())
    }

    /// Deserializes a container from a sequential stream.
    ///
    /// Sections with unknown type ids are read and discarded.
    /// Digests are not checked, see [Deserialized::verify].
    pub fn deserialize<R: Read>(&self, mut r: R) -> Result<Deserialized, FormatError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        read_full(&mut r, &mut header_buf)?;
        let header = Header::parse(&header_buf, self.format)?;
        let order = header.byte_order();
        let alignment = self.format.versions[header.data_version as usize].alignment;

        let table_size = header.section_table_size as usize;
        if table_size % SECTION_TABLE_ENTRY_SIZE != 0 {
            return Err(FormatError::Truncated {
                expected: table_size.next_multiple_of(SECTION_TABLE_ENTRY_SIZE),
                got: table_size,
            });
        }

        let mut head = header_buf.to_vec();
        read_exact_or_truncated(&mut r, table_size as u64, &mut head)?;

        let table: Vec<SectionTableEntry> = head[HEADER_SIZE..]
            .chunks_exact(SECTION_TABLE_ENTRY_SIZE)
            .map(|chunk| SectionTableEntry::parse(chunk, order))
            .collect();

        let mut sections = Vec::with_capacity(table.len());
        let mut section_entries = Vec::with_capacity(table.len());

        for (i, entry) in table.iter().enumerate() {
            // Sizes which can't be padded can't be satisfied by the stream either
            let padded = checked_pad_to_alignment(entry.size, alignment as u64).unwrap_or(u64::MAX);
            let mut data = Vec::new();
            read_exact_or_truncated(&mut r, padded, &mut data)?;
            data.truncate(entry.size as usize);

            match self.section_by_type(entry.section_type) {
                Some(definition) => {
                    sections.push(Section {
                        definition: *definition,
                        flags: Flags::decode(entry.flags, definition.flags),
                        data,
                    });
                    section_entries.push(i);
                }
                None => log::debug!(
                    "skipping section {} with unknown type {}",
                    i,
                    entry.section_type
                ),
            }
        }

        Ok(Deserialized {
            header,
            byte_order: order,
            table,
            sections,
            section_entries,
            raw_head: head,
        })
    }

    /// Deserializes a container from a file.
    pub fn deserialize_file<P: AsRef<Path>>(&self, path: P) -> Result<Deserialized, FormatError> {
        let f = File::open(path)?;
        self.deserialize(BufReader::new(f))
    }
}

/// Fills the whole buffer, failing with [FormatError::Truncated] if the stream ends early.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), FormatError> {
    let mut got = 0;
    while got < buf.len() {
        match r.read(&mut buf[got..]) {
            Ok(0) => {
                return Err(FormatError::Truncated {
                    expected: buf.len(),
                    got,
                })
            }
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Appends exactly `size` bytes from the stream to `buf`, failing with
/// [FormatError::Truncated] if the stream ends early. The buffer only grows
/// with the data actually read.
fn read_exact_or_truncated<R: Read>(
    r: &mut R,
    size: u64,
    buf: &mut Vec<u8>,
) -> Result<(), FormatError> {
    let start = buf.len();
    r.by_ref().take(size).read_to_end(buf)?;
    let got = buf.len() - start;
    if (got as u64) < size {
        return Err(FormatError::Truncated {
            expected: usize::try_from(size).unwrap_or(usize::MAX),
            got,
        });
    }
    Ok(())
}

/// Like [pad_to_alignment], but returns `None` on overflow.
fn checked_pad_to_alignment(size: u64, alignment: u64) -> Option<u64> {
    if alignment <= 1 {
        Some(size)
    } else {
        size.div_ceil(alignment).checked_mul(alignment)
    }
}

/// A parsed container: header, section table and known sections, in table order.
#[derive(Debug, Clone)]
pub struct Deserialized {
    pub header: Header,
    pub byte_order: ByteOrder,
    pub table: Vec<SectionTableEntry>,
    pub sections: Vec<Section>,

    /// Index into `table` of every element of `sections`.
    section_entries: Vec<usize>,

    /// Raw header and section table bytes, as read.
    raw_head: Vec<u8>,
}

impl Deserialized {
    /// Returns the first section with the provided name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name() == name)
    }

    /// Recomputes every digest and compares it against the stored one.
    pub fn verify(&self) -> Result<(), IntegrityError> {
        if header_digest(&self.raw_head) != self.header.digest {
            return Err(IntegrityError::Header);
        }

        for (section, &entry_idx) in self.sections.iter().zip(&self.section_entries) {
            if sha1_digest(&section.data) != self.table[entry_idx].digest {
                return Err(IntegrityError::Section {
                    index: entry_idx,
                    name: section.name(),
                });
            }
        }

        Ok(())
    }

    pub fn check_digest(&self) -> bool {
        self.verify().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatVersion;

    const FORMAT: FormatDefinition = FormatDefinition {
        signature: *b"TEST",
        versions: &[FormatVersion {
            alignment: 8,
            flags: &["bigEndian"],
        }],
    };

    const ALPHA: SectionDefinition = SectionDefinition {
        name: "alpha",
        id: 1,
        flags: &["shiny"],
    };

    const BETA: SectionDefinition = SectionDefinition {
        name: "beta",
        id: 2,
        flags: &[],
    };

    const CODEC: Codec = Codec::new(&FORMAT, &[ALPHA, BETA]);
    const ALPHA_ONLY: Codec = Codec::new(&FORMAT, &[ALPHA]);

    fn sample_sections() -> Vec<Section> {
        vec![
            Section::new(ALPHA, Flags::new().with("shiny", true), b"hello".to_vec()),
            Section::new(BETA, Flags::new(), (0u8..20).collect()),
        ]
    }

    fn sample_bytes(big_endian: bool) -> Vec<u8> {
        let flags = Flags::new().with("bigEndian", big_endian);
        CODEC
            .serialize(42, 1_700_000_000_000, &flags, &sample_sections())
            .unwrap()
            .concat()
    }

    #[test]
    fn serialize_pads_sections() {
        let buffers = CODEC
            .serialize(42, 0, &Flags::new(), &sample_sections())
            .unwrap();
        assert_eq!(buffers.len(), 3);
        assert_eq!(buffers[0].len(), HEADER_SIZE + 2 * SECTION_TABLE_ENTRY_SIZE);
        assert_eq!(buffers[1].len(), 8);
        assert_eq!(buffers[2].len(), 24);
    }

    #[test]
    fn deserialize() {
        for big_endian in [false, true] {
            let d = CODEC.deserialize(sample_bytes(big_endian).as_slice()).unwrap();

            assert_eq!(d.header.id, 42);
            assert_eq!(d.header.timestamp, 1_700_000_000_000);
            assert_eq!(d.header.flags.get("bigEndian"), big_endian);
            assert_eq!(d.sections, sample_sections());
            assert!(d.section("alpha").unwrap().flags.get("shiny"));
            assert!(d.check_digest());
        }
    }

    #[test]
    fn serialize_rejects_unknown_section() {
        let err = ALPHA_ONLY
            .serialize(0, 0, &Flags::new(), &sample_sections())
            .unwrap_err();
        assert!(matches!(err, FormatError::UnknownSection(name) if name == "beta"));
    }

    #[test]
    fn deserialize_skips_unknown_sections() {
        let d = ALPHA_ONLY.deserialize(sample_bytes(false).as_slice()).unwrap();
        assert_eq!(d.table.len(), 2);
        assert_eq!(d.sections.len(), 1);
        assert_eq!(d.sections[0].data, b"hello");
        assert!(d.check_digest());
    }

    #[test]
    fn deserialize_truncated() {
        let bytes = sample_bytes(false);

        let err = CODEC.deserialize(&bytes[..30]).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Truncated {
                expected: HEADER_SIZE,
                got: 30
            }
        ));

        let err = CODEC.deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, FormatError::Truncated { .. }));
    }

    #[test]
    fn deserialize_oversized_section() {
        let mut bytes = sample_bytes(false);
        for size in [u64::MAX - 3, u64::MAX, 1 << 40] {
            let at = HEADER_SIZE + offsets::ENTRY_SIZE;
            ByteOrder::LittleEndian.put_u64(&mut bytes, at, size);
            assert!(matches!(
                CODEC.deserialize(bytes.as_slice()),
                Err(FormatError::Truncated { .. }),
            ));
        }
    }

    #[test]
    fn deserialize_partial_section_table() {
        let mut bytes = sample_bytes(false);
        let table_size = (2 * SECTION_TABLE_ENTRY_SIZE - 4) as u32;
        ByteOrder::LittleEndian.put_u32(&mut bytes, offsets::SECTION_TABLE_SIZE, table_size);
        assert!(matches!(
            CODEC.deserialize(bytes.as_slice()),
            Err(FormatError::Truncated { .. }),
        ));

        let mut bytes = sample_bytes(false);
        ByteOrder::LittleEndian.put_u32(&mut bytes, offsets::SECTION_TABLE_SIZE, u32::MAX - 31);
        assert!(matches!(
            CODEC.deserialize(bytes.as_slice()),
            Err(FormatError::Truncated { .. }),
        ));
    }

    #[test]
    fn deserialize_bad_signature() {
        let mut bytes = sample_bytes(false);
        bytes[1] = 0;
        assert!(matches!(
            CODEC.deserialize(bytes.as_slice()),
            Err(FormatError::BadSignature { .. }),
        ));
    }

    #[test]
    fn section_corruption_is_detected() {
        let mut d = CODEC.deserialize(sample_bytes(false).as_slice()).unwrap();
        d.sections[1].data[3] ^= 0x10;
        assert_eq!(
            d.verify(),
            Err(IntegrityError::Section {
                index: 1,
                name: "beta"
            }),
        );
        assert!(!d.check_digest());
    }

    #[test]
    fn header_corruption_is_detected() {
        let mut bytes = sample_bytes(false);
        bytes[offsets::TIMESTAMP] ^= 0x01;
        let d = CODEC.deserialize(bytes.as_slice()).unwrap();
        assert_eq!(d.verify(), Err(IntegrityError::Header));
    }

    #[test]
    fn file_round_trip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        CODEC
            .write_to(f.as_file_mut(), 7, 0, &Flags::new(), &sample_sections())
            .unwrap();

        let d = CODEC.deserialize_file(f.path()).unwrap();
        assert_eq!(d.header.id, 7);
        assert_eq!(d.sections.len(), 2);
        assert!(d.check_digest());
    }
}
