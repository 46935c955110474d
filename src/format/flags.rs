// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

/// A set of named boolean feature flags, stored on disk as a bitfield
/// whose bit positions are given by an ordered list of flag names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags(BTreeSet<&'static str>);

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: bool) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: bool) {
        if value {
            self.0.insert(name);
        } else {
            self.0.remove(name);
        }
    }

    pub fn get(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Packs the flags into a bitfield. Flags absent from `declared` are ignored,
    /// and so are declared flags past the 8th.
    pub fn encode(&self, declared: &[&'static str]) -> u8 {
        declared
            .iter()
            .take(8)
            .enumerate()
            .filter(|(_, name)| self.get(name))
            .fold(0, |bits, (bit, _)| bits | (1 << bit))
    }

    /// Unpacks a bitfield. Set bits without a declared name are dropped.
    pub fn decode(bits: u8, declared: &[&'static str]) -> Self {
        Self(
            declared
                .iter()
                .take(8)
                .enumerate()
                .filter(|(bit, _)| bits & (1 << bit) != 0)
                .map(|(_, &name)| name)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARED: &[&str] = &["bigEndian", "indexSizes"];

    #[test]
    fn encode() {
        assert_eq!(Flags::new().encode(DECLARED), 0);
        assert_eq!(Flags::new().with("bigEndian", true).encode(DECLARED), 0b01);
        assert_eq!(Flags::new().with("indexSizes", true).encode(DECLARED), 0b10);
        assert_eq!(
            Flags::new()
                .with("bigEndian", true)
                .with("indexSizes", true)
                .with("somethingElse", true)
                .encode(DECLARED),
            0b11,
        );
    }

    #[test]
    fn decode() {
        let flags = Flags::decode(0b1110, DECLARED);
        assert!(!flags.get("bigEndian"));
        assert!(flags.get("indexSizes"));
        assert_eq!(flags, Flags::new().with("indexSizes", true));
    }

    #[test]
    fn set_and_clear() {
        let mut flags = Flags::new().with("bigEndian", true);
        flags.set("bigEndian", false);
        assert_eq!(flags, Flags::new());
    }
}
