// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Definition of the graph file: its container format, section kinds
//! and the record layout of every fixed-stride section.

use crate::format::{
    ByteOrder, Codec, FieldSpec, FormatDefinition, FormatVersion, NumericType, RecordLayout,
    SectionDefinition, BIG_ENDIAN_FLAG,
};

pub const SIGNATURE: [u8; 4] = [0x9c, 0x9c, 0x44, 0x47];

/// Header flag selecting 64-bit indices in every section.
pub const INDEX_SIZES_FLAG: &str = "indexSizes";

/// Flag of the nodes section selecting double-precision coordinates.
pub const COORDINATE_PRECISION_FLAG: &str = "coordinatePrecision";

/// Flag of the index section, set if all nodes (not only edge starts) are indexed.
pub const INDEX_TYPE_FLAG: &str = "indexType";

pub const ALIGNMENT: usize = 8;

pub const GRAPH_FORMAT: FormatDefinition = FormatDefinition {
    signature: SIGNATURE,
    versions: &[FormatVersion {
        alignment: ALIGNMENT,
        flags: &[BIG_ENDIAN_FLAG, INDEX_SIZES_FLAG],
    }],
};

pub const METADATA: SectionDefinition = SectionDefinition {
    name: "metadata",
    id: 1,
    flags: &[],
};

pub const NODES: SectionDefinition = SectionDefinition {
    name: "nodes",
    id: 2,
    flags: &[COORDINATE_PRECISION_FLAG],
};

pub const EDGES: SectionDefinition = SectionDefinition {
    name: "edges",
    id: 3,
    flags: &[],
};

pub const EDGE_LIST: SectionDefinition = SectionDefinition {
    name: "edgeList",
    id: 4,
    flags: &[],
};

pub const NODE_LIST: SectionDefinition = SectionDefinition {
    name: "nodeList",
    id: 5,
    flags: &[],
};

pub const CONNECTIONS_LIST: SectionDefinition = SectionDefinition {
    name: "connectionsList",
    id: 6,
    flags: &[],
};

pub const INDEX: SectionDefinition = SectionDefinition {
    name: "index",
    id: 7,
    flags: &[INDEX_TYPE_FLAG],
};

pub const GRAPH_CODEC: Codec = Codec::new(
    &GRAPH_FORMAT,
    &[
        METADATA,
        NODES,
        EDGES,
        EDGE_LIST,
        NODE_LIST,
        CONNECTIONS_LIST,
        INDEX,
    ],
);

/// Width of node and edge indices stored in the sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexWidth {
    #[default]
    U32,
    U64,
}

impl IndexWidth {
    pub fn from_flag(wide: bool) -> Self {
        if wide {
            Self::U64
        } else {
            Self::U32
        }
    }

    /// Picks the narrowest width able to address `max` elements.
    pub fn for_count(max: usize) -> Self {
        Self::from_flag(max as u64 > u32::MAX as u64)
    }

    pub fn is_wide(self) -> bool {
        self == Self::U64
    }

    fn numeric_type(self) -> NumericType {
        match self {
            Self::U32 => NumericType::U32,
            Self::U64 => NumericType::U64,
        }
    }
}

/// Precision of stored node coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinatePrecision {
    #[default]
    Single,
    Double,
}

impl CoordinatePrecision {
    pub fn from_flag(double: bool) -> Self {
        if double {
            Self::Double
        } else {
            Self::Single
        }
    }

    pub fn is_double(self) -> bool {
        self == Self::Double
    }

    fn numeric_type(self) -> NumericType {
        match self {
            Self::Single => NumericType::F32,
            Self::Double => NumericType::F64,
        }
    }
}

/// Record layouts of all fixed-stride graph sections,
/// resolved once for a specific index width, precision and byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layouts {
    pub nodes: RecordLayout,
    pub edges: RecordLayout,
    pub edge_list: RecordLayout,
    pub node_list: RecordLayout,
    pub connections_list: RecordLayout,
}

impl Layouts {
    pub fn new(index: IndexWidth, precision: CoordinatePrecision, order: ByteOrder) -> Self {
        let idx = index.numeric_type();
        let coord = precision.numeric_type();

        Self {
            nodes: RecordLayout::new(
                &[
                    FieldSpec::field("osmId", NumericType::I64),
                    FieldSpec::field("lon", coord),
                    FieldSpec::field("lat", coord),
                    FieldSpec::field("edgeListIndex", idx),
                    FieldSpec::field("edgeListLength", NumericType::U16),
                ],
                order,
                Some(ALIGNMENT),
            ),
            edges: RecordLayout::new(
                &[
                    FieldSpec::field("nodeListLength", NumericType::U16),
                    FieldSpec::field("toEdgeListLength", NumericType::U16),
                    FieldSpec::field("fromEdgeListLength", NumericType::U16),
                    FieldSpec::Padding(2),
                    FieldSpec::field("length", NumericType::F32),
                    FieldSpec::field("nodeListIndex", idx),
                    FieldSpec::field("toEdgeListIndex", idx),
                    FieldSpec::field("fromEdgeListIndex", idx),
                ],
                order,
                Some(ALIGNMENT),
            ),
            edge_list: RecordLayout::new(&[FieldSpec::field("edgeIndex", idx)], order, None),
            node_list: RecordLayout::new(&[FieldSpec::field("nodeIndex", idx)], order, None),
            connections_list: RecordLayout::new(
                &[
                    FieldSpec::field("edgeIndex", idx),
                    FieldSpec::field("cost", NumericType::F32),
                ],
                order,
                Some(ALIGNMENT),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides() {
        let narrow = Layouts::new(
            IndexWidth::U32,
            CoordinatePrecision::Single,
            ByteOrder::LittleEndian,
        );
        assert_eq!(narrow.nodes.stride(), 24);
        assert_eq!(narrow.edges.stride(), 24);
        assert_eq!(narrow.edge_list.stride(), 4);
        assert_eq!(narrow.node_list.stride(), 4);
        assert_eq!(narrow.connections_list.stride(), 8);

        let wide = Layouts::new(IndexWidth::U64, CoordinatePrecision::Double, ByteOrder::BigEndian);
        assert_eq!(wide.nodes.stride(), 40);
        assert_eq!(wide.edges.stride(), 40);
        assert_eq!(wide.edge_list.stride(), 8);
        assert_eq!(wide.connections_list.stride(), 16);
        assert_eq!(wide.edges.offset("length"), Some(8));
        assert_eq!(wide.edges.offset("fromEdgeListIndex"), Some(28));
    }

    #[test]
    fn index_width() {
        assert_eq!(IndexWidth::for_count(10), IndexWidth::U32);
        assert_eq!(IndexWidth::for_count(u32::MAX as usize), IndexWidth::U32);
        assert!(!IndexWidth::from_flag(false).is_wide());
    }
}
