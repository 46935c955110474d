// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use crate::osm::model::{
    self, FeatureType, Node, NodeId, Relation, RelationId, RelationMember, Way, WayId,
};

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>> {
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<quick_xml::events::Event<'b>> {
        self.0.read_event()
    }
}

/// Reader reads osm [Features](model::Feature) from an XML file.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self { parser, eof: false }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<model::Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<model::Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => return Some(Err(e)),
            };

            match event {
                quick_xml::events::Event::Empty(start) => {
                    match start.local_name().as_ref() {
                        b"node" => {
                            if let Some(n) = parse_node(start) {
                                return Some(Ok(model::Feature::Node(n)));
                            }
                        }
                        // "way" or "relation" can't be self-closing
                        b"tag" => {
                            if let Some(tags) = feature_tags(&mut f) {
                                if let Some((k, v)) = parse_tag(start) {
                                    tags.insert(k, v);
                                }
                            }
                        }
                        b"nd" => {
                            if let Some(nodes) = feature_nodes(&mut f) {
                                if let Some(ref_) = parse_nd(start) {
                                    nodes.push(ref_);
                                }
                            }
                        }
                        b"member" => {
                            if let Some(members) = feature_members(&mut f) {
                                if let Some(member) = parse_member(start) {
                                    members.push(member);
                                }
                            }
                        }
                        _ => {}
                    }
                }

                quick_xml::events::Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(start).map(model::Feature::Node),
                    b"way" => f = parse_way(start).map(model::Feature::Way),
                    b"relation" => f = parse_relation(start).map(model::Feature::Relation),
                    // "tag", "nd" and "member" must be self-closing
                    _ => {}
                },

                quick_xml::events::Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        f.map(Ok)
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    pub(super) fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

fn parse_node(start: quick_xml::events::BytesStart<'_>) -> Option<Node> {
    let mut id: i64 = 0;
    let mut lat = f64::NAN;
    let mut lon = f64::NAN;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lat" => lat = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lon" => lon = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 && lat.is_finite() && lon.is_finite() {
        Some(Node {
            id: NodeId(id),
            lat,
            lon,
            tags: HashMap::default(),
        })
    } else {
        log::debug!("skipping node without a valid id or position");
        None
    }
}

fn parse_way(start: quick_xml::events::BytesStart<'_>) -> Option<Way> {
    let id = parse_id(&start)?;
    Some(Way {
        id: WayId(id),
        nodes: Vec::default(),
        tags: HashMap::default(),
    })
}

fn parse_relation(start: quick_xml::events::BytesStart<'_>) -> Option<Relation> {
    let id = parse_id(&start)?;
    Some(Relation {
        id: RelationId(id),
        members: Vec::default(),
        tags: HashMap::default(),
    })
}

fn parse_id(start: &quick_xml::events::BytesStart<'_>) -> Option<i64> {
    let mut id: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"id" {
            id = from_utf8(&attr.value).ok()?.parse().ok()?;
        }
    }

    if id != 0 {
        Some(id)
    } else {
        None
    }
}

fn parse_tag(start: quick_xml::events::BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            b"v" => v = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_nd(start: quick_xml::events::BytesStart<'_>) -> Option<NodeId> {
    let mut ref_: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"ref" => ref_ = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if ref_ != 0 {
        Some(NodeId(ref_))
    } else {
        None
    }
}

fn parse_member(start: quick_xml::events::BytesStart<'_>) -> Option<RelationMember> {
    let mut ref_: i64 = 0;
    let mut type_ = None;
    let mut role = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"ref" => ref_ = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"type" => type_ = Some(parse_feature_type(&attr.value)?),
            b"role" => role = Some(from_utf8(&attr.value).ok()?.to_string()),
            _ => {}
        }
    }

    match (ref_, type_, role) {
        (0, _, _) => None,
        (ref_, Some(type_), Some(role)) => Some(RelationMember { type_, ref_, role }),
        _ => None,
    }
}

fn parse_feature_type(s: &[u8]) -> Option<FeatureType> {
    match s {
        b"node" => Some(FeatureType::Node),
        b"way" => Some(FeatureType::Way),
        b"relation" => Some(FeatureType::Relation),
        _ => None,
    }
}

fn feature_tags<'a>(f: &'a mut Option<model::Feature>) -> Option<&'a mut HashMap<String, String>> {
    match f {
        None => None,
        Some(model::Feature::Node(ref mut n)) => Some(&mut n.tags),
        Some(model::Feature::Way(ref mut w)) => Some(&mut w.tags),
        Some(model::Feature::Relation(ref mut r)) => Some(&mut r.tags),
    }
}

fn feature_nodes<'a>(f: &'a mut Option<model::Feature>) -> Option<&'a mut Vec<NodeId>> {
    match f {
        Some(model::Feature::Way(ref mut w)) => Some(&mut w.nodes),
        _ => None,
    }
}

fn feature_members<'a>(f: &'a mut Option<model::Feature>) -> Option<&'a mut Vec<RelationMember>> {
    match f {
        Some(model::Feature::Relation(ref mut r)) => Some(&mut r.members),
        _ => None,
    }
}
