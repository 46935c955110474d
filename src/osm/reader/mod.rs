// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use crate::builder::OsmData;
use crate::osm::model::{Feature, Node, NodeId, Way};

mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,

    /// Force [OSM PBF](https://wiki.openstreetmap.org/wiki/PBF_Format).
    /// Not supported; reading always fails with [ReadError::UnsupportedPbf].
    Pbf,
}

impl FileFormat {
    /// Guesses the format of a file from its first bytes.
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(&[0x1f, 0x8b]) {
            Self::XmlGz
        } else if head.starts_with(b"BZh") {
            Self::XmlBz2
        } else if head
            .windows(b"OSMHeader".len())
            .take(32)
            .any(|w| w == b"OSMHeader")
        {
            Self::Pbf
        } else {
            Self::Xml
        }
    }
}

/// Additional controls for reading OSM features into [OsmData].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Format of the input data.
    pub file_format: FileFormat,

    /// Filter features by a specific bounding box. In order: left (min lon), bottom (min lat),
    /// right (max lon), top (max lat). Ignored if all values are set to zero, or at least one
    /// of them is not finite.
    pub bbox: [f64; 4],
}

impl Default for Options {
    fn default() -> Self {
        Self {
            file_format: FileFormat::Unknown,
            bbox: [0.0; 4],
        }
    }
}

/// Error conditions which may occur while reading OSM data.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(".osm.pbf files are not supported")]
    UnsupportedPbf,
}

/// Helper object storing state related to loading [features](Feature) into [OsmData].
struct FeatureLoader<'a> {
    data: &'a mut OsmData,
    bbox: Option<[f64; 4]>,
    outside_bbox: HashSet<NodeId>,
}

impl<'a> FeatureLoader<'a> {
    fn new(data: &'a mut OsmData, options: &Options) -> Self {
        let ignore_bbox =
            options.bbox.iter().all(|&x| x == 0.0) || options.bbox.iter().any(|x| !x.is_finite());

        Self {
            data,
            bbox: if ignore_bbox { None } else { Some(options.bbox) },
            outside_bbox: HashSet::default(),
        }
    }

    fn add_features<I, E>(mut self, features: I) -> Result<(), ReadError>
    where
        I: Iterator<Item = Result<Feature, E>>,
        ReadError: From<E>,
    {
        for f in features {
            match f? {
                Feature::Node(n) => self.add_node(n),
                Feature::Way(w) => self.add_way(w),
                Feature::Relation(r) => self.data.load_relation(r),
            }
        }

        let pruned = self.data.prune_unreferenced_nodes();
        log::info!(
            "loaded {} nodes ({} unused dropped), {} ways and {} restrictions",
            self.data.nodes.len(),
            pruned,
            self.data.ways.len(),
            self.data.relations.len(),
        );
        Ok(())
    }

    fn add_node(&mut self, n: Node) {
        if self.is_in_bbox(n.lat, n.lon) {
            self.data.load_node(n);
        } else {
            self.outside_bbox.insert(n.id);
        }
    }

    fn is_in_bbox(&self, lat: f64, lon: f64) -> bool {
        match self.bbox {
            None => true,
            Some([min_lon, min_lat, max_lon, max_lat]) => {
                lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon
            }
        }
    }

    fn add_way(&mut self, mut w: Way) {
        // Remove references to nodes outside of the bounding box
        if !self.outside_bbox.is_empty() {
            w.nodes.retain(|id| !self.outside_bbox.contains(id));
            if w.nodes.len() < 2 {
                log::debug!("{} lies outside of the bounding box", w.id);
                return;
            }
        }
        self.data.load_way(w);
    }
}

/// Parse OSM features from a reader into [OsmData] as per the provided [Options].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn add_features_from_io<R: io::Read>(
    data: &mut OsmData,
    options: &Options,
    reader: R,
) -> Result<(), ReadError> {
    let mut b = io::BufReader::new(reader);

    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(b.fill_buf()?),
        f => f,
    };

    match format {
        FileFormat::Unknown | FileFormat::Xml => {
            FeatureLoader::new(data, options).add_features(xml::Reader::from_io(b))
        }

        FileFormat::XmlGz => {
            let d = io::BufReader::new(flate2::bufread::MultiGzDecoder::new(b));
            FeatureLoader::new(data, options).add_features(xml::Reader::from_io(d))
        }

        FileFormat::XmlBz2 => {
            let d = io::BufReader::new(bzip2::bufread::MultiBzDecoder::new(b));
            FeatureLoader::new(data, options).add_features(xml::Reader::from_io(d))
        }

        FileFormat::Pbf => Err(ReadError::UnsupportedPbf),
    }
}

/// Parse OSM features from a file at the provided path into [OsmData] as per the provided [Options].
pub fn add_features_from_file<P: AsRef<Path>>(
    data: &mut OsmData,
    options: &Options,
    path: P,
) -> Result<(), ReadError> {
    let f = File::open(path)?;
    add_features_from_io(data, options, f)
}

/// Parse OSM features from an in-memory buffer into [OsmData] as per the provided [Options].
pub fn add_features_from_buffer(
    data: &mut OsmData,
    options: &Options,
    buf: &[u8],
) -> Result<(), ReadError> {
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(buf),
        f => f,
    };

    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        FeatureLoader::new(data, options).add_features(xml::Reader::from_buffer(buf))
    } else {
        let options = Options {
            file_format: format,
            ..*options
        };
        add_features_from_io(data, &options, buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::osm::WayId;

    const DATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="1" lat="52.0" lon="21.000" />
  <node id="2" lat="52.0" lon="21.001" />
  <node id="3" lat="52.0" lon="21.002" />
  <node id="4" lat="52.0" lon="21.500" />
  <node id="9" lat="52.0" lon="21.001" />
  <way id="10">
    <nd ref="1" />
    <nd ref="2" />
    <nd ref="3" />
    <tag k="highway" v="residential" />
  </way>
  <way id="11">
    <nd ref="3" />
    <nd ref="4" />
    <tag k="highway" v="residential" />
  </way>
  <relation id="20">
    <member type="way" ref="10" role="from" />
    <member type="node" ref="3" role="via" />
    <member type="way" ref="11" role="to" />
    <tag k="type" v="restriction" />
    <tag k="restriction" v="no_u_turn" />
  </relation>
  <relation id="21">
    <member type="way" ref="10" role="outer" />
    <tag k="type" v="multipolygon" />
  </relation>
</osm>
"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut e = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    fn bzip2(data: &[u8]) -> Vec<u8> {
        let mut e = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        e.write_all(data).unwrap();
        e.finish().unwrap()
    }

    fn check_data(data: &OsmData) {
        // Unused node 9 is dropped
        assert_eq!(
            data.nodes.keys().copied().collect::<Vec<_>>(),
            [NodeId(1), NodeId(2), NodeId(3), NodeId(4)]
        );
        assert_eq!(data.ways.len(), 2);
        assert_eq!(data.ways[&WayId(10)].tag("highway"), Some("residential"));
        assert_eq!(data.relations.len(), 1);
        assert!(data.is_junction(NodeId(3)));
    }

    fn read(buf: &[u8], file_format: FileFormat) -> OsmData {
        let mut data = OsmData::new();
        let options = Options {
            file_format,
            ..Options::default()
        };
        add_features_from_buffer(&mut data, &options, buf).unwrap();
        data
    }

    #[test]
    fn xml() {
        check_data(&read(DATA.as_bytes(), FileFormat::Xml));
    }

    #[test]
    fn xml_gz() {
        check_data(&read(&gzip(DATA.as_bytes()), FileFormat::XmlGz));
    }

    #[test]
    fn xml_bz2() {
        check_data(&read(&bzip2(DATA.as_bytes()), FileFormat::XmlBz2));
    }

    #[test]
    fn detect_format() {
        assert_eq!(FileFormat::detect(DATA.as_bytes()), FileFormat::Xml);
        assert_eq!(FileFormat::detect(&gzip(b"<osm/>")), FileFormat::XmlGz);
        assert_eq!(FileFormat::detect(&bzip2(b"<osm/>")), FileFormat::XmlBz2);
        assert_eq!(
            FileFormat::detect(b"\x00\x00\x00\x0d\x0a\x09OSMHeader\x18"),
            FileFormat::Pbf
        );

        check_data(&read(&gzip(DATA.as_bytes()), FileFormat::Unknown));
        check_data(&read(&bzip2(DATA.as_bytes()), FileFormat::Unknown));
    }

    #[test]
    fn from_io_and_file() {
        let mut data = OsmData::new();
        add_features_from_io(&mut data, &Options::default(), DATA.as_bytes()).unwrap();
        check_data(&data);

        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&gzip(DATA.as_bytes())).unwrap();
        f.flush().unwrap();
        let mut data = OsmData::new();
        add_features_from_file(&mut data, &Options::default(), f.path()).unwrap();
        check_data(&data);
    }

    #[test]
    fn bbox() {
        let mut data = OsmData::new();
        let options = Options {
            file_format: FileFormat::Xml,
            bbox: [20.9, 51.9, 21.1, 52.1],
        };
        add_features_from_buffer(&mut data, &options, DATA.as_bytes()).unwrap();

        assert!(!data.nodes.contains_key(&NodeId(4)));
        assert!(!data.ways.contains_key(&WayId(11)));
        assert_eq!(data.ways[&WayId(10)].nodes.len(), 3);
        assert!(!data.is_junction(NodeId(3)));
    }

    #[test]
    fn pbf_is_unsupported() {
        let mut data = OsmData::new();
        let options = Options {
            file_format: FileFormat::Pbf,
            ..Options::default()
        };
        assert!(matches!(
            add_features_from_buffer(&mut data, &options, b""),
            Err(ReadError::UnsupportedPbf),
        ));
    }

    #[test]
    fn malformed_xml() {
        let mut data = OsmData::new();
        let options = Options {
            file_format: FileFormat::Xml,
            ..Options::default()
        };
        let broken = b"<osm><way id=\"1\"><nd ref=\"1\"/></node></osm>";
        assert!(matches!(
            add_features_from_buffer(&mut data, &options, broken),
            Err(ReadError::Xml(_)),
        ));
    }
}
