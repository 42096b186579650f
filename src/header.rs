use std::ops::Deref;

use chrono::{DateTime, Utc};
use log::debug;

pub use crate::proto::osmformat::{HeaderBBox as PbfHeaderBBox, HeaderBlock as PbfHeaderBlock};
use crate::{
    blob::Block,
    error::{Error, Result},
};

// REQUIRED FEATURES
pub const OSM_SCHEMA_V06: &str = "OsmSchema-V0.6";
pub const DENSE_NODES: &str = "DenseNodes";
pub const HISTORICAL_INFORMATION: &str = "HistoricalInformation";

/// Required features this decoder understands.
pub const SUPPORTED_FEATURES: [&str; 3] = [OSM_SCHEMA_V06, DENSE_NODES, HISTORICAL_INFORMATION];

// OPTIONAL FEATURES
pub const HAS_METADATA: &str = "Has_Metadata";
pub const SORT_TYPE_THEN_ID: &str = "Sort.Type_then_ID";
pub const SORT_GEOGRAPHIC: &str = "Sort.Geographic";
pub const LOCATIONS_ON_WAYS: &str = "LocationsOnWays";

/// Bounding box in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl From<&PbfHeaderBBox> for BBox {
    fn from(b: &PbfHeaderBBox) -> Self {
        Self {
            left: b.left as f64 * 1e-9,
            right: b.right as f64 * 1e-9,
            top: b.top as f64 * 1e-9,
            bottom: b.bottom as f64 * 1e-9,
        }
    }
}

pub struct HeaderBlock {
    pbf: PbfHeaderBlock,
}

impl HeaderBlock {
    pub fn bbox(&self) -> Option<BBox> {
        self.pbf.bbox.as_ref().map(BBox::from)
    }

    pub fn required_features(&self) -> &[String] {
        &self.pbf.required_features
    }

    pub fn optional_features(&self) -> &[String] {
        &self.pbf.optional_features
    }

    pub fn has_optional_feature(&self, feature: &str) -> bool {
        self.pbf.optional_features.iter().any(|f| f == feature)
    }

    pub fn writing_program(&self) -> Option<&str> {
        self.pbf.writingprogram.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.pbf.source.as_deref()
    }

    /// Replication timestamp; stored in seconds since the epoch.
    pub fn replication_timestamp(&self) -> Option<DateTime<Utc>> {
        self.pbf
            .osmosis_replication_timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn replication_sequence_number(&self) -> Option<i64> {
        self.pbf.osmosis_replication_sequence_number
    }

    pub fn replication_base_url(&self) -> Option<&str> {
        self.pbf.osmosis_replication_base_url.as_deref()
    }
}

/// Fails on the first required feature outside of [`SUPPORTED_FEATURES`].
pub fn check_required_features<S: AsRef<str>>(features: &[S]) -> Result<()> {
    match features
        .iter()
        .map(AsRef::as_ref)
        .find(|f| !SUPPORTED_FEATURES.contains(f))
    {
        Some(unknown) => Err(Error::UnsupportedFeature(unknown.to_string())),
        None => Ok(()),
    }
}

impl Deref for HeaderBlock {
    type Target = PbfHeaderBlock;
    #[inline]
    fn deref(&self) -> &PbfHeaderBlock {
        &self.pbf
    }
}

impl Block for HeaderBlock {
    type Message = PbfHeaderBlock;

    fn from_message(pbf: PbfHeaderBlock) -> Result<Self> {
        check_required_features(&pbf.required_features)?;
        debug!(
            "accepted header: required {:?}, optional {:?}, written by {:?}",
            pbf.required_features, pbf.optional_features, pbf.writingprogram
        );
        Ok(Self { pbf })
    }
}

pub type OSMHeaderBlob = crate::blob::Blob<HeaderBlock>;

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn known_features_are_accepted() {
        assert!(check_required_features(&SUPPORTED_FEATURES).is_ok());
        assert!(check_required_features::<&str>(&[]).is_ok());
    }

    #[test]
    fn unknown_required_feature_fails_fast() {
        let err = check_required_features(&[OSM_SCHEMA_V06, LOCATIONS_ON_WAYS]).unwrap_err();
        assert!(matches!(&err, Error::UnsupportedFeature(f) if f == LOCATIONS_ON_WAYS));
        assert_eq!(err.category(), ErrorCategory::UnsupportedCodec);
    }

    #[test]
    fn header_block_accessors() {
        let pbf = PbfHeaderBlock {
            bbox: Some(PbfHeaderBBox {
                left: 13_000_000_000,
                right: 14_500_000_000,
                top: 52_750_000_000,
                bottom: 52_250_000_000,
            }),
            required_features: vec![OSM_SCHEMA_V06.into(), DENSE_NODES.into()],
            optional_features: vec![SORT_TYPE_THEN_ID.into()],
            writingprogram: Some("osmium/1.16".into()),
            source: None,
            osmosis_replication_timestamp: Some(1_581_685_275),
            osmosis_replication_sequence_number: Some(4242),
            osmosis_replication_base_url: None,
        };
        let header = HeaderBlock::decode(pbf.encode_to_vec().as_slice()).unwrap();

        let bbox = header.bbox().unwrap();
        assert!((bbox.left - 13.0).abs() < 1e-9);
        assert!((bbox.top - 52.75).abs() < 1e-9);
        assert!(header.has_optional_feature(SORT_TYPE_THEN_ID));
        assert!(!header.has_optional_feature(LOCATIONS_ON_WAYS));
        assert_eq!(header.writing_program(), Some("osmium/1.16"));
        assert_eq!(header.source(), None);
        assert_eq!(
            header.replication_timestamp().unwrap().to_rfc3339(),
            "2020-02-14T13:01:15+00:00"
        );
        assert_eq!(header.replication_sequence_number(), Some(4242));
    }
}
