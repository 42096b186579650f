use chrono::{DateTime, Utc};
use log::debug;

use crate::{
    blob::Block,
    error::{Result, SchemaError},
};

pub use crate::proto::osmformat::{
    Info as PbfInfo, PrimitiveBlock as PbfPrimitiveBlock, PrimitiveGroup as PbfPrimitiveGroup,
};

pub mod delta;
pub mod node;
pub mod primitive;
pub mod relation;
pub mod strings;
pub mod tags;
pub mod way;

use self::strings::StringTable;

/// Metadata shared by all features. Every field is `None` when the source
/// did not carry it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Info {
    pub version: Option<i32>,
    pub timestamp: Option<DateTime<Utc>>,
    pub changeset: Option<i64>,
    pub uid: Option<i32>,
    pub user: Option<String>,
    pub visible: Option<bool>,
}

impl Info {
    fn from_pbf(info: Option<&PbfInfo>, block: &PrimitiveBlock) -> Result<Self, SchemaError> {
        let Some(info) = info else {
            return Ok(Self::default());
        };
        Ok(Self {
            version: info.version,
            timestamp: info.timestamp.map(|t| block.timestamp(t)).transpose()?,
            changeset: info.changeset,
            uid: info.uid,
            user: block.user(info.user_sid.map(i64::from))?,
            visible: info.visible,
        })
    }
}

/// A position in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    #[inline]
    pub(crate) fn from_nano(nano_lat: i64, nano_lon: i64) -> Self {
        Self {
            lat: nano_lat as f64 * 1e-9,
            lon: nano_lon as f64 * 1e-9,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Offset {
    lat: i64,
    lon: i64,
    granularity: i32,
}

impl Offset {
    /// Nanodegrees of a stored (already accumulated) latitude.
    #[inline]
    pub(crate) fn nano_lat(&self, lat: i64) -> i64 {
        self.lat.wrapping_add(lat.wrapping_mul(self.granularity as i64))
    }

    #[inline]
    pub(crate) fn nano_lon(&self, lon: i64) -> i64 {
        self.lon.wrapping_add(lon.wrapping_mul(self.granularity as i64))
    }
}

/// A decoded `PrimitiveBlock`: string table, coordinate frame and groups.
///
/// Lives for one iteration step of the stream; features borrow nothing from
/// it once produced.
#[derive(Clone)]
pub struct PrimitiveBlock {
    strings: StringTable,
    primitive_groups: Vec<PbfPrimitiveGroup>,
    offset: Offset,
    date_granularity: i32,
}

impl PrimitiveBlock {
    #[inline]
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    #[inline]
    pub fn granularity(&self) -> i32 {
        self.offset.granularity
    }

    #[inline]
    pub fn date_granularity(&self) -> i32 {
        self.date_granularity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.primitive_groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitive_groups.is_empty()
    }

    /// Converts an accumulated timestamp into an instant at UTC.
    pub(crate) fn timestamp(&self, raw: i64) -> Result<DateTime<Utc>, SchemaError> {
        let millis = raw
            .checked_mul(self.date_granularity as i64)
            .ok_or(SchemaError::TimestampOutOfRange(raw))?;
        DateTime::from_timestamp_millis(millis).ok_or(SchemaError::TimestampOutOfRange(millis))
    }

    /// User names use string index 0 for "no name".
    pub(crate) fn user(&self, sid: Option<i64>) -> Result<Option<String>, SchemaError> {
        match sid {
            None | Some(0) => Ok(None),
            Some(sid) => self.strings.get(sid).map(|s| Some(s.to_owned())),
        }
    }
}

impl Block for PrimitiveBlock {
    type Message = PbfPrimitiveBlock;

    fn from_message(pbf: PbfPrimitiveBlock) -> Result<Self> {
        let granularity = pbf.granularity();
        let date_granularity = pbf.date_granularity();
        let lat = pbf.lat_offset();
        let lon = pbf.lon_offset();
        let strings = StringTable::from_pbf(pbf.stringtable)?;
        debug!(
            "decoded block: {} groups, {} strings, granularity {}",
            pbf.primitivegroup.len(),
            strings.len(),
            granularity
        );
        Ok(Self {
            strings,
            offset: Offset {
                lat,
                lon,
                granularity,
            },
            date_granularity,
            primitive_groups: pbf.primitivegroup,
        })
    }
}

pub type OSMDataBlob = crate::blob::Blob<PrimitiveBlock>;


#[cfg(test)]
mod tests {
    use super::test_util::block;
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let b = PrimitiveBlock::from_message(block(&[], vec![])).unwrap();
        assert_eq!(b.granularity(), 100);
        assert_eq!(b.date_granularity(), 1000);
        assert!(b.is_empty());
    }

    #[test]
    fn timestamps_scale_with_date_granularity() {
        let mut pbf = block(&[], vec![]);
        pbf.date_granularity = Some(1000);
        let b = PrimitiveBlock::from_message(pbf).unwrap();
        assert_eq!(
            b.timestamp(1_581_685_275).unwrap().to_rfc3339(),
            "2020-02-14T13:01:15+00:00"
        );
        assert!(matches!(
            b.timestamp(i64::MAX),
            Err(SchemaError::TimestampOutOfRange(_))
        ));
    }

    #[test]
    fn user_sid_zero_means_no_user() {
        let b = PrimitiveBlock::from_message(block(&["alice"], vec![])).unwrap();
        assert_eq!(b.user(None).unwrap(), None);
        assert_eq!(b.user(Some(0)).unwrap(), None);
        assert_eq!(b.user(Some(1)).unwrap().as_deref(), Some("alice"));
        assert!(b.user(Some(2)).is_err());
    }

    #[test]
    fn invalid_utf8_in_string_table() {
        let mut pbf = block(&[], vec![]);
        pbf.stringtable.s.push(vec![0xff, 0xfe]);
        assert!(PrimitiveBlock::from_message(pbf).is_err());
    }
}
