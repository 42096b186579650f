use std::ops::Deref;

pub use crate::proto::osmformat::Way as PbfWay;

use super::{
    delta::DeltaDecode,
    node::NodeId,
    tags::{self, Tags},
    Info, Location, PrimitiveBlock,
};
use crate::error::SchemaError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WayId(pub i64);

#[derive(Clone, Debug, PartialEq)]
pub struct Way {
    /// `-1` when the source carried no id.
    pub id: WayId,
    pub tags: Tags,
    pub info: Info,
    /// Referenced nodes in file order, neither deduplicated nor checked for
    /// existence.
    pub node_refs: Vec<NodeId>,
    /// Node positions parallel to `node_refs`, present only in files written
    /// with the `LocationsOnWays` feature.
    pub locations: Option<Vec<Location>>,
}

impl Deref for Way {
    type Target = Info;
    #[inline]
    fn deref(&self) -> &Info {
        &self.info
    }
}

impl Way {
    pub(crate) fn from_pbf(w: &PbfWay, block: &PrimitiveBlock) -> Result<Self, SchemaError> {
        let node_refs = w
            .refs
            .iter()
            .copied()
            .delta_decoded()
            .map(NodeId)
            .collect::<Vec<_>>();
        let locations = if w.lat.is_empty() && w.lon.is_empty() {
            None
        } else {
            for (name, len) in [("lat", w.lat.len()), ("lon", w.lon.len())] {
                if len != node_refs.len() {
                    return Err(SchemaError::LengthMismatch {
                        left: "refs",
                        left_len: node_refs.len(),
                        right: name,
                        right_len: len,
                    });
                }
            }
            let lats = w.lat.iter().copied().delta_decoded();
            let lons = w.lon.iter().copied().delta_decoded();
            Some(
                lats.zip(lons)
                    .map(|(lat, lon)| {
                        Location::from_nano(block.offset.nano_lat(lat), block.offset.nano_lon(lon))
                    })
                    .collect(),
            )
        };
        Ok(Self {
            id: WayId(w.id.unwrap_or(-1)),
            tags: tags::from_parallel(&block.strings, &w.keys, &w.vals)?,
            info: Info::from_pbf(w.info.as_ref(), block)?,
            node_refs,
            locations,
        })
    }
}
