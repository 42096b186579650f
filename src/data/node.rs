use std::ops::Deref;

pub use crate::proto::osmformat::{
    DenseInfo as PbfDenseInfo, DenseNodes as PbfDenseNodes, Node as PbfNode,
};

use super::{
    delta::Delta,
    tags::{self, DenseTagCursor, Tags},
    Info, Location, PrimitiveBlock,
};
use crate::error::SchemaError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub i64);

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// `-1` when the source carried no id.
    pub id: NodeId,
    /// Latitude in nanodegrees
    pub nano_lat: i64,
    /// Longitude in nanodegrees
    pub nano_lon: i64,
    pub tags: Tags,
    pub info: Info,
}

impl Deref for Node {
    type Target = Info;
    #[inline]
    fn deref(&self) -> &Info {
        &self.info
    }
}

impl Node {
    pub(super) fn from_pbf(n: &PbfNode, block: &PrimitiveBlock) -> Result<Self, SchemaError> {
        Ok(Self {
            id: NodeId(n.id.unwrap_or(-1)),
            nano_lat: block.offset.nano_lat(n.lat),
            nano_lon: block.offset.nano_lon(n.lon),
            tags: tags::from_parallel(&block.strings, &n.keys, &n.vals)?,
            info: Info::from_pbf(n.info.as_ref(), block)?,
        })
    }

    /// Expands the node at `pos` of a dense group. Must be called for every
    /// position in order, starting at 0 with a fresh `state`.
    pub(super) fn from_pbf_dense(
        dense: &PbfDenseNodes,
        pos: usize,
        state: &mut DenseState,
        block: &PrimitiveBlock,
    ) -> Result<Self, SchemaError> {
        let id = match dense.id.get(pos) {
            Some(&delta) => state.id.next(delta),
            None => -1,
        };
        let lat = state.lat.next(dense.lat[pos]);
        let lon = state.lon.next(dense.lon[pos]);
        let tags = state
            .tags
            .next_node(&block.strings, &dense.keys_vals, pos)?;
        let info = match &dense.denseinfo {
            Some(info) => state.info(info, pos, block)?,
            None => Info::default(),
        };
        Ok(Self {
            id: NodeId(id),
            nano_lat: block.offset.nano_lat(lat),
            nano_lon: block.offset.nano_lon(lon),
            tags,
            info,
        })
    }

    /// Latitude in degrees.
    #[inline(always)]
    pub fn lat(&self) -> f64 {
        self.nano_lat as f64 * 1e-9
    }
    /// Longitude in degrees.
    #[inline(always)]
    pub fn lon(&self) -> f64 {
        self.nano_lon as f64 * 1e-9
    }

    #[inline]
    pub fn location(&self) -> Location {
        Location::from_nano(self.nano_lat, self.nano_lon)
    }
}

/// Accumulators of one `DenseNodes` group.
#[derive(Clone, Debug, Default)]
pub(crate) struct DenseState {
    id: Delta,
    lat: Delta,
    lon: Delta,
    timestamp: Delta,
    changeset: Delta,
    uid: Delta,
    user_sid: Delta,
    tags: DenseTagCursor,
}

impl DenseState {
    fn info(
        &mut self,
        info: &PbfDenseInfo,
        pos: usize,
        block: &PrimitiveBlock,
    ) -> Result<Info, SchemaError> {
        let timestamp = match info.timestamp.get(pos) {
            Some(&delta) => Some(block.timestamp(self.timestamp.next(delta))?),
            None => None,
        };
        let user_sid = info
            .user_sid
            .get(pos)
            .map(|&delta| self.user_sid.next(delta.into()));
        Ok(Info {
            version: info.version.get(pos).copied(),
            timestamp,
            changeset: info.changeset.get(pos).map(|&d| self.changeset.next(d)),
            uid: info.uid.get(pos).map(|&d| self.uid.next(d.into()) as i32),
            user: block.user(user_sid)?,
            visible: info.visible.get(pos).copied(),
        })
    }

    /// Checks that no entries of `keys_vals` are left over.
    pub(crate) fn finish(&self, dense: &PbfDenseNodes) -> Result<(), SchemaError> {
        self.tags.finish(&dense.keys_vals)
    }
}

/// Number of nodes in a dense group, after checking that the columns line
/// up. An empty `id` column means the ids are absent and the count follows
/// `lat`.
pub(crate) fn dense_len(dense: &PbfDenseNodes) -> Result<usize, SchemaError> {
    let (len, name) = if dense.id.is_empty() {
        (dense.lat.len(), "lat")
    } else {
        (dense.id.len(), "id")
    };
    let column = |right: &'static str, right_len: usize, optional: bool| {
        if right_len == len || (optional && right_len == 0) {
            Ok(())
        } else {
            Err(SchemaError::LengthMismatch {
                left: name,
                left_len: len,
                right,
                right_len,
            })
        }
    };
    column("lat", dense.lat.len(), false)?;
    column("lon", dense.lon.len(), false)?;
    if let Some(info) = &dense.denseinfo {
        column("denseinfo.version", info.version.len(), true)?;
        column("denseinfo.timestamp", info.timestamp.len(), true)?;
        column("denseinfo.changeset", info.changeset.len(), true)?;
        column("denseinfo.uid", info.uid.len(), true)?;
        column("denseinfo.user_sid", info.user_sid.len(), true)?;
        column("denseinfo.visible", info.visible.len(), true)?;
    }
    Ok(len)
}
