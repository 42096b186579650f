use bitflags::bitflags;

use super::{
    node::{self, DenseState, Node, PbfDenseNodes},
    relation::Relation,
    tags::Tags,
    way::Way,
    Info, PrimitiveBlock,
};
use crate::error::Result;

bitflags! {
    /// Which feature kinds a stream yields.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct FeatureTypes: u32 {
        const NODE = 1;
        const WAY = 2;
        const RELATION = 4;

        const ALL = Self::NODE.bits() | Self::WAY.bits() | Self::RELATION.bits();
    }
}

impl Default for FeatureTypes {
    #[inline]
    fn default() -> Self {
        Self::ALL
    }
}

/// A decoded OSM feature.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Feature {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Feature {
    pub fn id(&self) -> i64 {
        match self {
            Self::Node(n) => n.id.0,
            Self::Way(w) => w.id.0,
            Self::Relation(r) => r.id.0,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            Self::Node(n) => &n.tags,
            Self::Way(w) => &w.tags,
            Self::Relation(r) => &r.tags,
        }
    }

    pub fn info(&self) -> &Info {
        match self {
            Self::Node(n) => &n.info,
            Self::Way(w) => &w.info,
            Self::Relation(r) => &r.info,
        }
    }

    pub fn kind(&self) -> FeatureTypes {
        match self {
            Self::Node(_) => FeatureTypes::NODE,
            Self::Way(_) => FeatureTypes::WAY,
            Self::Relation(_) => FeatureTypes::RELATION,
        }
    }
}

/// Where iteration stands inside one block.
#[derive(Clone, Debug, Default)]
pub(crate) struct Cursor {
    group_pos: usize,
    prim_pos: usize,
    dense_len: Option<usize>,
    dense_state: DenseState,
}

impl Cursor {
    fn next_group(&mut self) {
        *self = Self {
            group_pos: self.group_pos + 1,
            ..Self::default()
        };
    }
}

impl PrimitiveBlock {
    /// Iterates the features of all groups in file order.
    pub fn features(&self) -> Features<'_> {
        Features {
            block: self,
            filter: FeatureTypes::ALL,
            cursor: Cursor::default(),
            failed: false,
        }
    }

    /// Produces the feature under `cursor` and advances it. Groups are visited
    /// in order and each group in its encoded order; groups of filtered kinds
    /// and changeset groups are skipped whole.
    pub(crate) fn next_feature(
        &self,
        cursor: &mut Cursor,
        filter: FeatureTypes,
    ) -> Option<Result<Feature>> {
        loop {
            let group = self.primitive_groups.get(cursor.group_pos)?;
            let pos = cursor.prim_pos;
            let item = if !group.nodes.is_empty() {
                match group.nodes.get(pos) {
                    Some(n) if filter.contains(FeatureTypes::NODE) => {
                        Some(Node::from_pbf(n, self).map(Feature::Node))
                    }
                    _ => None,
                }
            } else if let Some(dense) = &group.dense {
                if filter.contains(FeatureTypes::NODE) {
                    self.next_dense(dense, cursor)
                } else {
                    None
                }
            } else if !group.ways.is_empty() {
                match group.ways.get(pos) {
                    Some(w) if filter.contains(FeatureTypes::WAY) => {
                        Some(Way::from_pbf(w, self).map(Feature::Way))
                    }
                    _ => None,
                }
            } else {
                match group.relations.get(pos) {
                    Some(r) if filter.contains(FeatureTypes::RELATION) => {
                        Some(Relation::from_pbf(r, self).map(Feature::Relation))
                    }
                    _ => None,
                }
            };
            match item {
                Some(item) => {
                    cursor.prim_pos += 1;
                    return Some(item.map_err(Into::into));
                }
                None => cursor.next_group(),
            }
        }
    }

    fn next_dense(
        &self,
        dense: &PbfDenseNodes,
        cursor: &mut Cursor,
    ) -> Option<Result<Feature, crate::error::SchemaError>> {
        let len = match cursor.dense_len {
            Some(len) => len,
            None => match node::dense_len(dense) {
                Ok(len) => *cursor.dense_len.insert(len),
                Err(e) => return Some(Err(e)),
            },
        };
        if cursor.prim_pos < len {
            let node = Node::from_pbf_dense(dense, cursor.prim_pos, &mut cursor.dense_state, self);
            return Some(node.map(Feature::Node));
        }
        // exhausted: the tag cursor must have consumed everything
        cursor.dense_state.finish(dense).err().map(Err)
    }
}

/// Borrowing iterator over the features of one [`PrimitiveBlock`].
///
/// Stops after the first error.
pub struct Features<'l> {
    block: &'l PrimitiveBlock,
    filter: FeatureTypes,
    cursor: Cursor,
    failed: bool,
}

impl<'l> Features<'l> {
    #[inline]
    pub fn types(mut self, types: FeatureTypes) -> Self {
        self.filter = types;
        self
    }
}

impl Iterator for Features<'_> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.block.next_feature(&mut self.cursor, self.filter)?;
        self.failed = item.is_err();
        Some(item)
    }
}

impl std::iter::FusedIterator for Features<'_> {}
