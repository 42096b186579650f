use std::ops::Deref;

pub use crate::proto::osmformat::Relation as PbfRelation;

use super::{
    delta::DeltaDecode,
    tags::{self, Tags},
    Info, PrimitiveBlock,
};
use crate::error::SchemaError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationId(pub i64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl MemberType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl TryFrom<i32> for MemberType {
    type Error = SchemaError;
    #[inline]
    fn try_from(value: i32) -> Result<Self, SchemaError> {
        match value {
            0 => Ok(Self::Node),
            1 => Ok(Self::Way),
            2 => Ok(Self::Relation),
            other => Err(SchemaError::UnknownMemberType(other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Member {
    pub member_type: MemberType,
    /// Id of the referenced feature; not checked for existence.
    pub id: i64,
    /// Empty when the member has no role.
    pub role: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    /// `-1` when the source carried no id.
    pub id: RelationId,
    pub tags: Tags,
    pub info: Info,
    pub members: Vec<Member>,
}

impl Deref for Relation {
    type Target = Info;
    #[inline]
    fn deref(&self) -> &Info {
        &self.info
    }
}

impl Relation {
    pub(crate) fn from_pbf(r: &PbfRelation, block: &PrimitiveBlock) -> Result<Self, SchemaError> {
        for (name, len) in [("roles_sid", r.roles_sid.len()), ("types", r.types.len())] {
            if len != r.memids.len() {
                return Err(SchemaError::LengthMismatch {
                    left: "memids",
                    left_len: r.memids.len(),
                    right: name,
                    right_len: len,
                });
            }
        }
        let members = r
            .memids
            .iter()
            .copied()
            .delta_decoded()
            .zip(&r.types)
            .zip(&r.roles_sid)
            .map(|((id, &member_type), &role)| -> Result<Member, SchemaError> {
                Ok(Member {
                    member_type: MemberType::try_from(member_type)?,
                    id,
                    role: block.strings.get_or_empty(role.into())?.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: RelationId(r.id.unwrap_or(-1)),
            tags: tags::from_parallel(&block.strings, &r.keys, &r.vals)?,
            info: Info::from_pbf(r.info.as_ref(), block)?,
            members,
        })
    }
}
