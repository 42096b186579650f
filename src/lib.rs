//! Streaming decoder for OpenStreetMap PBF files.
//!
//! A PBF file is a sequence of length-prefixed blobs. The first one carries
//! the [`HeaderBlock`](header::HeaderBlock), every following `OSMData` blob a
//! [`PrimitiveBlock`](data::PrimitiveBlock) holding a string table and groups
//! of dense nodes, nodes, ways or relations. [`FeatureStream`] walks the file
//! one block at a time and yields each of them as an owned [`Feature`].
//!
//! ```no_run
//! use osm_feature_stream::{Feature, FeatureStream};
//!
//! # fn main() -> osm_feature_stream::Result<()> {
//! let mut ways = 0;
//! for feature in FeatureStream::open("berlin.osm.pbf")? {
//!     if let Feature::Way(way) = feature? {
//!         ways += 1;
//!         println!("{:?}: {} nodes", way.id, way.node_refs.len());
//!     }
//! }
//! println!("{ways} ways");
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod compression;
pub mod data;
pub mod error;
pub mod header;
pub mod proto;
pub mod stream;

pub use blob::{BlobType, Blobs};
pub use data::{
    node::{Node, NodeId},
    primitive::{Feature, FeatureTypes},
    relation::{Member, MemberType, Relation, RelationId},
    tags::Tags,
    way::{Way, WayId},
    Info, Location,
};
pub use error::{Error, ErrorCategory, Result, SchemaError};
pub use stream::FeatureStream;
