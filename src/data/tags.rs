use indexmap::IndexMap;

use super::strings::StringTable;
use crate::error::SchemaError;

/// Tags of a feature, in encoded order.
pub type Tags = IndexMap<String, String>;

/// Zips the parallel `keys`/`vals` arrays of a node, way or relation.
pub(crate) fn from_parallel(
    strings: &StringTable,
    keys: &[u32],
    vals: &[u32],
) -> Result<Tags, SchemaError> {
    if keys.len() != vals.len() {
        return Err(SchemaError::LengthMismatch {
            left: "keys",
            left_len: keys.len(),
            right: "vals",
            right_len: vals.len(),
        });
    }
    keys.iter()
        .zip(vals)
        .map(|(&k, &v)| -> Result<(String, String), SchemaError> {
            Ok((
                strings.get(k.into())?.to_owned(),
                strings.get(v.into())?.to_owned(),
            ))
        })
        .collect()
}

/// Cursor over the `keys_vals` array of a `DenseNodes` group.
///
/// Each node owns `key, val, key, val, ..., 0`; a node without tags owns a
/// lone `0`. An entirely empty array means no node in the group has tags.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct DenseTagCursor {
    pos: usize,
}

impl DenseTagCursor {
    /// Decodes the tag block of the next node.
    pub(crate) fn next_node(
        &mut self,
        strings: &StringTable,
        keys_vals: &[i32],
        node: usize,
    ) -> Result<Tags, SchemaError> {
        let mut tags = Tags::new();
        if keys_vals.is_empty() {
            return Ok(tags);
        }
        loop {
            match keys_vals.get(self.pos..) {
                Some([0, ..]) => {
                    self.pos += 1;
                    return Ok(tags);
                }
                Some([k, v, ..]) => {
                    tags.insert(
                        strings.get((*k).into())?.to_owned(),
                        strings.get((*v).into())?.to_owned(),
                    );
                    self.pos += 2;
                }
                _ => return Err(SchemaError::UnterminatedDenseTags { node }),
            }
        }
    }

    /// Checks that every entry was consumed once the group is exhausted.
    pub(crate) fn finish(&self, keys_vals: &[i32]) -> Result<(), SchemaError> {
        match keys_vals.len().saturating_sub(self.pos) {
            0 => Ok(()),
            remaining => Err(SchemaError::TrailingDenseTags { remaining }),
        }
    }
}
