use std::ops::Deref;

use crate::error::SchemaError;
use crate::proto::osmformat::StringTable as PbfStringTable;

/// The interned strings of one `PrimitiveBlock`, decoded to UTF-8 up front.
///
/// Index 0 is reserved by the format and never names a real string.
#[derive(Clone, Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub(crate) fn from_pbf(pbf: PbfStringTable) -> Result<Self, SchemaError> {
        let strings = pbf
            .s
            .into_iter()
            .map(String::from_utf8)
            .collect::<Result<Vec<String>, _>>()?;
        Ok(Self { strings })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Resolves a string reference. Index 0 and indices past the end are
    /// errors.
    #[inline]
    pub fn get(&self, index: i64) -> Result<&str, SchemaError> {
        if index == 0 {
            return Err(SchemaError::ReservedStringIndex);
        }
        self.lookup(index)
    }

    /// Like [`get`](Self::get), but index 0 resolves to the empty string.
    #[inline]
    pub fn get_or_empty(&self, index: i64) -> Result<&str, SchemaError> {
        if index == 0 {
            return Ok("");
        }
        self.lookup(index)
    }

    fn lookup(&self, index: i64) -> Result<&str, SchemaError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(Deref::deref)
            .ok_or(SchemaError::StringIndexOutOfRange {
                index,
                len: self.strings.len(),
            })
    }
}
