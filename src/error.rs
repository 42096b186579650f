use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    // The length of the BlobHeader [..] must be less than 64 KiB.
    // https://wiki.openstreetmap.org/wiki/PBF_Format
    #[error("Invalid Format: The size of the `BlobHeader` is too large ({0} bytes)")]
    BlobHeaderTooLarge(u32),

    // The uncompressed length of a Blob [..] must be less than 32 MiB.
    // https://wiki.openstreetmap.org/wiki/PBF_Format
    #[error("Invalid Format: The size of the `Blob` is out of range ({0} bytes)")]
    BlobDataSize(i64),

    #[error("Invalid Format: stream ended inside a record, expected {expected} bytes but got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Unexpected Blob-Type {0}")]
    UnexpectedBlobType(String),

    #[error("The encoding `{0}` of the Blob is not supported")]
    UnsupportedEncoding(&'static str),

    #[error("The file requires the feature `{0}`, which is not supported")]
    UnsupportedFeature(String),

    #[error("Blob carries no payload")]
    EmptyBlob,

    #[error("Compressed Blob has no declared `raw_size`")]
    MissingRawSize,

    #[error("Decompressed Blob has {actual} bytes, but {expected} were declared")]
    RawSizeMismatch { expected: usize, actual: usize },

    #[error("Blob could not be decompressed: {0}")]
    Decompression(#[source] std::io::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Structural failures inside a decoded block.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error(transparent)]
    Protobuf(#[from] prost::DecodeError),

    #[error(transparent)]
    Utf8(#[from] FromUtf8Error),

    #[error("string table index {index} is out of range (table has {len} entries)")]
    StringIndexOutOfRange { index: i64, len: usize },

    #[error("string table index 0 is reserved")]
    ReservedStringIndex,

    #[error("parallel arrays `{left}` ({left_len}) and `{right}` ({right_len}) differ in length")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    #[error("dense `keys_vals` ended before the tags of node {node} were terminated")]
    UnterminatedDenseTags { node: usize },

    #[error("dense `keys_vals` has {remaining} entries left after the last node")]
    TrailingDenseTags { remaining: usize },

    #[error("unknown relation member type {0}")]
    UnknownMemberType(i32),

    #[error("timestamp {0} ms is out of range")]
    TimestampOutOfRange(i64),
}

/// The failure classes a caller may want to tell apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Io,
    Framing,
    UnsupportedCodec,
    Decompression,
    Schema,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) => ErrorCategory::Io,
            Self::BlobHeaderTooLarge(_)
            | Self::BlobDataSize(_)
            | Self::Truncated { .. }
            | Self::UnexpectedBlobType(_) => ErrorCategory::Framing,
            Self::UnsupportedEncoding(_) | Self::UnsupportedFeature(_) => {
                ErrorCategory::UnsupportedCodec
            }
            Self::EmptyBlob
            | Self::MissingRawSize
            | Self::RawSizeMismatch { .. }
            | Self::Decompression(_) => ErrorCategory::Decompression,
            Self::Schema(_) => ErrorCategory::Schema,
        }
    }
}

impl From<prost::DecodeError> for Error {
    #[inline]
    fn from(e: prost::DecodeError) -> Self {
        Error::Schema(e.into())
    }
}

impl From<FromUtf8Error> for Error {
    #[inline]
    fn from(e: FromUtf8Error) -> Self {
        Error::Schema(e.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
