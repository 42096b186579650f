use std::borrow::Cow;
#[cfg(any(feature = "zlib", feature = "lzma", feature = "zstd"))]
use std::io::Read;

use crate::error::{Error, Result};
use crate::proto::fileformat::{blob::Data, Blob as PbfBlob};

// The uncompressed length of a Blob [..] must be less than 32 MiB.
pub(crate) const MAX_UNCOMPRESSED_DATA_SIZE: usize = 32 * 1024 * 1024;

/// Compressed payload variants of a `Blob`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    Zlib,
    Lzma,
    Zstd,
    Lz4,
    /// `OBSOLETE_bzip2_data`, never supported.
    Bzip2,
}

impl Compression {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zlib => "zlib",
            Self::Lzma => "lzma",
            Self::Zstd => "zstd",
            Self::Lz4 => "lz4",
            Self::Bzip2 => "bzip2",
        }
    }

    /// Whether this build can decode the variant.
    pub const fn is_supported(self) -> bool {
        match self {
            Self::Zlib => cfg!(feature = "zlib"),
            Self::Lzma => cfg!(feature = "lzma"),
            Self::Zstd => cfg!(feature = "zstd"),
            Self::Lz4 => cfg!(feature = "lz4"),
            Self::Bzip2 => false,
        }
    }

    /// Inflates `data`, reading at most one byte past `raw_size` so an
    /// oversized stream is noticed without being buffered whole.
    pub fn inflate(self, data: &[u8], raw_size: usize) -> Result<Vec<u8>> {
        match self {
            #[cfg(feature = "zlib")]
            Self::Zlib => read_limited(flate2::bufread::ZlibDecoder::new(data), raw_size),
            #[cfg(feature = "lzma")]
            Self::Lzma => {
                // accepts both the xz container and legacy `.lzma` streams
                let stream = xz2::stream::Stream::new_auto_decoder(u64::MAX, 0)
                    .map_err(|e| Error::Decompression(e.into()))?;
                read_limited(xz2::bufread::XzDecoder::new_stream(data, stream), raw_size)
            }
            #[cfg(feature = "zstd")]
            Self::Zstd => {
                let decoder =
                    zstd::stream::read::Decoder::with_buffer(data).map_err(Error::Decompression)?;
                read_limited(decoder, raw_size)
            }
            #[cfg(feature = "lz4")]
            Self::Lz4 => {
                lz4::block::decompress(data, Some(raw_size as i32)).map_err(Error::Decompression)
            }
            _ => {
                let _ = (data, raw_size);
                Err(Error::UnsupportedEncoding(self.name()))
            }
        }
    }
}

#[cfg(any(feature = "zlib", feature = "lzma", feature = "zstd"))]
fn read_limited(reader: impl Read, raw_size: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(raw_size);
    reader
        .take(raw_size as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(Error::Decompression)?;
    Ok(bytes)
}

/// Returns the raw payload of `blob`, inflating it when it is compressed.
///
/// The inflated length must equal the declared `raw_size`.
pub fn decompress(blob: &PbfBlob) -> Result<Cow<'_, [u8]>> {
    let (compression, data) = match &blob.data {
        Some(Data::Raw(bytes)) => {
            if bytes.len() > MAX_UNCOMPRESSED_DATA_SIZE {
                return Err(Error::BlobDataSize(bytes.len() as i64));
            }
            return Ok(Cow::Borrowed(bytes.as_slice()));
        }
        Some(Data::ZlibData(bytes)) => (Compression::Zlib, bytes),
        Some(Data::LzmaData(bytes)) => (Compression::Lzma, bytes),
        Some(Data::ObsoleteBzip2Data(bytes)) => (Compression::Bzip2, bytes),
        Some(Data::Lz4Data(bytes)) => (Compression::Lz4, bytes),
        Some(Data::ZstdData(bytes)) => (Compression::Zstd, bytes),
        None => return Err(Error::EmptyBlob),
    };
    if !compression.is_supported() {
        return Err(Error::UnsupportedEncoding(compression.name()));
    }
    let raw_size = blob.raw_size.ok_or(Error::MissingRawSize)?;
    if raw_size < 0 || raw_size as usize > MAX_UNCOMPRESSED_DATA_SIZE {
        return Err(Error::BlobDataSize(raw_size as i64));
    }
    let raw_size = raw_size as usize;
    let bytes = compression.inflate(data, raw_size)?;
    if bytes.len() != raw_size {
        return Err(Error::RawSizeMismatch {
            expected: raw_size,
            actual: bytes.len(),
        });
    }
    Ok(Cow::Owned(bytes))
}
