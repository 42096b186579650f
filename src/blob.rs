use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace, warn};
use prost::bytes::Buf;
use prost::Message;
use std::fs::File;
use std::io::{self, Read};
use std::iter;
use std::marker::PhantomData;
use std::ops::Deref;
use std::path::Path;
use std::str::FromStr;

use crate::compression::{self, MAX_UNCOMPRESSED_DATA_SIZE};
use crate::data::OSMDataBlob;
use crate::error::{Error, Result};
use crate::header::OSMHeaderBlob;
pub use crate::proto::fileformat::{Blob as PbfBlob, BlobHeader as PbfBlobHeader};

const MAX_HEADER_SIZE: u32 = 64 * 1024;

/// A framed `(BlobHeader, Blob)` pair whose payload decodes to `M`.
pub struct Blob<M> {
    header: PbfBlobHeader,
    blob: PbfBlob,
    phantom: PhantomData<M>,
}

impl<M> Blob<M> {
    #[inline]
    pub(crate) const fn new(header: PbfBlobHeader, blob: PbfBlob) -> Self {
        Blob {
            header,
            blob,
            phantom: PhantomData,
        }
    }

    #[inline]
    pub fn blob_type(&self) -> Option<BlobType> {
        self.header.r#type.parse().ok()
    }

    /// Raw payload, inflated if the blob is compressed.
    #[inline]
    pub fn decompress(&self) -> Result<std::borrow::Cow<'_, [u8]>> {
        compression::decompress(&self.blob)
    }
}

pub trait Block: Sized {
    type Message: Message + Default;

    fn from_message(pbf: Self::Message) -> Result<Self>;

    fn decode(buf: impl Buf) -> Result<Self> {
        let msg = Self::Message::decode(buf)?;
        let block = Self::from_message(msg)?;
        Ok(block)
    }
}

impl<M: Block> Blob<M> {
    pub fn decode(&self) -> Result<M> {
        let bytes = self.decompress()?;
        M::decode(&bytes[..])
    }
}

impl<M> Deref for Blob<M> {
    type Target = PbfBlobHeader;
    #[inline]
    fn deref(&self) -> &PbfBlobHeader {
        &self.header
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlobType {
    OSMHeader,
    OSMData,
}

impl BlobType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OSMHeader => "OSMHeader",
            Self::OSMData => "OSMData",
        }
    }
}

impl FromStr for BlobType {
    type Err = ();
    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "OSMHeader" => Self::OSMHeader,
            "OSMData" => Self::OSMData,
            _ => return Err(()),
        })
    }
}

/// Reads the length-prefixed `BlobHeader`/`Blob` frames of a PBF stream.
///
/// Iterating yields the `OSMData` blobs; header blobs and blobs of unknown
/// type are skipped. Iteration ends after the first error, since the stream
/// position is no longer at a frame boundary.
#[derive(Debug)]
pub struct Blobs<R> {
    read: R,
    failed: bool,
}

impl<R> Blobs<R> {
    #[inline]
    fn new(read: R) -> Self {
        Self {
            read,
            failed: false,
        }
    }

    #[inline]
    pub fn into_inner(self) -> R {
        self.read
    }
}

impl<R: AsRef<[u8]>> Blobs<io::Cursor<R>> {
    #[inline]
    pub fn from_bytes(bytes: R) -> Self {
        Self::new(io::Cursor::new(bytes))
    }
}

impl<R: io::Read> Blobs<io::BufReader<R>> {
    #[inline]
    pub fn from_read(read: R) -> Self {
        Self::new(io::BufReader::new(read))
    }
}

impl Blobs<io::BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_read(File::open(path)?))
    }
}

impl<R: io::BufRead> Blobs<R> {
    #[inline]
    pub fn from_buf_read(read: R) -> Self {
        Self::new(read)
    }

    /// Reads the next frame, which must be the `OSMHeader` blob.
    pub fn header(&mut self) -> Result<OSMHeaderBlob> {
        match self.next_blob()? {
            Some((header, blob)) if header.r#type == BlobType::OSMHeader.as_str() => {
                Ok(OSMHeaderBlob::new(header, blob))
            }
            Some((header, _)) => Err(Error::UnexpectedBlobType(header.r#type)),
            None => Err(Error::Truncated {
                expected: 4,
                actual: 0,
            }),
        }
    }

    /// Fills `buf` as far as the stream allows and returns the byte count.
    fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn read_msg_exact<M: Message + Default>(&mut self, exact_size: usize) -> Result<M> {
        let mut bytes = Vec::with_capacity(exact_size);
        let len = self.read.by_ref().take(exact_size as u64).read_to_end(&mut bytes)?;
        if len != exact_size {
            return Err(Error::Truncated {
                expected: exact_size,
                actual: len,
            });
        }
        let msg = M::decode(bytes.as_slice())?;
        Ok(msg)
    }

    /// Reads one frame. `Ok(None)` means the stream ended cleanly at a frame
    /// boundary.
    pub fn next_blob(&mut self) -> Result<Option<(PbfBlobHeader, PbfBlob)>> {
        let mut size_prefix = [0u8; 4];
        let header_size = match self.read_up_to(&mut size_prefix)? {
            0 => return Ok(None), // Expected EOF
            4 => BigEndian::read_u32(&size_prefix),
            actual => return Err(Error::Truncated { expected: 4, actual }),
        };
        if header_size > MAX_HEADER_SIZE {
            return Err(Error::BlobHeaderTooLarge(header_size));
        }

        let header: PbfBlobHeader = self.read_msg_exact(header_size as usize)?;
        if header.datasize < 0 || header.datasize as usize > MAX_UNCOMPRESSED_DATA_SIZE {
            return Err(Error::BlobDataSize(header.datasize as i64));
        }
        trace!(
            "blob frame `{}`: header {} bytes, data {} bytes",
            header.r#type,
            header_size,
            header.datasize
        );

        let blob: PbfBlob = self.read_msg_exact(header.datasize as usize)?;
        Ok(Some((header, blob)))
    }
}

impl<R: io::BufRead> iter::Iterator for Blobs<R> {
    type Item = Result<OSMDataBlob>;

    fn next(&mut self) -> Option<Result<OSMDataBlob>> {
        if self.failed {
            return None;
        }
        loop {
            match self.next_blob() {
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                Ok(None) => {
                    return None;
                }
                Ok(Some((header, blob))) => match header.r#type.parse() {
                    Ok(BlobType::OSMData) => {
                        return Some(Ok(OSMDataBlob::new(header, blob)));
                    }
                    Ok(BlobType::OSMHeader) => {
                        debug!("skipping `OSMHeader` blob");
                    }
                    Err(()) => {
                        warn!("skipping blob of unknown type `{}`", header.r#type);
                    }
                },
            }
        }
    }
}

impl<R: io::BufRead> iter::FusedIterator for Blobs<R> {}
