use std::fs::File;
use std::io;
use std::iter::FusedIterator;
use std::path::Path;

use log::debug;

use crate::blob::Blobs;
use crate::data::primitive::{Cursor, Feature, FeatureTypes};
use crate::data::PrimitiveBlock;
use crate::error::Result;
use crate::header::HeaderBlock;

enum State {
    Start,
    Between,
    Block(Box<PrimitiveBlock>, Cursor),
    Done,
}

/// Lazy, single pass sequence of all features of a PBF stream.
///
/// Features come out in block order, then group order, then the encoded order
/// inside each group. Only the current block is held in memory. The first
/// error ends the stream.
pub struct FeatureStream<R> {
    blobs: Blobs<R>,
    filter: FeatureTypes,
    require_header: bool,
    header: Option<HeaderBlock>,
    state: State,
}

impl<R: AsRef<[u8]>> FeatureStream<io::Cursor<R>> {
    #[inline]
    pub fn from_bytes(bytes: R) -> Self {
        Self::new(Blobs::from_bytes(bytes))
    }
}

impl<R: io::Read> FeatureStream<io::BufReader<R>> {
    #[inline]
    pub fn from_read(read: R) -> Self {
        Self::new(Blobs::from_read(read))
    }
}

impl FeatureStream<io::BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Blobs::open(path)?))
    }
}

impl<R: io::BufRead> FeatureStream<R> {
    #[inline]
    pub fn from_buf_read(read: R) -> Self {
        Self::new(Blobs::from_buf_read(read))
    }
}

impl<R> FeatureStream<R> {
    #[inline]
    pub fn new(blobs: Blobs<R>) -> Self {
        Self {
            blobs,
            filter: FeatureTypes::ALL,
            require_header: true,
            header: None,
            state: State::Start,
        }
    }

    /// Restricts the kinds of features yielded.
    #[inline]
    pub fn types(mut self, types: FeatureTypes) -> Self {
        self.filter = types;
        self
    }

    /// Whether the first blob must be a valid `OSMHeader` (the default).
    /// When disabled, header blobs are skipped without being checked.
    #[inline]
    pub fn require_header(mut self, require: bool) -> Self {
        self.require_header = require;
        self
    }

    /// The header block, once the stream has read it.
    #[inline]
    pub fn header(&self) -> Option<&HeaderBlock> {
        self.header.as_ref()
    }

    #[inline]
    pub fn into_inner(self) -> R {
        self.blobs.into_inner()
    }
}

impl<R: io::BufRead> FeatureStream<R> {
    fn read_header(&mut self) -> Result<()> {
        let header = self.blobs.header()?.decode()?;
        self.header = Some(header);
        Ok(())
    }

    /// Decodes the next data block; `Ok(false)` at the end of the stream.
    fn read_block(&mut self) -> Result<bool> {
        match self.blobs.next() {
            None => Ok(false),
            Some(blob) => {
                let block = blob?.decode()?;
                self.state = State::Block(Box::new(block), Cursor::default());
                Ok(true)
            }
        }
    }
}

impl<R: io::BufRead> Iterator for FeatureStream<R> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Result<Feature>> {
        loop {
            let step = match &mut self.state {
                State::Done => return None,
                State::Start => {
                    self.state = State::Between;
                    if self.require_header {
                        self.read_header()
                    } else {
                        Ok(())
                    }
                }
                State::Between => match self.read_block() {
                    Ok(true) => Ok(()),
                    Ok(false) => {
                        debug!("end of stream");
                        self.state = State::Done;
                        return None;
                    }
                    Err(e) => Err(e),
                },
                State::Block(block, cursor) => match block.next_feature(cursor, self.filter) {
                    Some(Ok(feature)) => return Some(Ok(feature)),
                    Some(Err(e)) => Err(e),
                    None => {
                        self.state = State::Between;
                        Ok(())
                    }
                },
            };
            if let Err(e) = step {
                self.state = State::Done;
                return Some(Err(e));
            }
        }
    }
}

impl<R: io::BufRead> FusedIterator for FeatureStream<R> {}
