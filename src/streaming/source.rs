//! Byte sources feeding the stream decoder
//!
//! A source is pulled in bounded chunks. A zero-length chunk while the
//! source is not yet exhausted is a legal transient state; the decoder
//! simply asks again.

use crate::errors::{OllamaError, Result};
use bytes::Bytes;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

/// Default chunk size requested per read
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Upper bound on the scratch buffer a reader source allocates per read
pub const MAX_READ_SIZE: usize = 64 * 1024;

/// Pull-based producer of bytes
pub trait ByteSource {
    /// True once no further bytes will ever be produced
    fn is_exhausted(&self) -> bool;

    /// Read up to `max_bytes` bytes; may return fewer, or none
    fn read_chunk(&mut self, max_bytes: usize) -> Result<Bytes>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn read_chunk(&mut self, max_bytes: usize) -> Result<Bytes> {
        (**self).read_chunk(max_bytes)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn read_chunk(&mut self, max_bytes: usize) -> Result<Bytes> {
        (**self).read_chunk(max_bytes)
    }
}

/// Adapts a blocking reader (file, stdin, socket) into a byte source.
///
/// Exhaustion is detected the first time the reader reports end of file,
/// so the final read of a stream returns an empty chunk.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    exhausted: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }

    /// Give back the wrapped reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn read_chunk(&mut self, max_bytes: usize) -> Result<Bytes> {
        if self.exhausted {
            return Ok(Bytes::new());
        }

        let mut buf = vec![0u8; max_bytes.clamp(1, MAX_READ_SIZE)];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.exhausted = true;
                    return Ok(Bytes::new());
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Bytes::from(buf));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(OllamaError::Stream(format!("Failed to read from source: {}", e)))
                }
            }
        }
    }
}

/// In-memory source replaying a fixed sequence of chunks.
///
/// Each queued chunk is delivered as-is (split further if it exceeds the
/// requested size). Empty chunks are delivered as empty reads, which makes
/// this useful for replaying recorded transport behaviour.
#[derive(Debug, Clone, Default)]
pub struct ChunkSource {
    chunks: VecDeque<Bytes>,
}

impl ChunkSource {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Split `data` into pieces of at most `piece_size` bytes
    pub fn split(data: impl Into<Bytes>, piece_size: usize) -> Self {
        let mut data = data.into();
        let piece_size = piece_size.max(1);
        let mut chunks = VecDeque::new();
        while !data.is_empty() {
            let take = piece_size.min(data.len());
            chunks.push_back(data.split_to(take));
        }
        Self { chunks }
    }

    /// Number of chunks still queued
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl ByteSource for ChunkSource {
    fn is_exhausted(&self) -> bool {
        self.chunks.is_empty()
    }

    fn read_chunk(&mut self, max_bytes: usize) -> Result<Bytes> {
        let max_bytes = max_bytes.max(1);
        match self.chunks.pop_front() {
            Some(mut chunk) if chunk.len() > max_bytes => {
                let head = chunk.split_to(max_bytes);
                self.chunks.push_front(chunk);
                Ok(head)
            }
            Some(chunk) => Ok(chunk),
            None => Ok(Bytes::new()),
        }
    }
}
