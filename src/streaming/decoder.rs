//! Incremental newline-delimited JSON decoder
//!
//! Reconstructs discrete JSON values from a byte stream that arrives in
//! arbitrary pieces. Each line is expected to hold one JSON object; a line
//! that does not parse yet is kept and joined with the following line, so
//! objects split across reads (or pretty-printed across lines) still decode.
//!
//! The only fatal condition is data left in the buffer at end of stream
//! that does not parse as JSON.

use crate::errors::Result;
use crate::streaming::source::{ByteSource, DEFAULT_CHUNK_SIZE};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Stream ended while holding bytes that are not valid JSON
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Incomplete JSON object remaining: {} ({})", String::from_utf8_lossy(.remainder), .reason)]
pub struct DecodeError {
    remainder: Vec<u8>,
    reason: String,
}

impl DecodeError {
    pub fn new(remainder: Vec<u8>, reason: impl Into<String>) -> Self {
        Self {
            remainder,
            reason: reason.into(),
        }
    }

    /// The exact undecodable bytes
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    pub fn remainder_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.remainder)
    }

    /// Parser message for the remainder
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Decoder for newline-delimited JSON streams
#[derive(Debug, Clone, Copy)]
pub struct StreamDecoder {
    chunk_size: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Read size per pull from a [`ByteSource`]. Only affects throughput.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Decode every JSON value from a blocking byte source.
    ///
    /// `on_object` sees each value once, in stream order, before it is
    /// appended to the returned vector. Values delivered before a failure
    /// are not retracted.
    pub fn decode<S, F>(&self, source: &mut S, mut on_object: F) -> Result<Vec<Value>>
    where
        S: ByteSource + ?Sized,
        F: FnMut(&Value),
    {
        let mut lines = LineBuffer::default();
        let mut objects = Vec::new();
        let mut deliver = |value: Value| {
            on_object(&value);
            objects.push(value);
        };

        while !source.is_exhausted() {
            let chunk = source.read_chunk(self.chunk_size)?;
            if chunk.is_empty() {
                continue;
            }
            lines.extend(&chunk);
            lines.drain_lines(&mut deliver);
        }

        if let Some(value) = lines.finish()? {
            deliver(value);
        }

        Ok(objects)
    }

    /// Decode every JSON value from an asynchronous chunk stream.
    ///
    /// Same semantics as [`StreamDecoder::decode`]; the stream ending is
    /// the exhaustion signal, and an `Err` item aborts decoding.
    pub async fn decode_stream<S, F>(&self, stream: S, mut on_object: F) -> Result<Vec<Value>>
    where
        S: Stream<Item = Result<Bytes>>,
        F: FnMut(&Value),
    {
        futures_util::pin_mut!(stream);

        let mut lines = LineBuffer::default();
        let mut objects = Vec::new();
        let mut deliver = |value: Value| {
            on_object(&value);
            objects.push(value);
        };

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            lines.extend(&chunk);
            lines.drain_lines(&mut deliver);
        }

        if let Some(value) = lines.finish()? {
            deliver(value);
        }

        Ok(objects)
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulation buffer shared by the blocking and async entry points.
///
/// `scan_from` marks where the next line-feed search starts. Bytes before
/// it belong to a candidate that has already failed to parse and is waiting
/// for its continuation.
///
/// A candidate that ends early (EOF inside a value) can still be completed
/// by later lines. Any other syntax error cannot, so the buffer is marked
/// `stalled` and only accumulates until end of stream, where it surfaces as
/// a [`DecodeError`].
#[derive(Debug, Default)]
struct LineBuffer {
    buffer: Vec<u8>,
    scan_from: usize,
    stalled: bool,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Emit every value terminated by a line-feed currently in the buffer
    fn drain_lines<F: FnMut(Value)>(&mut self, mut emit: F) {
        if self.stalled {
            return;
        }

        while let Some(offset) = self.buffer[self.scan_from..]
            .iter()
            .position(|&b| b == b'\n')
        {
            let end = self.scan_from + offset;
            let candidate = &self.buffer[..end];

            if is_blank(candidate) {
                self.consume(end + 1);
                continue;
            }

            match serde_json::from_slice::<Value>(candidate) {
                Ok(value) => {
                    self.consume(end + 1);
                    emit(value);
                }
                Err(err) if err.is_eof() => {
                    trace!(
                        candidate_len = candidate.len(),
                        error = %err,
                        "line does not parse yet, waiting for continuation"
                    );
                    self.scan_from = end + 1;
                }
                Err(err) => {
                    debug!(
                        candidate_len = candidate.len(),
                        error = %err,
                        "malformed line, holding the rest of the stream as remainder"
                    );
                    self.stalled = true;
                    return;
                }
            }
        }
    }

    fn consume(&mut self, len: usize) {
        self.buffer.drain(..len);
        self.scan_from = 0;
    }

    /// Parse whatever is left once the source is exhausted
    fn finish(self) -> std::result::Result<Option<Value>, DecodeError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice::<Value>(&self.buffer)
            .map(Some)
            .map_err(|err| {
                warn!(
                    remainder_len = self.buffer.len(),
                    error = %err,
                    "stream ended with undecodable data"
                );
                DecodeError::new(self.buffer, err.to_string())
            })
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
