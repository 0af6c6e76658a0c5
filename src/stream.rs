//! Read-only, seekable message body.
//!
//! A [`Stream`] owns a fixed [`Bytes`] buffer and a cursor. Cloning is cheap
//! (the buffer is reference-counted) and gives the clone its own cursor, so
//! reading a message's body never disturbs the message:
//!
//! ```rust
//! use stanza::{Message, Request};
//!
//! # let request = Request::parse("POST", "/upload").unwrap();
//! let mut body = request.body().clone();
//! let first = body.read(16);
//! ```

use std::fmt;
use std::io::{self, SeekFrom};

use bytes::Bytes;

use crate::error::Error;

/// In-memory body with a cursor. Invariant: `0 <= tell() <= len()`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Stream {
    contents: Bytes,
    cursor: usize,
}

impl Stream {
    pub fn new(contents: impl Into<Bytes>) -> Self {
        Self { contents: contents.into(), cursor: 0 }
    }

    pub fn len(&self) -> usize { self.contents.len() }
    pub fn is_empty(&self) -> bool { self.contents.is_empty() }
    pub fn tell(&self) -> usize { self.cursor }
    pub fn eof(&self) -> bool { self.cursor >= self.contents.len() }

    pub fn is_seekable(&self) -> bool { true }
    pub fn is_readable(&self) -> bool { true }
    pub fn is_writable(&self) -> bool { false }

    /// Moves the cursor, clamping to `0..=len()`. Returns the new position.
    pub fn seek(&mut self, pos: SeekFrom) -> usize {
        let len = self.contents.len() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(offset) => len + i128::from(offset),
            SeekFrom::Current(offset) => self.cursor as i128 + i128::from(offset),
        };
        // clamped into 0..=len, which fits usize
        self.cursor = target.clamp(0, len) as usize;
        self.cursor
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Reads up to `length` bytes from the cursor and advances it.
    pub fn read(&mut self, length: usize) -> Bytes {
        let end = self.cursor.saturating_add(length).min(self.contents.len());
        let chunk = self.contents.slice(self.cursor..end);
        self.cursor = end;
        chunk
    }

    /// Everything from the cursor to the end; leaves the cursor at the end.
    pub fn contents(&mut self) -> Bytes {
        self.read(usize::MAX)
    }

    /// The whole buffer, regardless of the cursor.
    pub fn bytes(&self) -> Bytes {
        self.contents.clone()
    }

    /// Always fails: message bodies are read-only.
    pub fn write(&mut self, _data: &[u8]) -> Result<usize, Error> {
        Err(Error::NotWritable)
    }
}

impl From<&'static str> for Stream {
    fn from(s: &'static str) -> Self { Self::new(s) }
}

impl From<String> for Stream {
    fn from(s: String) -> Self { Self::new(s) }
}

impl From<Vec<u8>> for Stream {
    fn from(v: Vec<u8>) -> Self { Self::new(v) }
}

impl From<Bytes> for Stream {
    fn from(b: Bytes) -> Self { Self::new(b) }
}

/// The whole buffer as (lossy) UTF-8. Does not move the cursor.
impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.contents))
    }
}

impl io::Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = Stream::read(self, buf.len());
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl io::Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(Stream::seek(self, pos) as u64)
    }
}
