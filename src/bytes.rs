//! Immutable byte strings with cheap slicing, plus the paired
//! append-only builder and positional reader used for canonical
//! wire layouts.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BytesError {
    #[error("read of {requested} bytes at offset {offset} exceeds length {len}")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        len: usize,
    },
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
    #[error("bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Immutable sequence of bytes. Slicing shares the underlying storage.
#[derive(Clone)]
pub struct ByteString {
    data: Arc<[u8]>,
    start: usize,
    len: usize,
}

impl ByteString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let data: Arc<[u8]> = bytes.into().into();
        let len = data.len();
        Self {
            data,
            start: 0,
            len,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn from_hex(s: &str) -> Result<Self, BytesError> {
        hex::decode(s)
            .map(Self::new)
            .map_err(|e| BytesError::InvalidHex(e.to_string()))
    }

    pub fn from_base64(s: &str) -> Result<Self, BytesError> {
        BASE64
            .decode(s)
            .map(Self::new)
            .map_err(|e| BytesError::InvalidBase64(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.start + self.len]
    }

    /// O(1) sub-string sharing storage with `self`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self, BytesError> {
        if offset + len > self.len {
            return Err(BytesError::OutOfBounds {
                offset,
                requested: len,
                len: self.len,
            });
        }
        Ok(Self {
            data: Arc::clone(&self.data),
            start: self.start + offset,
            len,
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.as_slice())
    }

    pub fn to_utf8(&self) -> Result<&str, BytesError> {
        std::str::from_utf8(self.as_slice()).map_err(|_| BytesError::InvalidUtf8)
    }

    pub fn reader(&self) -> ByteReader {
        ByteReader {
            source: self.clone(),
            position: 0,
        }
    }
}

impl Deref for ByteString {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for ByteString {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteString {}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteString({})", self.to_hex())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for ByteString {
    fn from(v: &[u8]) -> Self {
        Self::new(v.to_vec())
    }
}

/// Append-only builder for canonical byte layouts. All integers are
/// big-endian two's complement; length prefixes are 32-bit big-endian.
#[derive(Default)]
pub struct ByteBuilder {
    buffer: Vec<u8>,
}

impl ByteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_i16(&mut self, value: i16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn append_i32(&mut self, value: i32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn append_i64(&mut self, value: i64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn append_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    pub fn append_utf8(&mut self, s: &str) -> &mut Self {
        self.buffer.extend_from_slice(s.as_bytes());
        self
    }

    /// Length-prefixed raw bytes.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.append_i32(bytes.len() as i32);
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Length-prefixed UTF-8 string.
    pub fn append_string(&mut self, s: &str) -> &mut Self {
        self.append_bytes(s.as_bytes())
    }

    /// Nested byte-string, length-prefixed.
    pub fn append_byte_string(&mut self, bs: &ByteString) -> &mut Self {
        self.append_bytes(bs.as_slice())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn build(self) -> ByteString {
        ByteString::new(self.buffer)
    }
}

/// Positional consumer over a [`ByteString`].
pub struct ByteReader {
    source: ByteString,
    position: usize,
}

impl ByteReader {
    /// Consume `n` bytes as a sub-string sharing storage.
    pub fn take(&mut self, n: usize) -> Result<ByteString, BytesError> {
        let out = self.source.slice(self.position, n)?;
        self.position += n;
        Ok(out)
    }

    pub fn read_i32(&mut self) -> Result<i32, BytesError> {
        let bytes = self.take(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes.as_slice());
        Ok(i32::from_be_bytes(buf))
    }

    pub fn read_i16(&mut self) -> Result<i16, BytesError> {
        let bytes = self.take(2)?;
        let mut buf = [0u8; 2];
        buf.copy_from_slice(bytes.as_slice());
        Ok(i16::from_be_bytes(buf))
    }

    /// Consume everything that is left.
    pub fn remainder(&mut self) -> ByteString {
        let n = self.source.len() - self.position;
        let out = self
            .source
            .slice(self.position, n)
            .expect("remainder is always in bounds");
        self.position += n;
        out
    }

    pub fn remaining(&self) -> usize {
        self.source.len() - self.position
    }
}
