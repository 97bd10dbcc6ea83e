//! A bounds-checked slice reader for walking RIFF chunks.
//!
//! [`SliceReader`] wraps a byte slice and tracks the current position,
//! similar to `std::io::Cursor<&[u8]>`. Every read that would run past the
//! end of the slice fails with [`Error::TruncatedData`] describing how many
//! bytes were needed and how many were left.

use byteorder_lite::{ByteOrder, LittleEndian};
use core::fmt;

use crate::error::{Error, Result};

/// A reader that wraps a byte slice and tracks the current position.
#[derive(Clone)]
pub(crate) struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    /// Create a new reader positioned at the start of `data`.
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the slice.
    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes remaining from the current position.
    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::TruncatedData {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Seek to an absolute position. Seeking exactly to the end is allowed.
    #[inline]
    pub(crate) fn seek_from_start(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::TruncatedData {
                offset: self.pos,
                needed: pos - self.pos.min(pos),
                available: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skip `n` bytes.
    #[inline]
    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a four-character chunk tag.
    #[inline]
    pub(crate) fn read_fourcc(&mut self) -> Result<[u8; 4]> {
        self.ensure(4)?;
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(tag)
    }

    /// Read a single byte.
    #[inline]
    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read a u16 in little-endian byte order.
    #[inline]
    pub(crate) fn read_u16_le(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let val = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(val)
    }

    /// Read a u24 in little-endian byte order (as u32).
    #[inline]
    pub(crate) fn read_u24_le(&mut self) -> Result<u32> {
        self.ensure(3)?;
        let val = LittleEndian::read_u24(&self.data[self.pos..]);
        self.pos += 3;
        Ok(val)
    }

    /// Read a u32 in little-endian byte order.
    #[inline]
    pub(crate) fn read_u32_le(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let val = LittleEndian::read_u32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(val)
    }

    /// Take a slice of `n` bytes from the current position and advance.
    #[inline]
    pub(crate) fn take_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

impl fmt::Debug for SliceReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceReader")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}
