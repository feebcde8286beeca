//! BitReader: reads a stream one bit at a time, most significant bit first.
//!
//! Reading past the end of the underlying stream yields zero bits and sets a flag that callers
//! check with [`BitSource::past_end`]. Decoders are expected to treat that as truncated input.

use super::stream::{read_only, Stream};
use super::BitSource;
use crate::error::Result;

/// Sentinel marking an empty bit buffer. The low byte holds the unread bits of the current
/// byte followed by a single marker bit.
const EMPTY: u32 = 0x100;

#[derive(Debug)]
pub struct BitReader<S> {
    source: S,
    buffer: u32,
    past_end: bool,
}

impl<S: Stream> BitReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: EMPTY,
            past_end: false,
        }
    }

    /// True when no partially consumed byte is buffered.
    fn aligned(&self) -> bool {
        self.buffer & 0xff == 0
    }

    /// Read `n` bits (at most 64), first bit read becomes the most significant.
    pub fn read_bits(&mut self, n: u32) -> Result<u64> {
        debug_assert!(n <= 64);
        let mut value = 0_u64;
        for _ in 0..n {
            value = value << 1 | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Position in bits: the byte position of the source less any bits still buffered.
    pub fn tell_bit(&self) -> Result<u64> {
        let pending = if self.aligned() {
            0
        } else {
            8 - self.buffer.trailing_zeros()
        };
        Ok(self.source.tell()? * 8 - u64::from(pending))
    }

    /// Seek to an absolute bit position.
    pub fn seek_bit(&mut self, pos: u64) -> Result<()> {
        Stream::seek(self, pos >> 3)?;
        self.read_bits((pos & 7) as u32)?;
        Ok(())
    }
}

impl<S: Stream> BitSource for BitReader<S> {
    fn read_bit(&mut self) -> Result<bool> {
        if self.aligned() {
            match self.source.read_byte()? {
                Some(byte) => self.buffer = u32::from(byte) << 1 | 1,
                None => {
                    self.past_end = true;
                    return Ok(false);
                }
            }
        }
        let bit = self.buffer & 0x100 != 0;
        self.buffer <<= 1;
        Ok(bit)
    }

    fn past_end(&self) -> bool {
        self.past_end
    }
}

impl<S: Stream> Stream for BitReader<S> {
    /// Aligned reads go straight to the source; otherwise eight bits are assembled.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.aligned() {
            let byte = self.source.read_byte()?;
            if byte.is_none() {
                self.past_end = true;
            }
            return Ok(byte);
        }
        Ok(Some(self.read_bits(8)? as u8))
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(read_only())
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.source.seek(pos)?;
        self.buffer = EMPTY;
        self.past_end = false;
        Ok(())
    }

    fn size(&self) -> Option<u64> {
        self.source.size()
    }
}
