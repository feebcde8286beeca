//! BitWriter: packs bits into bytes, most significant bit first.
//!
//! Bits accumulate behind a marker bit; a byte is emitted as soon as eight have been collected.
//! `flush` pads the final partial byte with zeros.

use super::stream::{write_only, Stream};
use super::BitSink;
use crate::error::Result;

/// Empty buffer: just the marker bit.
const EMPTY: u32 = 1;

#[derive(Debug)]
pub struct BitWriter<S> {
    sink: S,
    buffer: u32,
}

impl<S: Stream> BitWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffer: EMPTY,
        }
    }

    /// Write the low `n` bits of `value` (at most 64), most significant first.
    pub fn write_bits(&mut self, n: u32, value: u64) -> Result<()> {
        debug_assert!(n <= 64);
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1)?;
        }
        Ok(())
    }

    /// Number of bits waiting for a full byte.
    #[cfg(test)]
    fn pending_bits(&self) -> u32 {
        31 - self.buffer.leading_zeros()
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: Stream> BitSink for BitWriter<S> {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.buffer = self.buffer << 1 | u32::from(bit);
        if self.buffer & 0x100 != 0 {
            self.sink.write_byte(self.buffer as u8)?;
            self.buffer = EMPTY;
        }
        Ok(())
    }
}

impl<S: Stream> Stream for BitWriter<S> {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(write_only())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.buffer == EMPTY {
            return self.sink.write_byte(byte);
        }
        self.write_bits(8, u64::from(byte))
    }

    /// Pad the last byte with zero bits and flush the sink.
    fn flush(&mut self) -> Result<()> {
        while self.buffer != EMPTY {
            self.write_bit(false)?;
        }
        self.sink.flush()
    }
}

#[cfg(test)]
mod test {
    use super::BitWriter;
    use crate::bitstream::stream::BufferStream;
    use crate::bitstream::{BitSink, Stream};

    #[test]
    fn write_byte_test() {
        let mut bw = BitWriter::new(BufferStream::new());
        bw.write_byte(b'x').unwrap();
        bw.flush().unwrap();
        assert_eq!(bw.into_inner().into_inner().unwrap(), b"x");
    }

    #[test]
    fn padding_test() {
        let mut bw = BitWriter::new(BufferStream::new());
        bw.write_bit(true).unwrap();
        bw.write_bits(2, 0b01).unwrap();
        assert_eq!(bw.pending_bits(), 3);
        bw.write_byte(0xff).unwrap();
        bw.flush().unwrap();
        assert_eq!(
            bw.into_inner().into_inner().unwrap(),
            vec![0b1011_1111, 0b1110_0000]
        );
    }

    #[test]
    fn wide_write_test() {
        let mut bw = BitWriter::new(BufferStream::new());
        bw.write_bits(64, 0x0123_4567_89ab_cdef).unwrap();
        bw.flush().unwrap();
        assert_eq!(
            bw.into_inner().into_inner().unwrap(),
            vec![0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]
        );
    }
}
