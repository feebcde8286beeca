//! RangeEncoder: the writing half of the range coder.

use log::trace;

use super::carry::CarryBuffer;
use super::{BOTTOM_VALUE, SHIFT_BITS, TOP_VALUE};
use crate::bitstream::stream::Stream;
use crate::bitstream::BitSink;
use crate::error::Result;

#[derive(Debug)]
pub struct RangeEncoder<S> {
    low: u32,
    range: u32,
    carry: CarryBuffer,
    /// Bytes in the session so far, including any the caller already wrote (`init_len`).
    byte_count: u64,
    sink: S,
}

impl<S: Stream> RangeEncoder<S> {
    /// Begin a session. `first_byte` is the first byte of output (it is held back like any
    /// other, so it can be a header byte the decoder reads on its own). `init_len` counts bytes
    /// the caller already wrote that belong to this session.
    pub fn start(sink: S, first_byte: u8, init_len: u64) -> Self {
        Self {
            low: 0,
            range: TOP_VALUE,
            carry: CarryBuffer::new(first_byte),
            byte_count: init_len,
            sink,
        }
    }

    fn normalize(&mut self) -> Result<()> {
        while self.range <= BOTTOM_VALUE {
            let top = (self.low >> SHIFT_BITS) as u8;
            if self.low < 0xff << SHIFT_BITS {
                self.carry.release(&mut self.sink, top)?;
            } else if self.low & TOP_VALUE != 0 {
                self.carry.carry(&mut self.sink, top)?;
            } else {
                self.carry.defer()?;
            }
            self.range <<= 8;
            self.low = (self.low << 8) & (TOP_VALUE - 1);
            self.byte_count += 1;
        }
        Ok(())
    }

    /// Encode the interval `[lt_f, lt_f + sy_f)` out of `tot_f`.
    pub fn encode_freq(&mut self, sy_f: u32, lt_f: u32, tot_f: u32) -> Result<()> {
        debug_assert!(sy_f > 0 && lt_f + sy_f <= tot_f && tot_f <= BOTTOM_VALUE);
        self.normalize()?;
        let r = self.range / tot_f;
        let tmp = r * lt_f;
        self.low += tmp;
        if lt_f + sy_f < tot_f {
            self.range = r * sy_f;
        } else {
            self.range -= tmp;
        }
        Ok(())
    }

    /// Same as `encode_freq` with a total of `1 << shift`.
    pub fn encode_shift(&mut self, sy_f: u32, lt_f: u32, shift: u32) -> Result<()> {
        debug_assert!(sy_f > 0 && shift <= 16 && lt_f + sy_f <= 1 << shift);
        self.normalize()?;
        let r = self.range >> shift;
        let tmp = r * lt_f;
        self.low += tmp;
        if (lt_f + sy_f) >> shift != 0 {
            self.range -= tmp;
        } else {
            self.range = r * sy_f;
        }
        Ok(())
    }

    pub fn encode_bit(&mut self, bit: bool) -> Result<()> {
        self.encode_shift(1, u32::from(bit), 1)
    }

    pub fn encode_byte(&mut self, byte: u32) -> Result<()> {
        self.encode_shift(1, byte & 0xff, 8)
    }

    pub fn encode_short(&mut self, short: u32) -> Result<()> {
        self.encode_shift(1, short & 0xffff, 16)
    }

    /// End the session: flush `low`, the held byte and any pending run, then write the
    /// trailer. Returns the total session length in bytes.
    pub fn finish(&mut self) -> Result<u64> {
        self.normalize()?;
        self.byte_count += 5;
        let mut tmp = self.low >> SHIFT_BITS;
        if u64::from(self.low & (BOTTOM_VALUE - 1)) >= (self.byte_count & 0xff_ffff) >> 1 {
            tmp += 1;
        }
        if tmp > 0xff {
            self.carry.carry(&mut self.sink, tmp as u8)?;
        } else {
            self.carry.release(&mut self.sink, tmp as u8)?;
        }
        let held = self.carry.held();
        self.sink.write_byte(held)?;
        for shift in [16, 8, 0] {
            self.sink.write_byte((self.byte_count >> shift) as u8)?;
        }
        trace!("range coder session closed after {} bytes", self.byte_count);
        Ok(self.byte_count)
    }
}

impl<S: Stream> BitSink for RangeEncoder<S> {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.encode_bit(bit)
    }
}
