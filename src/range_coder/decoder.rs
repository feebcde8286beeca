//! RangeDecoder: the reading half of the range coder.
//!
//! Bytes beyond the end of the input read as zero and set `past_end`. A well-formed session
//! is consumed exactly, so `past_end` after [`RangeDecoder::finish`] means truncated input.

use log::warn;

use super::{BOTTOM_VALUE, EXTRA_BITS};
use crate::bitstream::stream::Stream;
use crate::bitstream::BitSource;
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct RangeDecoder<S> {
    low: u32,
    range: u32,
    /// Last byte read; its low bit has not yet entered `low`.
    buffer: u8,
    /// Width of one frequency unit, kept between `decode_cul_*` and `decode_update`.
    step: u32,
    first_byte: Option<u8>,
    past_end: bool,
    source: S,
}

impl<S: Stream> RangeDecoder<S> {
    /// Begin a session. With `skip_initial` the caller has already consumed the session's
    /// first byte; otherwise it is read here and kept for [`RangeDecoder::first_byte`].
    pub fn start(source: S, skip_initial: bool) -> Result<Self> {
        let mut decoder = Self {
            low: 0,
            range: 0,
            buffer: 0,
            step: 0,
            first_byte: None,
            past_end: false,
            source,
        };
        if !skip_initial {
            decoder.first_byte = Some(decoder.next_byte()?);
        }
        decoder.buffer = decoder.next_byte()?;
        decoder.low = u32::from(decoder.buffer >> (8 - EXTRA_BITS));
        decoder.range = 1 << EXTRA_BITS;
        Ok(decoder)
    }

    /// The session's first byte, when it was read by `start`.
    pub fn first_byte(&self) -> Option<u8> {
        self.first_byte
    }

    fn next_byte(&mut self) -> Result<u8> {
        match self.source.read_byte()? {
            Some(byte) => Ok(byte),
            None => {
                self.past_end = true;
                Ok(0)
            }
        }
    }

    fn normalize(&mut self) -> Result<()> {
        while self.range <= BOTTOM_VALUE {
            self.low = self.low << 8 | (u32::from(self.buffer) << EXTRA_BITS) & 0xff;
            self.buffer = self.next_byte()?;
            self.low |= u32::from(self.buffer >> (8 - EXTRA_BITS));
            self.range <<= 8;
        }
        Ok(())
    }

    /// Peek at the cumulative frequency of the next symbol, out of `tot_f`.
    pub fn decode_cul_freq(&mut self, tot_f: u32) -> Result<u32> {
        self.normalize()?;
        if tot_f == 0 {
            warn!("frequency decode against an empty total");
            return Err(Error::DataCorruption("zero frequency total".into()));
        }
        self.step = self.range / tot_f;
        if self.step == 0 {
            warn!("frequency total {} exceeds the coding range", tot_f);
            return Err(Error::DataCorruption("frequency total too large".into()));
        }
        Ok((self.low / self.step).min(tot_f - 1))
    }

    /// Peek at the cumulative frequency of the next symbol, out of `1 << shift`.
    pub fn decode_cul_shift(&mut self, shift: u32) -> Result<u32> {
        self.normalize()?;
        self.step = self.range >> shift;
        if self.step == 0 {
            return Err(Error::DataCorruption("frequency total too large".into()));
        }
        let tmp = self.low / self.step;
        if tmp >> shift != 0 {
            Ok((1 << shift) - 1)
        } else {
            Ok(tmp)
        }
    }

    /// Consume the symbol occupying `[lt_f, lt_f + sy_f)` out of `tot_f`.
    pub fn decode_update(&mut self, sy_f: u32, lt_f: u32, tot_f: u32) -> Result<()> {
        if sy_f == 0 {
            warn!("decoded a symbol with zero frequency");
            return Err(Error::DataCorruption("zero-width symbol".into()));
        }
        let tmp = self.step.wrapping_mul(lt_f);
        self.low = self.low.wrapping_sub(tmp);
        if lt_f + sy_f < tot_f {
            self.range = self.step.wrapping_mul(sy_f);
        } else {
            self.range = self.range.wrapping_sub(tmp);
        }
        if self.range == 0 {
            return Err(Error::DataCorruption("range collapsed".into()));
        }
        Ok(())
    }

    fn decode_shifted(&mut self, shift: u32) -> Result<u32> {
        let value = self.decode_cul_shift(shift)?;
        self.decode_update(1, value, 1 << shift)?;
        Ok(value)
    }

    pub fn decode_bit(&mut self) -> Result<bool> {
        Ok(self.decode_shifted(1)? == 1)
    }

    pub fn decode_byte(&mut self) -> Result<u32> {
        self.decode_shifted(8)
    }

    pub fn decode_short(&mut self) -> Result<u32> {
        self.decode_shifted(16)
    }

    /// End the session, consuming the trailer.
    pub fn finish(&mut self) -> Result<()> {
        self.normalize()?;
        if self.past_end {
            warn!("range coded input ended early");
            return Err(Error::DataCorruption(
                "range coded input is truncated".into(),
            ));
        }
        Ok(())
    }
}

impl<S: Stream> BitSource for RangeDecoder<S> {
    fn read_bit(&mut self) -> Result<bool> {
        self.decode_bit()
    }

    fn past_end(&self) -> bool {
        self.past_end
    }
}
