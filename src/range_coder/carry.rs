//! Deferred carry handling for the range encoder.
//!
//! The encoder emits the top byte of `low` at each renormalization, but a later addition can
//! still carry into bytes already produced. So the most recent byte is held back, and a run of
//! 0xFF bytes that a carry would turn into 0x00 is kept as a count instead of being written.
//! When the next byte is known, the carry (if any) is applied to the held byte and the run is
//! written out as 0x00 (carry) or 0xFF (no carry).

use crate::bitstream::stream::Stream;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarryBuffer {
    held: u8,
    pending: u32,
}

impl CarryBuffer {
    /// Start with `first` as the held byte and no pending run.
    pub fn new(first: u8) -> Self {
        Self {
            held: first,
            pending: 0,
        }
    }

    pub fn held(&self) -> u8 {
        self.held
    }

    /// Length of the run waiting on a carry decision.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Extend the pending run by one byte.
    pub fn defer(&mut self) -> Result<()> {
        self.pending = self
            .pending
            .checked_add(1)
            .ok_or(Error::CapacityExceeded)?;
        Ok(())
    }

    /// No carry reached the held byte: write it and the run as 0xFF, then hold `next`.
    pub fn release<S: Stream>(&mut self, sink: &mut S, next: u8) -> Result<()> {
        self.settle(sink, false, next)
    }

    /// A carry reached the held byte: write it incremented and the run as 0x00, then hold `next`.
    pub fn carry<S: Stream>(&mut self, sink: &mut S, next: u8) -> Result<()> {
        self.settle(sink, true, next)
    }

    fn settle<S: Stream>(&mut self, sink: &mut S, carry: bool, next: u8) -> Result<()> {
        let (head, fill) = if carry {
            (self.held.wrapping_add(1), 0x00)
        } else {
            (self.held, 0xff)
        };
        sink.write_byte(head)?;
        for _ in 0..self.pending {
            sink.write_byte(fill)?;
        }
        self.pending = 0;
        self.held = next;
        Ok(())
    }
}
