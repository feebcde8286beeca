//! The bitstream module is the I/O subsystem of the codec.
//!
//! [`stream`] provides byte streams over memory and over `std::io`. [`bitreader`] and
//! [`bitwriter`] layer MSB-first bit access on top of any stream.
//!
//! The range coder also speaks [`BitSink`]/[`BitSource`], so the probability models that only
//! need single bits (raw fixed-width codes, adaptive Huffman) run unchanged over either back end.
//!
pub mod bitreader;
pub mod bitwriter;
pub mod stream;

pub use stream::{BufferStream, ReadStream, SliceStream, Stream, WriteStream};

use crate::error::Result;

/// Anything that accepts single bits.
pub trait BitSink {
    fn write_bit(&mut self, bit: bool) -> Result<()>;
}

/// Anything that produces single bits.
pub trait BitSource {
    fn read_bit(&mut self) -> Result<bool>;

    /// True once the source has been asked for data beyond the end of its input.
    fn past_end(&self) -> bool;
}
