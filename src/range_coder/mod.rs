//! A 32-bit carry-aware range coder.
//!
//! The coding interval is `(low, range)` inside a 32-bit window. Output is produced a byte at a
//! time whenever `range` drops to [`BOTTOM_VALUE`] or below. A byte that might still be bumped
//! by a later carry is held back in a [`CarryBuffer`] together with a run count of bytes whose
//! value depends on that same carry.
//!
//! Frequencies can be given against an arbitrary total (`encode_freq`) or against a power of
//! two (`encode_shift`), which saves a division on both sides.
//!
//! A session written by [`RangeEncoder`] ends with a trailer: one final byte and the session
//! length as a 3-byte big-endian count. [`RangeDecoder`] consumes exactly the bytes the encoder
//! produced.
//!
pub mod carry;
pub mod decoder;
pub mod encoder;

pub use carry::CarryBuffer;
pub use decoder::RangeDecoder;
pub use encoder::RangeEncoder;

pub const CODE_BITS: u32 = 32;
pub const TOP_VALUE: u32 = 1 << (CODE_BITS - 1);
pub const SHIFT_BITS: u32 = CODE_BITS - 9;
pub const EXTRA_BITS: u32 = (CODE_BITS - 2) % 8 + 1;
pub const BOTTOM_VALUE: u32 = TOP_VALUE >> 8;
