//! The tools module provides helpers for the compressor.
//!
//! The tools are:
//! - options: Compression options and the flag byte that records them.
//! - util: Bit widths, the variable-length size prefix, and stream headers.
//!
pub mod options;
pub mod util;
