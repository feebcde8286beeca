//! LZP3: an adaptive LZP compressor.
//!
//! Version 0.1.0
//!
//! LZP predicts, from the last few bytes, where the data is likely to repeat, so a match costs
//! only its length: no offset is ever sent. Match lengths and literals are then entropy coded
//! with adaptive models, either through a 32-bit range coder or through dynamic Huffman codes
//! on a plain bitstream.
//!
//! Basic usage:
//!
//! ```
//! let opts = lzp3::Options::default();
//! let packed = lzp3::compress(b"abracadabra abracadabra", &opts).unwrap();
//! assert_eq!(lzp3::decompress(&packed).unwrap(), b"abracadabra abracadabra");
//! ```
//!
//! The library logs through the `log` facade and never installs a logger itself.
//!
pub mod bitstream;
pub mod compression;
pub mod error;
pub mod huffman_coding;
pub mod models;
pub mod range_coder;
pub mod tools;

pub use bitstream::stream::{BufferStream, ReadStream, SliceStream, Stream, WriteStream};
pub use compression::{compress, compress_stream, decompress, decompress_into, decompress_stream};
pub use error::{Error, Result};
pub use tools::options::{Backend, LiteralModel, Options};
