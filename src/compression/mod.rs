//! The compression module holds the LZP3 codec and a family of simple order-0 codecs.
//!
//! LZP3 compression happens in the following steps:
//! - Match prediction: hashed order-4/3/2 contexts point at where the current context was seen
//!   last ([`window`]).
//! - Match coding: the length matched at the predicted position is coded by bit length, in one
//!   of 16 models selected by whether recent predictions matched.
//! - Literal coding: the byte after every match attempt is coded in a model selected by the
//!   preceding byte.
//! - Entropy coding: either the range coder with Fenwick or deferred-summation models, or a plain
//!   bitstream with adaptive Huffman models.
//!
//! Stream layout: the magic `lzp3`, the declared size plus one as a variable-length number
//! (0 when unknown), a flag byte naming the back end, then the coded payload.
//!
//! Decompression is the exact mirror of compression.
//!

pub mod compress;
pub mod decompress;
pub mod simple;
pub mod window;

pub use compress::compress_stream;
pub use decompress::decompress_stream;

use crate::bitstream::stream::{BufferStream, SliceStream};
use crate::error::{Error, Result};
use crate::tools::options::Options;
use crate::tools::util::{coerce_output, read_header};

pub const MAGIC: &[u8; 4] = b"lzp3";
/// Number of match-length models, selected by the last four match outcomes.
pub const LENGTH_CONTEXTS: usize = 16;
/// Match remainders with larger alphabets than this are sent raw in range mode.
pub const LENGTH_MODEL_CUTOFF: usize = 256;
/// Literal that ends a stream of undeclared size.
pub const END_OF_STREAM: usize = 256;
/// Match length meaning "same as last time in this context".
pub const REPEAT_PREVIOUS: i64 = -1;

/// Compress a byte slice.
pub fn compress(input: &[u8], opts: &Options) -> Result<Vec<u8>> {
    let mut source = SliceStream::new(input);
    let mut output = BufferStream::new();
    compress_stream(&mut source, &mut output, opts)?;
    output.into_inner()
}

/// Decompress a byte slice.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut source = SliceStream::new(input);
    let declared = read_header(&mut source, MAGIC)?;
    let mut output = coerce_output(declared);
    decompress::decompress_payload(&mut source, &mut output, declared)?;
    output.into_inner()
}

/// Decompress into a caller-provided buffer, returning the number of bytes written. The stream
/// must not hold more than `output.len()` bytes, and when its size is declared it must match
/// exactly.
pub fn decompress_into(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let mut source = SliceStream::new(input);
    let declared = read_header(&mut source, MAGIC)?;
    let capacity = output.len() as u64;
    if let Some(size) = declared {
        if size != capacity {
            return Err(Error::SizeMismatch {
                expected: capacity,
                actual: size,
            });
        }
    }
    let mut sink = BufferStream::fixed(capacity);
    decompress::decompress_payload(&mut source, &mut sink, declared)?;
    let decoded = sink.as_slice();
    output[..decoded.len()].copy_from_slice(decoded);
    Ok(decoded.len())
}

#[cfg(test)]
mod test {
    use super::{compress, decompress, decompress_into, MAGIC};
    use crate::bitstream::stream::{BufferStream, ReadStream, Stream};
    use crate::error::Error;
    use crate::tools::options::{LiteralModel, Options};

    fn all_options() -> [Options; 3] {
        [
            Options::new(),
            Options::new().with_literal_model(LiteralModel::DefSum),
            Options::huffman(),
        ]
    }

    #[test]
    fn abab_test() {
        for opts in all_options() {
            let packed = compress(b"ABAB", &opts).unwrap();
            assert_eq!(&packed[..4], MAGIC);
            assert_eq!(packed[4], 0x85);
            assert_eq!(packed[5], opts.flags());
            assert_eq!(decompress(&packed).unwrap(), b"ABAB");
        }
    }

    #[test]
    fn empty_test() {
        for opts in all_options() {
            let packed = compress(b"", &opts).unwrap();
            assert_eq!(&packed[..5], b"lzp3\x81");
            assert_eq!(packed[5], opts.flags());
            assert!(decompress(&packed).unwrap().is_empty());
        }
    }

    #[test]
    fn zeros_test() {
        let zeros = vec![0_u8; 10_000];
        for opts in all_options() {
            let packed = compress(&zeros, &opts).unwrap();
            assert!(packed.len() < 200, "{} bytes", packed.len());
            assert_eq!(decompress(&packed).unwrap(), zeros);
        }
    }

    #[test]
    fn unknown_size_test() {
        let text = b"It was the best of times, it was the worst of times. ".repeat(40);
        for opts in all_options() {
            let mut source = ReadStream::new(&text[..]);
            let mut packed = BufferStream::new();
            super::compress_stream(&mut source, &mut packed, &opts).unwrap();
            let packed = packed.into_inner().unwrap();
            assert_eq!(packed[4], 0x80);
            assert_eq!(decompress(&packed).unwrap(), text);

            let mut out = vec![0; text.len() + 10];
            assert_eq!(decompress_into(&packed, &mut out).unwrap(), text.len());
            assert_eq!(&out[..text.len()], &text[..]);
        }
    }

    #[test]
    fn decompress_into_test() {
        let packed = compress(b"hello hello hello", &Options::new()).unwrap();
        let mut exact = [0_u8; 17];
        assert_eq!(decompress_into(&packed, &mut exact).unwrap(), 17);
        assert_eq!(&exact, b"hello hello hello");

        let mut short = [0_u8; 5];
        assert!(matches!(
            decompress_into(&packed, &mut short),
            Err(Error::SizeMismatch {
                expected: 5,
                actual: 17
            })
        ));
    }

    #[test]
    fn short_input_test() {
        // Declares 100 bytes but the source only has 3.
        struct Liar<'a>(ReadStream<&'a [u8]>);
        impl Stream for Liar<'_> {
            fn read_byte(&mut self) -> crate::error::Result<Option<u8>> {
                self.0.read_byte()
            }
            fn size(&self) -> Option<u64> {
                Some(100)
            }
        }
        let mut source = Liar(ReadStream::new(&b"abc"[..]));
        let mut packed = BufferStream::new();
        assert!(matches!(
            super::compress_stream(&mut source, &mut packed, &Options::new()),
            Err(Error::SizeMismatch {
                expected: 100,
                actual: 3
            })
        ));
    }

    #[test]
    fn truncated_stream_test() {
        let text = b"abcdefghijklmnopqrstuvwxyz".repeat(20);
        for opts in all_options() {
            let packed = compress(&text, &opts).unwrap();
            let cut = &packed[..packed.len() / 2];
            assert!(decompress(cut).is_err());
        }
    }

    #[test]
    fn bad_magic_test() {
        let mut packed = compress(b"data", &Options::new()).unwrap();
        packed[0] = b'x';
        assert!(matches!(decompress(&packed), Err(Error::FormatError(_))));
        assert!(matches!(
            decompress(b"lzp3\x85"),
            Err(Error::FormatError(_))
        ));
    }
}
