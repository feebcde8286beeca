//! Order-0 codecs: every byte is coded by a single adaptive model, with no match engine.
//!
//! They share the LZP3 stream layout (four-byte magic, then the size prefix) and make it easy
//! to compare the entropy coders on their own. Range-coded formats fold the last byte of the
//! size prefix into the range coder session: it becomes the session's first byte.

use log::info;

use super::decompress::truncated;
use super::END_OF_STREAM;
use crate::bitstream::bitreader::BitReader;
use crate::bitstream::bitwriter::BitWriter;
use crate::bitstream::stream::{BufferStream, SliceStream, Stream};
use crate::bitstream::BitSource;
use crate::error::{Error, Result};
use crate::huffman_coding::huffman::Huffman;
use crate::models::{
    Context1Model, DefSumModel, FenwickModel, NoModel, SymbolDecoder, SymbolEncoder,
};
use crate::range_coder::{RangeDecoder, RangeEncoder};
use crate::tools::util::{
    coerce_output, encode_unsigned_number, read_header, size_prefix, write_unsigned_number,
};

const HUFFMAN_MAX_WEIGHT: u32 = 8191;
/// Context for the first byte of a [`Format::Context1`] stream.
const INITIAL_CONTEXT: u8 = b' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Fixed-width bytes, no modelling at all
    NoModel,
    /// Range coder with a deferred-summation model
    DefSum,
    /// Range coder with a Fenwick tree model
    Fenwick,
    /// Dynamic Huffman
    Huffman,
    /// Dynamic Huffman, one tree per preceding byte
    Context1,
}

impl Format {
    pub fn magic(self) -> &'static [u8; 4] {
        match self {
            Format::NoModel => b"nomo",
            Format::DefSum => b"dfsm",
            Format::Fenwick => b"fenw",
            Format::Huffman => b"huff",
            Format::Context1 => b"ctx1",
        }
    }

    fn range_coded(self) -> bool {
        matches!(self, Format::DefSum | Format::Fenwick)
    }
}

/// Context1Model driven by the previously coded byte.
struct PreviousByte<M> {
    model: Context1Model<M>,
    last: u8,
}

impl<M> PreviousByte<M> {
    fn new(model: Context1Model<M>) -> Self {
        Self {
            model,
            last: INITIAL_CONTEXT,
        }
    }
}

impl<C, M: SymbolEncoder<C>> SymbolEncoder<C> for PreviousByte<M> {
    fn encode(&mut self, coder: &mut C, symbol: usize) -> Result<()> {
        self.model.encode(coder, symbol, self.last)?;
        self.last = symbol as u8;
        Ok(())
    }
}

impl<C, M: SymbolDecoder<C>> SymbolDecoder<C> for PreviousByte<M> {
    fn decode(&mut self, coder: &mut C) -> Result<usize> {
        let symbol = self.model.decode(coder, self.last)?;
        self.last = symbol as u8;
        Ok(symbol)
    }
}

fn huffman(size: usize) -> Huffman {
    Huffman::new(size, Some(HUFFMAN_MAX_WEIGHT))
}

fn alphabet(declared: Option<u64>) -> usize {
    if declared.is_some() {
        256
    } else {
        257
    }
}

pub fn compress(format: Format, input: &[u8]) -> Result<Vec<u8>> {
    let mut source = SliceStream::new(input);
    let mut output = BufferStream::new();
    compress_stream(format, &mut source, &mut output)?;
    output.into_inner()
}

pub fn decompress(format: Format, input: &[u8]) -> Result<Vec<u8>> {
    let mut source = SliceStream::new(input);
    let declared = read_header(&mut source, format.magic())?;
    let mut output = coerce_output(declared);
    decompress_payload(format, &mut source, &mut output, declared)?;
    output.into_inner()
}

pub fn compress_stream<R, W>(format: Format, input: &mut R, output: &mut W) -> Result<()>
where
    R: Stream + ?Sized,
    W: Stream + ?Sized,
{
    let declared = input.size();
    let size = alphabet(declared);
    info!("{:?} coding of {:?} bytes", format, declared);
    output.write(format.magic())?;

    let count = if format.range_coded() {
        let prefix = encode_unsigned_number(size_prefix(declared));
        let (head, last) = prefix.split_at(prefix.len() - 1);
        output.write(head)?;
        let mut coder = RangeEncoder::start(&mut *output, last[0], 1);
        let count = match format {
            Format::DefSum => encode_all(input, &mut coder, declared, DefSumModel::new(size))?,
            _ => encode_all(input, &mut coder, declared, FenwickModel::with_defaults(size))?,
        };
        coder.finish()?;
        count
    } else {
        write_unsigned_number(output, size_prefix(declared))?;
        let mut coder = BitWriter::new(&mut *output);
        let count = match format {
            Format::NoModel => encode_all(input, &mut coder, declared, NoModel::new(size))?,
            Format::Huffman => {
                let model = Huffman::with_capacity(257, size, Some(HUFFMAN_MAX_WEIGHT));
                encode_all(input, &mut coder, declared, model)?
            }
            _ => {
                let model = PreviousByte::new(Context1Model::new(huffman, 256, size));
                encode_all(input, &mut coder, declared, model)?
            }
        };
        coder.flush()?;
        count
    };
    output.flush()?;
    info!("{:?} coded {} bytes", format, count);
    Ok(())
}

pub fn decompress_stream<R, W>(format: Format, input: &mut R, output: &mut W) -> Result<u64>
where
    R: Stream + ?Sized,
    W: Stream + ?Sized,
{
    let declared = read_header(input, format.magic())?;
    decompress_payload(format, input, output, declared)
}

fn decompress_payload<R, W>(
    format: Format,
    input: &mut R,
    output: &mut W,
    declared: Option<u64>,
) -> Result<u64>
where
    R: Stream + ?Sized,
    W: Stream + ?Sized,
{
    let size = alphabet(declared);
    let count = if format.range_coded() {
        // The size prefix's last byte was this session's first byte.
        let mut coder = RangeDecoder::start(&mut *input, true)?;
        let count = match format {
            Format::DefSum => decode_all(&mut coder, output, declared, DefSumModel::new(size))?,
            _ => decode_all(&mut coder, output, declared, FenwickModel::with_defaults(size))?,
        };
        coder.finish()?;
        count
    } else {
        let mut coder = BitReader::new(&mut *input);
        match format {
            Format::NoModel => decode_all(&mut coder, output, declared, NoModel::new(size))?,
            Format::Huffman => {
                let model = Huffman::with_capacity(257, size, Some(HUFFMAN_MAX_WEIGHT));
                decode_all(&mut coder, output, declared, model)?
            }
            _ => {
                let model = PreviousByte::new(Context1Model::new(huffman, 256, size));
                decode_all(&mut coder, output, declared, model)?
            }
        }
    };
    output.flush()?;
    Ok(count)
}

fn encode_all<R, C, M>(
    input: &mut R,
    coder: &mut C,
    declared: Option<u64>,
    mut model: M,
) -> Result<u64>
where
    R: Stream + ?Sized,
    M: SymbolEncoder<C>,
{
    let mut count = 0_u64;
    while Some(count) != declared {
        match input.read_byte()? {
            Some(byte) => {
                model.encode(coder, usize::from(byte))?;
                count += 1;
            }
            None => {
                if let Some(expected) = declared {
                    return Err(Error::SizeMismatch {
                        expected,
                        actual: count,
                    });
                }
                model.encode(coder, END_OF_STREAM)?;
                break;
            }
        }
    }
    Ok(count)
}

fn decode_all<C, W, M>(
    coder: &mut C,
    output: &mut W,
    declared: Option<u64>,
    mut model: M,
) -> Result<u64>
where
    C: BitSource,
    W: Stream + ?Sized,
    M: SymbolDecoder<C>,
{
    let mut count = 0_u64;
    while Some(count) != declared {
        if coder.past_end() {
            return Err(truncated(declared, count));
        }
        let symbol = model.decode(coder)?;
        if symbol == END_OF_STREAM && declared.is_none() {
            break;
        }
        let byte = u8::try_from(symbol)
            .map_err(|_| Error::DataCorruption(format!("symbol {} out of range", symbol)))?;
        output.write_byte(byte)?;
        count += 1;
    }
    if coder.past_end() {
        return Err(truncated(declared, count));
    }
    Ok(count)
}

#[cfg(test)]
mod test {
    use super::{compress, compress_stream, decompress, Format};
    use crate::bitstream::stream::{BufferStream, ReadStream};
    use crate::error::Error;

    const ALL: [Format; 5] = [
        Format::NoModel,
        Format::DefSum,
        Format::Fenwick,
        Format::Huffman,
        Format::Context1,
    ];

    fn sample() -> Vec<u8> {
        let mut data = b"Order zero coders see one byte at a time. ".repeat(30);
        data.extend(0..=255);
        data
    }

    #[test]
    fn roundtrip_test() {
        let data = sample();
        for format in ALL {
            let packed = compress(format, &data).unwrap();
            assert_eq!(&packed[..4], format.magic());
            assert_eq!(decompress(format, &packed).unwrap(), data, "{:?}", format);
        }
    }

    #[test]
    fn unknown_size_test() {
        let data = sample();
        for format in ALL {
            let mut packed = BufferStream::new();
            compress_stream(format, &mut ReadStream::new(&data[..]), &mut packed).unwrap();
            let packed = packed.into_inner().unwrap();
            assert_eq!(packed[4], 0x80);
            assert_eq!(decompress(format, &packed).unwrap(), data, "{:?}", format);
        }
    }

    #[test]
    fn empty_test() {
        for format in ALL {
            let packed = compress(format, b"").unwrap();
            assert_eq!(packed[4], 0x81);
            assert!(decompress(format, &packed).unwrap().is_empty());
        }
    }

    #[test]
    fn prefix_folding_test() {
        // Range formats: the single prefix byte is shared with the coder, so nothing else
        // separates it from the payload.
        let packed = compress(Format::Fenwick, b"a").unwrap();
        assert_eq!(&packed[..5], b"fenw\x82");
        let packed = compress(Format::NoModel, b"a").unwrap();
        assert_eq!(packed, b"nomo\x82a");
    }

    #[test]
    fn wrong_format_test() {
        let packed = compress(Format::Huffman, b"abc").unwrap();
        assert!(matches!(
            decompress(Format::Context1, &packed),
            Err(Error::FormatError(_))
        ));
    }
}
