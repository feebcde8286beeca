//! The LZP3 decoder. Mirrors the encoder step for step: the same window makes the same
//! predictions, so only the coded lengths and literals need to be read.

use log::{error, info, trace, warn};

use super::compress::{huffman_model, range_model, raw_model, sparse_range_model, ModelStack};
use super::window::Window;
use super::{END_OF_STREAM, LENGTH_CONTEXTS, MAGIC};
use crate::bitstream::bitreader::BitReader;
use crate::bitstream::stream::Stream;
use crate::bitstream::BitSource;
use crate::error::{Error, Result};
use crate::models::SymbolDecoder;
use crate::range_coder::RangeDecoder;
use crate::tools::options::{Backend, Options};
use crate::tools::util::read_header;

/// Decompress a whole stream from `input` into `output`. Returns the number of bytes produced.
pub fn decompress_stream<R, W>(input: &mut R, output: &mut W) -> Result<u64>
where
    R: Stream + ?Sized,
    W: Stream + ?Sized,
{
    let declared = read_header(input, MAGIC)?;
    decompress_payload(input, output, declared)
}

/// Decode everything after the size prefix: the flag byte and the coded data.
pub(crate) fn decompress_payload<R, W>(
    input: &mut R,
    output: &mut W,
    declared: Option<u64>,
) -> Result<u64>
where
    R: Stream + ?Sized,
    W: Stream + ?Sized,
{
    let flags = input.read_byte()?.ok_or_else(|| {
        error!("Stream ends before the flag byte.");
        Error::FormatError("missing flag byte".into())
    })?;
    let opts = Options::from_flags(flags);
    info!(
        "Decompressing {} bytes, {} back end",
        declared.map_or_else(|| "an unknown number of".to_string(), |n| n.to_string()),
        opts.backend
    );

    let produced = match opts.backend {
        Backend::Range => {
            let mut coder = RangeDecoder::start(&mut *input, true)?;
            let models = ModelStack::new(
                declared,
                range_model(opts.literal_model),
                sparse_range_model(opts.literal_model),
            );
            let produced = decode_body(&mut coder, output, declared, models)?;
            coder.finish()?;
            produced
        }
        Backend::Huffman => {
            let mut coder = BitReader::new(&mut *input);
            let models = ModelStack::new(declared, huffman_model, raw_model);
            decode_body(&mut coder, output, declared, models)?
        }
    };
    output.flush()?;
    info!("Decompressed {} bytes", produced);
    Ok(produced)
}

/// The input ran out before the stream said it was complete.
pub(crate) fn truncated(declared: Option<u64>, produced: u64) -> Error {
    warn!("Compressed input ended after {} bytes of output", produced);
    match declared {
        Some(expected) => Error::SizeMismatch {
            expected,
            actual: produced,
        },
        None => Error::DataCorruption("input ended before the end-of-stream marker".into()),
    }
}

fn decode_body<C, W, M>(
    coder: &mut C,
    output: &mut W,
    declared: Option<u64>,
    mut models: ModelStack<M>,
) -> Result<u64>
where
    C: BitSource,
    W: Stream + ?Sized,
    M: SymbolDecoder<C>,
{
    let mut window = Window::new(declared);
    let mut produced = 0_u64;
    let mut history = 0_usize;

    while Some(produced) != declared {
        let s = window.pos();
        if let Some(hit) = window.find_match(s) {
            let value = models.lengths[history].decode(coder)?;
            let len = if value < 0 { hit.prev_len } else { value as usize };
            let end = produced + len as u64;
            if let Some(expected) = declared {
                if end > expected {
                    error!("Match of {} bytes at {} runs past the declared size", len, produced);
                    return Err(Error::SizeMismatch {
                        expected,
                        actual: end,
                    });
                }
            }
            for i in 0..len {
                let byte = window.get(hit.pos + i);
                window.put(byte);
                output.write_byte(byte)?;
            }
            window.update(s, len);
            produced = end;
            history = (history << 1 | usize::from(len > 0)) & (LENGTH_CONTEXTS - 1);
            trace!("match at {} from {}: {} bytes", s, hit.pos, len);
            if Some(produced) == declared {
                break;
            }
        }
        if coder.past_end() {
            return Err(truncated(declared, produced));
        }

        let context = window.last_byte();
        let symbol = models.literals.decode(coder, context)?;
        if symbol == END_OF_STREAM && declared.is_none() {
            break;
        }
        let byte = u8::try_from(symbol)
            .map_err(|_| Error::DataCorruption(format!("literal {} out of range", symbol)))?;
        window.put(byte);
        output.write_byte(byte)?;
        produced += 1;
    }
    if coder.past_end() {
        return Err(truncated(declared, produced));
    }
    Ok(produced)
}
