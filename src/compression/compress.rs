//! The LZP3 encoder.
//!
//! Each step asks the window for a predicted match at the current position. When there is a
//! prediction, the length actually matched (possibly zero) is coded, or a single "repeat" symbol
//! when it equals the length last coded from the same context. A literal always follows, coded
//! with a model chosen by the preceding byte. When the input size was not declared up front an
//! end-of-stream literal (256) closes the stream.

use log::{debug, info, trace};

use super::window::{Match, Window, MAX_MATCH_LEN, WINDOW_SIZE};
use super::{END_OF_STREAM, LENGTH_CONTEXTS, LENGTH_MODEL_CUTOFF, MAGIC, REPEAT_PREVIOUS};
use crate::bitstream::bitwriter::BitWriter;
use crate::bitstream::stream::Stream;
use crate::error::{Error, Result};
use crate::huffman_coding::huffman::Huffman;
use crate::models::{
    BitModel, Context1Model, DefSumModel, FenwickModel, LogDistanceModel, NoModel, RangeModel,
    SymbolEncoder,
};
use crate::range_coder::RangeEncoder;
use crate::tools::options::{Backend, LiteralModel, Options};
use crate::tools::util::{size_prefix, write_unsigned_number};

/// Huffman models in the match engine halve their counts at this root weight.
pub(crate) const HUFFMAN_MAX_WEIGHT: u32 = 0xffff;

/// Input limited to the declared size, if there is one.
struct Source<'a, R: ?Sized> {
    input: &'a mut R,
    remaining: Option<u64>,
}

impl<R: Stream + ?Sized> Source<'_, R> {
    fn next(&mut self) -> Result<Option<u8>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        let byte = self.input.read_byte()?;
        if let (Some(_), Some(remaining)) = (byte, self.remaining.as_mut()) {
            *remaining -= 1;
        }
        Ok(byte)
    }
}

/// Builds a range-coder model for an alphabet of the given size.
pub(crate) fn range_model(kind: LiteralModel) -> impl Fn(usize) -> RangeModel {
    move |size| match kind {
        LiteralModel::Fenwick => RangeModel::Fenwick(FenwickModel::with_defaults(size)),
        LiteralModel::DefSum => RangeModel::DefSum(DefSumModel::new(size)),
    }
}

/// Like [`range_model`], but large alphabets (long match remainders) are sent raw.
pub(crate) fn sparse_range_model(kind: LiteralModel) -> impl Fn(usize) -> RangeModel {
    let dense = range_model(kind);
    move |size| {
        if size > LENGTH_MODEL_CUTOFF {
            RangeModel::Raw(NoModel::new(size))
        } else {
            dense(size)
        }
    }
}

pub(crate) fn huffman_model(size: usize) -> BitModel {
    BitModel::Huffman(Huffman::new(size, Some(HUFFMAN_MAX_WEIGHT)))
}

pub(crate) fn raw_model(size: usize) -> BitModel {
    BitModel::Raw(NoModel::new(size))
}

/// The literal and match-length models shared by encoder and decoder.
pub(crate) struct ModelStack<M> {
    pub literals: Context1Model<M>,
    pub lengths: Vec<LogDistanceModel<M>>,
}

impl<M> ModelStack<M> {
    pub fn new(
        declared: Option<u64>,
        model: impl Fn(usize) -> M,
        sparse: impl Fn(usize) -> M,
    ) -> Self {
        let alphabet = if declared.is_some() { 256 } else { 257 };
        debug!(
            "Building models: {} literal contexts over {} symbols, {} length contexts",
            256, alphabet, LENGTH_CONTEXTS
        );
        Self {
            literals: Context1Model::new(&model, 256, alphabet),
            lengths: (0..LENGTH_CONTEXTS)
                .map(|_| LogDistanceModel::new(WINDOW_SIZE as u64, 1, &model, &sparse))
                .collect(),
        }
    }
}

/// Compress `input` into `output`. The stream's declared size comes from `input.size()`;
/// when that is `None` the size is recorded as unknown and an end marker is coded instead.
pub fn compress_stream<R, W>(input: &mut R, output: &mut W, opts: &Options) -> Result<()>
where
    R: Stream + ?Sized,
    W: Stream + ?Sized,
{
    let declared = input.size();
    info!(
        "Compressing {} bytes with the {} back end",
        declared.map_or_else(|| "an unknown number of".to_string(), |n| n.to_string()),
        opts.backend
    );
    output.write(MAGIC)?;
    write_unsigned_number(output, size_prefix(declared))?;

    let consumed = match opts.backend {
        Backend::Range => {
            let mut coder = RangeEncoder::start(&mut *output, opts.flags(), 0);
            let models = ModelStack::new(
                declared,
                range_model(opts.literal_model),
                sparse_range_model(opts.literal_model),
            );
            let consumed = encode_body(input, &mut coder, declared, models)?;
            let session = coder.finish()?;
            debug!("Range coder session took {} bytes", session);
            consumed
        }
        Backend::Huffman => {
            output.write_byte(opts.flags())?;
            let mut coder = BitWriter::new(&mut *output);
            let models = ModelStack::new(declared, huffman_model, raw_model);
            let consumed = encode_body(input, &mut coder, declared, models)?;
            coder.flush()?;
            consumed
        }
    };
    output.flush()?;
    info!("Compressed {} bytes", consumed);
    Ok(())
}

/// Run the match engine over the input, coding through `coder`. Returns the bytes consumed.
fn encode_body<R, C, M>(
    input: &mut R,
    coder: &mut C,
    declared: Option<u64>,
    mut models: ModelStack<M>,
) -> Result<u64>
where
    R: Stream + ?Sized,
    M: SymbolEncoder<C>,
{
    let mut source = Source {
        input,
        remaining: declared,
    };
    let mut window = Window::new(declared);
    let mut consumed = 0_u64;
    let mut history = 0_usize;

    while Some(consumed) != declared {
        let mut ch = source.next()?;
        let s = window.pos();
        if let Some(hit) = window.find_match(s) {
            let len = extend_match(&mut window, &mut source, &mut ch, hit)?;
            let lengths = &mut models.lengths[history];
            if len == hit.prev_len {
                lengths.encode(coder, REPEAT_PREVIOUS)?;
            } else {
                lengths.encode(coder, len as i64)?;
            }
            window.update(s, len);
            consumed += len as u64;
            history = (history << 1 | usize::from(len > 0)) & (LENGTH_CONTEXTS - 1);
            trace!(
                "match at {} from {} (order {}): {} bytes, previous {}",
                s,
                hit.pos,
                hit.order,
                len,
                hit.prev_len
            );
        }

        let context = window.last_byte();
        match ch {
            Some(byte) => {
                models.literals.encode(coder, usize::from(byte), context)?;
                window.put(byte);
                consumed += 1;
            }
            None => {
                match declared {
                    None => models.literals.encode(coder, END_OF_STREAM, context)?,
                    Some(expected) if consumed != expected => {
                        return Err(Error::SizeMismatch {
                            expected,
                            actual: consumed,
                        });
                    }
                    Some(_) => {}
                }
                break;
            }
        }
    }
    Ok(consumed)
}

/// Greedily extend a predicted match. On return `ch` holds the first byte that did not match
/// (or `None` at the end of input).
fn extend_match<R: Stream + ?Sized>(
    window: &mut Window,
    source: &mut Source<'_, R>,
    ch: &mut Option<u8>,
    hit: Match,
) -> Result<usize> {
    let mut len = 0;
    while len < MAX_MATCH_LEN {
        match *ch {
            Some(byte) if byte == window.get(hit.pos + len) => {
                window.put(byte);
                len += 1;
                *ch = source.next()?;
            }
            _ => break,
        }
    }
    Ok(len)
}
