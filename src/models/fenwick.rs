//! FenwickModel: adaptive frequencies kept in an implicit binary tree.
//!
//! Each u32 node packs two 16-bit counts. The high half is the symbol probability; the low half
//! is the escape probability, nonzero only for symbols not yet seen. Leaves live at
//! `num_syms..2 * num_syms`, the root at index 1, and the children of node `i` at `2i` and
//! `2i + 1`. Updating a symbol touches one path, so encoding and decoding are O(log n).
//!
//! A symbol that has never been coded goes out as the escape symbol (the last leaf) followed
//! by the symbol coded against the escape counts. Once every symbol has been seen the escape
//! leaf is zeroed and costs nothing.

use log::debug;

use super::{SymbolDecoder, SymbolEncoder};
use crate::bitstream::stream::Stream;
use crate::error::{Error, Result};
use crate::range_coder::{RangeDecoder, RangeEncoder};

pub const DEFAULT_MAX_PROB: u32 = 0xff00;
pub const DEFAULT_INCREMENT: u32 = 0x0100;

const ESC_MASK: u32 = 0x0000_ffff;
const ESC_SHIFT: u32 = 0;
const SYM_MASK: u32 = 0xffff_0000;
const SYM_SHIFT: u32 = 16;
/// Clears the low bit of both halves before halving, so neither borrows from the other.
const SCALE_MASK: u32 = 0xfffe_fffe;

#[derive(Debug, Clone)]
pub struct FenwickModel {
    /// Real symbols plus the escape symbol.
    num_syms: usize,
    tree: Vec<u32>,
    increment: u32,
    max_prob: u32,
}

impl FenwickModel {
    /// A model for `size` symbols. Counts are halved once the root reaches `max_prob`.
    pub fn new(size: usize, max_prob: u32, increment: u32) -> Self {
        debug_assert!(size > 0 && max_prob <= 0xffff && increment > 0);
        let num_syms = size + 1;
        let mut tree = vec![0; 2 * num_syms];
        tree[num_syms..num_syms + size].fill(1 << ESC_SHIFT);
        tree[2 * num_syms - 1] = increment << SYM_SHIFT;
        let mut model = Self {
            num_syms,
            tree,
            increment,
            max_prob,
        };
        model.sum_tree();
        model
    }

    pub fn with_defaults(size: usize) -> Self {
        Self::new(size, DEFAULT_MAX_PROB, DEFAULT_INCREMENT)
    }

    fn escape(&self) -> usize {
        self.num_syms - 1
    }

    fn sum_tree(&mut self) {
        for i in (1..self.num_syms).rev() {
            self.tree[i] = self.tree[2 * i].wrapping_add(self.tree[2 * i + 1]);
        }
    }

    /// True when the escape leaf is the only thing left contributing escape probability.
    fn last_escape(&self) -> bool {
        (self.tree[1] & ESC_MASK) >> ESC_SHIFT == 1
    }

    fn check_rescale(&mut self) {
        if (self.tree[1] & SYM_MASK) >> SYM_SHIFT >= self.max_prob {
            self.rescale();
        }
    }

    /// Halve every count. Symbol counts that reach zero become escapable again.
    fn rescale(&mut self) {
        let n = self.num_syms;
        let mut no_escape = true;
        for leaf in &mut self.tree[n..2 * n - 1] {
            if *leaf & ESC_MASK != 0 {
                no_escape = false;
                continue;
            }
            let mut p = (*leaf & SCALE_MASK) >> 1;
            if p == 0 {
                p = 1 << ESC_SHIFT;
                no_escape = false;
            }
            *leaf = p;
        }
        let mut p = (self.tree[2 * n - 1] & SCALE_MASK) >> 1;
        if no_escape {
            p = 0;
        } else if p == 0 {
            p = 1 << SYM_SHIFT;
        }
        self.tree[2 * n - 1] = p;
        self.sum_tree();
        debug!("fenwick rescale, escape leaf now {:#x}", p);
    }

    fn decode_half<S: Stream>(
        &mut self,
        coder: &mut RangeDecoder<S>,
        escaped: bool,
    ) -> Result<usize> {
        let (mask, shift, update) = if escaped {
            (ESC_MASK, ESC_SHIFT, (self.increment << SYM_SHIFT) - (1 << ESC_SHIFT))
        } else {
            (SYM_MASK, SYM_SHIFT, self.increment << SYM_SHIFT)
        };
        let tot_f = (self.tree[1] & mask) >> shift;
        let prob = coder.decode_cul_freq(tot_f)?;

        // Descend from the root, updating on the way down, until a leaf holds `prob`.
        let mut i = 1;
        let mut lt_f = 0;
        while i < self.num_syms {
            self.tree[i] = self.tree[i].wrapping_add(update);
            let left = (self.tree[2 * i] & mask) >> shift;
            i <<= 1;
            if prob - lt_f >= left {
                lt_f += left;
                i += 1;
            }
        }
        let symbol = i - self.num_syms;
        let sy_f = (self.tree[i] & mask) >> shift;
        self.tree[i] = self.tree[i].wrapping_add(update);
        if sy_f == 0 {
            return Err(Error::DataCorruption(
                "fenwick decode landed on an empty leaf".into(),
            ));
        }
        coder.decode_update(sy_f, lt_f, tot_f)?;

        // Nothing left to escape to: drop the escape leaf from the tree.
        if symbol == self.escape() && self.last_escape() {
            let update = self.tree[i].wrapping_neg();
            while i > 0 {
                self.tree[i] = self.tree[i].wrapping_add(update);
                i >>= 1;
            }
        }
        self.check_rescale();
        Ok(symbol)
    }
}

impl<S: Stream> SymbolEncoder<RangeEncoder<S>> for FenwickModel {
    fn encode(&mut self, coder: &mut RangeEncoder<S>, symbol: usize) -> Result<()> {
        let mut i = self.num_syms + symbol;
        let (mut mask, mut shift) = (SYM_MASK, SYM_SHIFT);
        let mut update = self.increment << SYM_SHIFT;
        if self.tree[i] & SYM_MASK == 0 {
            // First occurrence: escape, then code against the escape counts.
            self.encode(coder, self.escape())?;
            mask = ESC_MASK;
            shift = ESC_SHIFT;
            update = update.wrapping_sub(1 << ESC_SHIFT);
        } else if symbol == self.escape() && self.last_escape() {
            update = self.tree[i].wrapping_neg();
        }
        let sy_f = (self.tree[i] & mask) >> shift;

        // Climb to the root, adding left siblings into lt_f.
        let mut lt_f = 0_u32;
        while i > 1 {
            if i & 1 == 1 {
                lt_f = lt_f.wrapping_add(self.tree[i - 1]);
            }
            self.tree[i] = self.tree[i].wrapping_add(update);
            i >>= 1;
        }
        let tot_f = self.tree[1];
        self.tree[1] = tot_f.wrapping_add(update);

        coder.encode_freq(sy_f, (lt_f & mask) >> shift, (tot_f & mask) >> shift)?;
        self.check_rescale();
        Ok(())
    }
}

impl<S: Stream> SymbolDecoder<RangeDecoder<S>> for FenwickModel {
    fn decode(&mut self, coder: &mut RangeDecoder<S>) -> Result<usize> {
        let symbol = self.decode_half(coder, false)?;
        if symbol != self.escape() {
            return Ok(symbol);
        }
        self.decode_half(coder, true)
    }
}

#[cfg(test)]
mod test {
    use super::FenwickModel;
    use crate::bitstream::stream::{BufferStream, SliceStream};
    use crate::models::{SymbolDecoder, SymbolEncoder};
    use crate::range_coder::{RangeDecoder, RangeEncoder};

    fn assert_tree(model: &FenwickModel) {
        let n = model.num_syms;
        for i in 1..n {
            assert_eq!(
                model.tree[i],
                model.tree[2 * i].wrapping_add(model.tree[2 * i + 1])
            );
        }
        let leaves = model.tree[n..]
            .iter()
            .fold(0_u32, |acc, &leaf| acc.wrapping_add(leaf));
        assert_eq!(model.tree[1], leaves);
    }

    fn text(len: usize) -> Vec<usize> {
        b"the quick brown fox jumps over the lazy dog, again and again. "
            .iter()
            .cycle()
            .take(len)
            .map(|&b| usize::from(b))
            .collect()
    }

    #[test]
    fn root_is_sum_of_leaves_test() {
        let mut model = FenwickModel::with_defaults(256);
        let mut out = BufferStream::new();
        let mut enc = RangeEncoder::start(&mut out, 0, 0);
        assert_tree(&model);
        for s in text(3000).into_iter().chain(0..256) {
            model.encode(&mut enc, s).unwrap();
            assert_tree(&model);
        }
    }

    #[test]
    fn roundtrip_with_rescale_test() {
        // A small max_prob forces many rescales.
        let mut symbols = text(10_000);
        symbols.extend((0..300).map(|i| (i * 37) % 256));
        let mut model = FenwickModel::new(257, 0x400, 0x20);
        let mut out = BufferStream::new();
        let mut enc = RangeEncoder::start(&mut out, 0, 0);
        for &s in &symbols {
            model.encode(&mut enc, s).unwrap();
        }
        model.encode(&mut enc, 256).unwrap();
        enc.finish().unwrap();
        let bytes = out.into_inner().unwrap();

        let mut model = FenwickModel::new(257, 0x400, 0x20);
        let mut dec = RangeDecoder::start(SliceStream::new(&bytes), false).unwrap();
        for &s in &symbols {
            assert_eq!(model.decode(&mut dec).unwrap(), s);
            assert_tree(&model);
        }
        assert_eq!(model.decode(&mut dec).unwrap(), 256);
        dec.finish().unwrap();
    }

    #[test]
    fn all_symbols_seen_test() {
        let mut model = FenwickModel::with_defaults(4);
        let mut out = BufferStream::new();
        let mut enc = RangeEncoder::start(&mut out, 0, 0);
        for s in [0, 1, 2, 3, 3, 2, 1, 0] {
            model.encode(&mut enc, s).unwrap();
        }
        // Escape leaf is gone once nothing is left to escape.
        assert_eq!(model.tree[2 * model.num_syms - 1], 0);
        assert_eq!(model.tree[1] & 0xffff, 0);
    }

    #[test]
    fn identical_models_agree_test() {
        let encode = |symbols: &[usize]| {
            let mut model = FenwickModel::with_defaults(256);
            let mut out = BufferStream::new();
            let mut enc = RangeEncoder::start(&mut out, 0, 0);
            for &s in symbols {
                model.encode(&mut enc, s).unwrap();
            }
            enc.finish().unwrap();
            out.into_inner().unwrap()
        };
        let symbols = text(2000);
        assert_eq!(encode(&symbols), encode(&symbols));
    }
}
