//! DefSumModel: a cumulative frequency table with deferred summation.
//!
//! Symbol probabilities are kept as a linear cumulative table out of a fixed total of 256, so
//! coding a known symbol is a single shift-based range operation. Updates are collected in a
//! side table and folded in (old probabilities halved, new counts added) only once enough of
//! them have accumulated.
//!
//! Symbols never seen have zero probability and are coded as an escape followed by the
//! symbol's rank among the other unseen symbols. Escape updates are capped and may never
//! trigger a fold on their own.

use log::debug;

use super::{SymbolDecoder, SymbolEncoder};
use crate::bitstream::stream::Stream;
use crate::error::{Error, Result};
use crate::range_coder::{RangeDecoder, RangeEncoder};

const LOG_PROB_TOTAL: u32 = 8;
const PROB_TOTAL: u16 = 1 << LOG_PROB_TOTAL;
const MAX_ESCAPE_COUNT: u16 = 40;
/// Largest alphabet, escape excluded.
pub const MAX_SYMBOLS: usize = 300;

#[derive(Debug, Clone)]
struct DecodeTables {
    /// Cumulative probability -> symbol (escape included).
    prob_to_sym: Vec<u16>,
    /// Escape rank -> symbol.
    esc_prob_to_sym: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct DefSumModel {
    /// Number of real symbols; the escape symbol is `num_syms`.
    num_syms: usize,
    /// Cumulative probabilities, `num_syms + 2` entries ending at the total.
    prob: Vec<u16>,
    /// Cumulative count of zero-probability symbols, `num_syms + 1` entries.
    escape: Vec<u16>,
    /// Deferred counts since the last fold.
    update: Vec<u16>,
    update_count: u16,
    update_thresh: u16,
    /// Built on the first decode.
    tables: Option<DecodeTables>,
}

impl DefSumModel {
    pub fn new(size: usize) -> Self {
        debug_assert!(size > 0 && size < MAX_SYMBOLS);
        let mut prob = vec![0; size + 2];
        prob[size + 1] = PROB_TOTAL;
        Self {
            num_syms: size,
            prob,
            escape: (0..=size as u16).collect(),
            update: vec![0; size + 1],
            update_count: 0,
            update_thresh: PROB_TOTAL >> 1,
            tables: None,
        }
    }

    /// Total of the cumulative table. Always 256.
    pub fn total(&self) -> u16 {
        self.prob[self.num_syms + 1]
    }

    /// Record an occurrence of `symbol`, folding the side table in when it is full.
    fn update(&mut self, symbol: usize) {
        let escape = self.num_syms;
        if symbol == escape
            && (self.update[escape] >= MAX_ESCAPE_COUNT
                || self.update_count >= self.update_thresh - 1)
        {
            return;
        }
        self.update[symbol] += 1;
        self.update_count += 1;
        if self.update_count < self.update_thresh {
            return;
        }

        // Fold: halve the old probabilities, add the deferred counts, rebuild both tables.
        let (mut cum, mut cum_esc, mut odd) = (0_u16, 0_u16, 0_u16);
        for i in 0..=escape {
            let new_prob = ((self.prob[i + 1] - self.prob[i]) >> 1) + self.update[i];
            self.prob[i] = cum;
            self.escape[i] = cum_esc;
            if new_prob != 0 {
                cum += new_prob;
                odd += new_prob & 1;
            } else {
                cum_esc += 1;
            }
        }
        debug_assert_eq!(cum, PROB_TOTAL);
        self.prob[escape + 1] = cum;
        // Next fold once the deferred counts make up what halving will take away.
        self.update_thresh = PROB_TOTAL - ((cum - odd) >> 1);
        self.update.fill(0);
        self.update[escape] = 1;
        self.update_count = 1;
        debug!(
            "deferred-sum fold: {} unseen symbols, next fold after {} updates",
            cum_esc, self.update_thresh
        );
        if self.tables.is_some() {
            self.tables = Some(self.build_tables());
        }
    }

    fn build_tables(&self) -> DecodeTables {
        let mut prob_to_sym = vec![0; usize::from(PROB_TOTAL)];
        let mut esc_prob_to_sym = vec![0; self.num_syms];
        for i in 0..=self.num_syms {
            for p in self.prob[i]..self.prob[i + 1] {
                prob_to_sym[usize::from(p)] = i as u16;
            }
            if i < self.num_syms {
                for e in self.escape[i]..self.escape[i + 1] {
                    esc_prob_to_sym[usize::from(e)] = i as u16;
                }
            }
        }
        DecodeTables {
            prob_to_sym,
            esc_prob_to_sym,
        }
    }

    /// Look up a symbol in the decoder tables, building them on first use.
    fn lookup(&mut self, pick: impl FnOnce(&DecodeTables) -> u16) -> usize {
        let tables = match self.tables.take() {
            Some(tables) => tables,
            None => self.build_tables(),
        };
        let symbol = pick(&tables);
        self.tables = Some(tables);
        usize::from(symbol)
    }

    fn interval(table: &[u16], symbol: usize) -> (u32, u32) {
        let lt = table[symbol];
        (u32::from(table[symbol + 1] - lt), u32::from(lt))
    }
}

impl<S: Stream> SymbolEncoder<RangeEncoder<S>> for DefSumModel {
    fn encode(&mut self, coder: &mut RangeEncoder<S>, symbol: usize) -> Result<()> {
        let (sy_f, lt_f) = Self::interval(&self.prob, symbol);
        if sy_f != 0 {
            coder.encode_shift(sy_f, lt_f, LOG_PROB_TOTAL)?;
            self.update(symbol);
            return Ok(());
        }
        debug_assert!(symbol != self.num_syms);
        self.encode(coder, self.num_syms)?;
        let (sy_f, lt_f) = Self::interval(&self.escape, symbol);
        let tot_f = u32::from(self.escape[self.num_syms]);
        coder.encode_freq(sy_f, lt_f, tot_f)?;
        self.update(symbol);
        Ok(())
    }
}

impl<S: Stream> SymbolDecoder<RangeDecoder<S>> for DefSumModel {
    fn decode(&mut self, coder: &mut RangeDecoder<S>) -> Result<usize> {
        let prob = coder.decode_cul_shift(LOG_PROB_TOTAL)?;
        let symbol = self.lookup(|tables| tables.prob_to_sym[prob as usize]);
        let (sy_f, lt_f) = Self::interval(&self.prob, symbol);
        coder.decode_update(sy_f, lt_f, u32::from(PROB_TOTAL))?;
        self.update(symbol);
        if symbol != self.num_syms {
            return Ok(symbol);
        }

        // Escapes never fold, so the escape table is still current.
        let tot_f = u32::from(self.escape[self.num_syms]);
        let rank = coder.decode_cul_freq(tot_f)?;
        let symbol = self.lookup(|tables| tables.esc_prob_to_sym[rank as usize]);
        let (sy_f, lt_f) = Self::interval(&self.escape, symbol);
        if sy_f == 0 {
            return Err(Error::DataCorruption(
                "escape decoded to a symbol already seen".into(),
            ));
        }
        coder.decode_update(sy_f, lt_f, tot_f)?;
        self.update(symbol);
        Ok(symbol)
    }
}
