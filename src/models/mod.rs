//! Adaptive probability models.
//!
//! A model maps symbols of a fixed alphabet onto a coder. Models that need a frequency
//! interface ([`DefSumModel`], [`FenwickModel`]) work only over the range coder; models that
//! only emit bits ([`NoModel`], [`Huffman`]) work over any [`BitSink`]/[`BitSource`].
//!
//! Composite models ([`Context1Model`], [`LogDistanceModel`]) hold sub-models built by a
//! factory, a plain `Fn(usize) -> M` taking the alphabet size. The kind of model is picked
//! once, when the factory is chosen, as a variant of [`RangeModel`] or [`BitModel`].
//!
pub mod context1;
pub mod def_sum;
pub mod fenwick;
pub mod log_distance;
pub mod no_model;

pub use context1::Context1Model;
pub use def_sum::DefSumModel;
pub use fenwick::FenwickModel;
pub use log_distance::LogDistanceModel;
pub use no_model::NoModel;

use crate::bitstream::stream::Stream;
use crate::bitstream::{BitSink, BitSource};
use crate::error::Result;
use crate::huffman_coding::huffman::Huffman;
use crate::range_coder::{RangeDecoder, RangeEncoder};

/// Encodes symbols of its alphabet onto coder `C`.
pub trait SymbolEncoder<C> {
    fn encode(&mut self, coder: &mut C, symbol: usize) -> Result<()>;
}

/// Decodes symbols of its alphabet from coder `C`.
pub trait SymbolDecoder<C> {
    fn decode(&mut self, coder: &mut C) -> Result<usize>;
}

/// The models available over the range coder.
#[derive(Debug, Clone)]
pub enum RangeModel {
    Fenwick(FenwickModel),
    DefSum(DefSumModel),
    Raw(NoModel),
}

impl<S: Stream> SymbolEncoder<RangeEncoder<S>> for RangeModel {
    fn encode(&mut self, coder: &mut RangeEncoder<S>, symbol: usize) -> Result<()> {
        match self {
            RangeModel::Fenwick(model) => model.encode(coder, symbol),
            RangeModel::DefSum(model) => model.encode(coder, symbol),
            RangeModel::Raw(model) => model.encode(coder, symbol),
        }
    }
}

impl<S: Stream> SymbolDecoder<RangeDecoder<S>> for RangeModel {
    fn decode(&mut self, coder: &mut RangeDecoder<S>) -> Result<usize> {
        match self {
            RangeModel::Fenwick(model) => model.decode(coder),
            RangeModel::DefSum(model) => model.decode(coder),
            RangeModel::Raw(model) => model.decode(coder),
        }
    }
}

/// The models available over a plain bitstream.
#[derive(Debug, Clone)]
pub enum BitModel {
    Huffman(Huffman),
    Raw(NoModel),
}

impl<C: BitSink> SymbolEncoder<C> for BitModel {
    fn encode(&mut self, coder: &mut C, symbol: usize) -> Result<()> {
        match self {
            BitModel::Huffman(model) => model.encode(coder, symbol),
            BitModel::Raw(model) => model.encode(coder, symbol),
        }
    }
}

impl<C: BitSource> SymbolDecoder<C> for BitModel {
    fn decode(&mut self, coder: &mut C) -> Result<usize> {
        match self {
            BitModel::Huffman(model) => model.decode(coder),
            BitModel::Raw(model) => model.decode(coder),
        }
    }
}
