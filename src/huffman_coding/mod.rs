//! The huffman module provides the bitstream back end's entropy coder.
//!
//! Codes adapt symbol by symbol: encoder and decoder update identical trees after every symbol,
//! so no code tables are ever transmitted.
//!
pub mod huffman;

pub use huffman::Huffman;
