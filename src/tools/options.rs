//! Compression options. Decompression needs none: everything it must know is in the stream.
use std::{fmt::Display, fmt::Formatter};

/// Flag-byte bit selecting the bitstream (Huffman) back end.
pub const FLAG_HUFFMAN: u8 = 0x80;
/// Flag-byte bit selecting deferred-summation literal models in range mode.
pub const FLAG_DEF_SUM: u8 = 0x40;

/// Entropy coding back end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Range coder with adaptive frequency models
    Range,
    /// Bitstream with dynamic Huffman models
    Huffman,
}
impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Frequency model used for literals and match lengths in range mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralModel {
    Fenwick,
    DefSum,
}
impl Display for LiteralModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Entropy coder behind the match engine
    pub backend: Backend,
    /// Model kind for range mode; ignored by the Huffman back end
    pub literal_model: LiteralModel,
}

impl Options {
    pub fn new() -> Self {
        Self {
            backend: Backend::Range,
            literal_model: LiteralModel::Fenwick,
        }
    }

    pub fn huffman() -> Self {
        Self {
            backend: Backend::Huffman,
            ..Self::new()
        }
    }

    pub fn with_literal_model(mut self, literal_model: LiteralModel) -> Self {
        self.literal_model = literal_model;
        self
    }

    /// The flag byte written after the size prefix.
    pub fn flags(&self) -> u8 {
        match (self.backend, self.literal_model) {
            (Backend::Huffman, _) => FLAG_HUFFMAN,
            (Backend::Range, LiteralModel::Fenwick) => 0,
            (Backend::Range, LiteralModel::DefSum) => FLAG_DEF_SUM,
        }
    }

    /// Recover the options a stream was written with from its flag byte.
    pub fn from_flags(flags: u8) -> Self {
        let literal_model = if flags & FLAG_DEF_SUM != 0 {
            LiteralModel::DefSum
        } else {
            LiteralModel::Fenwick
        };
        let backend = if flags & FLAG_HUFFMAN != 0 {
            Backend::Huffman
        } else {
            Backend::Range
        };
        Self {
            backend,
            literal_model,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::{Backend, LiteralModel, Options};

    #[test]
    fn flags_test() {
        assert_eq!(Options::new().flags(), 0x00);
        assert_eq!(Options::huffman().flags(), 0x80);
        let def_sum = Options::new().with_literal_model(LiteralModel::DefSum);
        assert_eq!(def_sum.flags(), 0x40);
        assert_eq!(Options::from_flags(0x40), def_sum);
        assert_eq!(Options::from_flags(0x80).backend, Backend::Huffman);
        assert_eq!(Options::default(), Options::new());
    }
}
