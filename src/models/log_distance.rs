//! LogDistanceModel: codes integers by bit length, then by the bits below the top one.
//!
//! Small values (0 and 1) and a few negative "extra states" are coded directly through the
//! bit-length model. A value `v >= 2` of bit length `n` is sent as `n`, then as
//! `v - 2^(n-1)` through a model dedicated to length `n`.

use super::{SymbolDecoder, SymbolEncoder};
use crate::error::{Error, Result};
use crate::tools::util::fls;

#[derive(Debug, Clone)]
pub struct LogDistanceModel<M> {
    extra_states: i64,
    /// Bit lengths, shifted up by `extra_states`.
    lg_model: M,
    /// Remainder models for bit lengths `2..=fls(size - 1)`.
    rest_models: Vec<M>,
}

impl<M> LogDistanceModel<M> {
    /// A model for values in `-extra_states..size`.
    ///
    /// `lg_factory` builds the bit-length model; `rest_factory` builds the remainder models,
    /// whose alphabets grow to half of `size`.
    pub fn new(
        size: u64,
        extra_states: u32,
        lg_factory: impl Fn(usize) -> M,
        rest_factory: impl Fn(usize) -> M,
    ) -> Self {
        let bits = fls(size.saturating_sub(1));
        Self {
            extra_states: i64::from(extra_states),
            lg_model: lg_factory((1 + bits + extra_states) as usize),
            rest_models: (2..=bits).map(|i| rest_factory(1 << (i - 1))).collect(),
        }
    }

    pub fn encode<C>(&mut self, coder: &mut C, value: i64) -> Result<()>
    where
        M: SymbolEncoder<C>,
    {
        debug_assert!(value >= -self.extra_states);
        if value < 2 {
            return self
                .lg_model
                .encode(coder, (value + self.extra_states) as usize);
        }
        let lg = fls(value as u64) as usize;
        self.lg_model
            .encode(coder, lg + self.extra_states as usize)?;
        let rest = value as usize & ((1 << (lg - 1)) - 1);
        self.rest_models[lg - 2].encode(coder, rest)
    }

    pub fn decode<C>(&mut self, coder: &mut C) -> Result<i64>
    where
        M: SymbolDecoder<C>,
    {
        let lg = self.lg_model.decode(coder)? as i64 - self.extra_states;
        if lg < 2 {
            return Ok(lg);
        }
        let model = self
            .rest_models
            .get_mut(lg as usize - 2)
            .ok_or_else(|| Error::DataCorruption(format!("bit length {} out of range", lg)))?;
        let rest = model.decode(coder)? as i64;
        Ok((1 << (lg - 1)) + rest)
    }
}

#[cfg(test)]
mod test {
    use super::LogDistanceModel;
    use crate::bitstream::bitreader::BitReader;
    use crate::bitstream::bitwriter::BitWriter;
    use crate::bitstream::stream::{BufferStream, SliceStream};
    use crate::bitstream::Stream;
    use crate::models::NoModel;

    #[test]
    fn every_match_length_test() {
        const SIZE: u64 = 1 << 20;
        let mut model = LogDistanceModel::new(SIZE, 1, NoModel::new, NoModel::new);
        let mut bw = BitWriter::new(BufferStream::new());
        for value in -1..SIZE as i64 {
            model.encode(&mut bw, value).unwrap();
        }
        bw.flush().unwrap();
        let bytes = bw.into_inner().into_inner().unwrap();

        let mut model = LogDistanceModel::new(SIZE, 1, NoModel::new, NoModel::new);
        let mut br = BitReader::new(SliceStream::new(&bytes));
        for value in -1..SIZE as i64 {
            assert_eq!(model.decode(&mut br).unwrap(), value);
        }
    }

    #[test]
    fn alphabet_sizes_test() {
        let model = LogDistanceModel::new(1 << 20, 1, NoModel::new, NoModel::new);
        // 1 + 20 bit lengths + 1 extra state needs 5 bits.
        assert_eq!(model.lg_model.bits(), 5);
        assert_eq!(model.rest_models.len(), 19);
        assert_eq!(model.rest_models[18].bits(), 19);
    }
}
