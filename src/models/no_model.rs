//! NoModel: every symbol costs the same fixed number of bits.

use super::{SymbolDecoder, SymbolEncoder};
use crate::bitstream::{BitSink, BitSource};
use crate::error::Result;
use crate::tools::util::fls;

#[derive(Debug, Clone, Copy)]
pub struct NoModel {
    bits: u32,
}

impl NoModel {
    /// A model for symbols `0..size`.
    pub fn new(size: usize) -> Self {
        Self {
            bits: fls(size.saturating_sub(1) as u64),
        }
    }

    #[cfg(test)]
    pub(crate) fn bits(&self) -> u32 {
        self.bits
    }
}

impl<C: BitSink> SymbolEncoder<C> for NoModel {
    fn encode(&mut self, coder: &mut C, symbol: usize) -> Result<()> {
        debug_assert!(self.bits == usize::BITS || symbol >> self.bits == 0);
        for i in (0..self.bits).rev() {
            coder.write_bit((symbol >> i) & 1 == 1)?;
        }
        Ok(())
    }
}

impl<C: BitSource> SymbolDecoder<C> for NoModel {
    fn decode(&mut self, coder: &mut C) -> Result<usize> {
        let mut symbol = 0;
        for _ in 0..self.bits {
            symbol = symbol << 1 | usize::from(coder.read_bit()?);
        }
        Ok(symbol)
    }
}

#[cfg(test)]
mod test {
    use super::NoModel;
    use crate::bitstream::bitreader::BitReader;
    use crate::bitstream::bitwriter::BitWriter;
    use crate::bitstream::stream::{BufferStream, SliceStream};
    use crate::bitstream::Stream;
    use crate::models::{SymbolDecoder, SymbolEncoder};

    #[test]
    fn width_test() {
        assert_eq!(NoModel::new(1).bits(), 0);
        assert_eq!(NoModel::new(2).bits(), 1);
        assert_eq!(NoModel::new(256).bits(), 8);
        assert_eq!(NoModel::new(257).bits(), 9);
    }

    #[test]
    fn msb_first_test() {
        let mut model = NoModel::new(16);
        let mut bw = BitWriter::new(BufferStream::new());
        model.encode(&mut bw, 0b1010).unwrap();
        model.encode(&mut bw, 0b0011).unwrap();
        bw.flush().unwrap();
        let bytes = bw.into_inner().into_inner().unwrap();
        assert_eq!(bytes, vec![0b1010_0011]);

        let mut br = BitReader::new(SliceStream::new(&bytes));
        assert_eq!(model.decode(&mut br).unwrap(), 0b1010);
        assert_eq!(model.decode(&mut br).unwrap(), 0b0011);
    }
}
