//! Context1Model: one sub-model per value of the preceding byte.

use super::{SymbolDecoder, SymbolEncoder};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Context1Model<M> {
    models: Vec<M>,
}

impl<M> Context1Model<M> {
    /// `contexts` sub-models, each over an alphabet of `size` symbols.
    pub fn new(factory: impl Fn(usize) -> M, contexts: usize, size: usize) -> Self {
        Self {
            models: (0..contexts).map(|_| factory(size)).collect(),
        }
    }

    pub fn encode<C>(&mut self, coder: &mut C, symbol: usize, context: u8) -> Result<()>
    where
        M: SymbolEncoder<C>,
    {
        self.models[usize::from(context)].encode(coder, symbol)
    }

    pub fn decode<C>(&mut self, coder: &mut C, context: u8) -> Result<usize>
    where
        M: SymbolDecoder<C>,
    {
        self.models[usize::from(context)].decode(coder)
    }
}

#[cfg(test)]
mod test {
    use super::Context1Model;
    use crate::bitstream::stream::{BufferStream, SliceStream};
    use crate::models::FenwickModel;
    use crate::range_coder::{RangeDecoder, RangeEncoder};

    #[test]
    fn contexts_are_independent_test() {
        let text = b"abracadabra abracadabra abracadabra";
        let mut model = Context1Model::new(FenwickModel::with_defaults, 256, 256);
        let mut out = BufferStream::new();
        let mut enc = RangeEncoder::start(&mut out, 0, 0);
        let mut context = b' ';
        for &b in text {
            model.encode(&mut enc, usize::from(b), context).unwrap();
            context = b;
        }
        enc.finish().unwrap();
        let bytes = out.into_inner().unwrap();

        let mut model = Context1Model::new(FenwickModel::with_defaults, 256, 256);
        let mut dec = RangeDecoder::start(SliceStream::new(&bytes), false).unwrap();
        let mut context = b' ';
        for &b in text {
            let s = model.decode(&mut dec, context).unwrap();
            assert_eq!(s, usize::from(b));
            context = b;
        }
        dec.finish().unwrap();
    }
}
