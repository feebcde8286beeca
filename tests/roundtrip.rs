use lzp3::compression::simple::{self, Format};
use lzp3::{compress, compress_stream, decompress, BufferStream, LiteralModel, Options, ReadStream};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use simplelog::{Config, LevelFilter, TestLogger};

fn init_logger() {
    // Several tests race to install the logger; only the first one wins.
    let _ = TestLogger::init(LevelFilter::Info, Config::default());
}

fn all_options() -> Vec<Options> {
    vec![
        Options::new(),
        Options::new().with_literal_model(LiteralModel::DefSum),
        Options::huffman(),
    ]
}

/// Text with long and short repeats, the kind of input LZP is built for.
fn corpus() -> Vec<u8> {
    let words = [
        "range ", "coder ", "window ", "context ", "match ", "literal ", "model ", "escape ",
    ];
    let mut rng = ChaCha8Rng::seed_from_u64(12345);
    let mut text = Vec::new();
    while text.len() < 200_000 {
        text.extend_from_slice(words[rng.gen_range(0..words.len())].as_bytes());
        if rng.gen_ratio(1, 97) {
            text.extend_from_slice(b"\n");
        }
    }
    text
}

#[test]
fn large_corpus_test() {
    init_logger();
    let text = corpus();
    for opts in all_options() {
        let packed = compress(&text, &opts).unwrap();
        assert!(packed.len() < text.len() / 3, "{:?}: {}", opts, packed.len());
        assert_eq!(decompress(&packed).unwrap(), text);
    }
}

#[test]
fn window_wrap_test() {
    init_logger();
    // More than one window of data, streamed with no declared size.
    let mut data = corpus();
    data.extend(corpus().iter().rev());
    let mut noise = vec![0_u8; 700_000];
    ChaCha8Rng::seed_from_u64(7).fill(&mut noise[..]);
    data.extend(noise);
    for opts in [Options::new(), Options::huffman()] {
        let mut packed = BufferStream::new();
        compress_stream(&mut ReadStream::new(&data[..]), &mut packed, &opts).unwrap();
        let packed = packed.into_inner().unwrap();
        assert_eq!(decompress(&packed).unwrap(), data);
    }
}

#[test]
fn byte_alphabet_test() {
    init_logger();
    let every: Vec<u8> = (0..=255).chain((0..=255).rev()).cycle().take(5000).collect();
    for opts in all_options() {
        let packed = compress(&every, &opts).unwrap();
        assert_eq!(decompress(&packed).unwrap(), every);
    }
    for format in [Format::DefSum, Format::Fenwick, Format::Huffman, Format::Context1] {
        let packed = simple::compress(format, &every).unwrap();
        assert_eq!(simple::decompress(format, &packed).unwrap(), every);
    }
}

proptest! {
    #[test]
    fn lzp3_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..2000),
        backend in 0..3_usize,
    ) {
        let opts = all_options()[backend];
        let packed = compress(&data, &opts).unwrap();
        prop_assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn lzp3_repetitive_roundtrip(
        pieces in prop::collection::vec(prop::collection::vec(0..4_u8, 1..40), 1..60),
        backend in 0..3_usize,
    ) {
        // Few distinct bytes, so predictions hit often and lengths repeat.
        let data: Vec<u8> = pieces.iter().flat_map(|p| p.iter().chain(p.iter())).copied().collect();
        let opts = all_options()[backend];
        let packed = compress(&data, &opts).unwrap();
        prop_assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn lzp3_unknown_size_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..1000),
        backend in 0..3_usize,
    ) {
        let opts = all_options()[backend];
        let mut packed = BufferStream::new();
        compress_stream(&mut ReadStream::new(&data[..]), &mut packed, &opts).unwrap();
        let packed = packed.into_inner().unwrap();
        prop_assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn order0_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..1000),
        format in 0..5_usize,
    ) {
        let format = [
            Format::NoModel,
            Format::DefSum,
            Format::Fenwick,
            Format::Huffman,
            Format::Context1,
        ][format];
        let packed = simple::compress(format, &data).unwrap();
        prop_assert_eq!(simple::decompress(format, &packed).unwrap(), data);
    }

    #[test]
    fn deterministic_output(data in prop::collection::vec(any::<u8>(), 0..500)) {
        for opts in all_options() {
            prop_assert_eq!(compress(&data, &opts).unwrap(), compress(&data, &opts).unwrap());
        }
    }
}
