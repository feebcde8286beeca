//! The LZP match engine: a sliding history window plus context-hash prediction tables.
//!
//! For each position, the preceding four bytes form a context. Three direct-mapped tables,
//! keyed by hashes of the order-4, order-3 and order-2 contexts, remember where that context
//! was last seen and how long the match found there was. A prediction is only accepted when
//! the bytes before the remembered position really do equal the current context, so hash
//! collisions never produce a match.
//!
//! Encoder and decoder run identical windows, so a prediction costs nothing to transmit; only
//! the length actually matched is coded.

pub const LOG_WINDOW_SIZE: u32 = 20;
pub const WINDOW_SIZE: usize = 1 << LOG_WINDOW_SIZE;
pub const WINDOW_MASK: usize = WINDOW_SIZE - 1;
pub const MAX_MATCH_LEN: usize = WINDOW_SIZE - 1;

const CTXT4_TABLE_SIZE: usize = 1 << 16;
const CTXT3_TABLE_SIZE: usize = 1 << 12;
const CTXT2_TABLE_SIZE: usize = 1 << 16;

/// Bytes the window starts with, so the first positions already have a full context.
const SEED: &[u8; 4] = b"cSa ";

/// A predicted match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Window position the match copies from.
    pub pos: usize,
    /// Length of the match last coded from this context, at least 1.
    pub prev_len: usize,
    /// Context order (4, 3 or 2) that made the prediction.
    pub order: u32,
}

#[derive(Debug)]
pub struct Window {
    buffer: Vec<u8>,
    pos: usize,
    ctxt4: Vec<u64>,
    ctxt3: Vec<u64>,
    ctxt2: Vec<u64>,
}

impl Window {
    /// A window sized for `max_size` bytes of data (the full window when unknown or larger).
    pub fn new(max_size: Option<u64>) -> Self {
        let len = max_size
            .and_then(|size| usize::try_from(size).ok())
            .map_or(WINDOW_SIZE, |size| size.saturating_add(SEED.len()).min(WINDOW_SIZE));
        let mut window = Self {
            buffer: vec![0; len],
            pos: 0,
            ctxt4: vec![0; CTXT4_TABLE_SIZE],
            ctxt3: vec![0; CTXT3_TABLE_SIZE],
            ctxt2: vec![0; CTXT2_TABLE_SIZE],
        };
        for &byte in SEED {
            window.put(byte);
        }
        window
    }

    /// Current write position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Append a byte, wrapping at the window size.
    pub fn put(&mut self, byte: u8) {
        if let Some(slot) = self.buffer.get_mut(self.pos) {
            *slot = byte;
        }
        self.pos += 1;
        if self.pos == WINDOW_SIZE {
            self.pos = 0;
        }
    }

    /// Byte at `pos`, taken modulo the window size.
    pub fn get(&self, pos: usize) -> u8 {
        self.buffer.get(pos & WINDOW_MASK).copied().unwrap_or(0)
    }

    /// The byte just before the write position.
    pub fn last_byte(&self) -> u8 {
        self.get(self.pos + WINDOW_SIZE - 1)
    }

    /// The `n` bytes before `pos`, big-endian.
    pub fn context(&self, pos: usize, n: usize) -> u32 {
        (1..=n).rev().fold(0, |c, back| {
            c << 8 | u32::from(self.get(pos + WINDOW_SIZE - back))
        })
    }

    fn hashes(c: u32) -> (usize, usize, usize) {
        let h4 = ((c >> 15) ^ c) as usize & (CTXT4_TABLE_SIZE - 1);
        let h3 = ((c >> 11) ^ c) as usize & (CTXT3_TABLE_SIZE - 1);
        let h2 = c as usize & (CTXT2_TABLE_SIZE - 1);
        (h4, h3, h2)
    }

    fn unpack(entry: u64, order: u32) -> Match {
        let q = entry - 1;
        Match {
            pos: q as usize & WINDOW_MASK,
            prev_len: (q >> LOG_WINDOW_SIZE) as usize + 1,
            order,
        }
    }

    /// Look up a prediction for position `s`, then record `s` in all three tables with no
    /// match length. Call [`Window::update`] once the actual length is known.
    pub fn find_match(&mut self, s: usize) -> Option<Match> {
        let c = self.context(s, 4);
        let (h4, h3, h2) = Self::hashes(c);
        let candidates = [
            (self.ctxt4[h4], 4, c),
            (self.ctxt3[h3], 3, c & 0x00ff_ffff),
            (self.ctxt2[h2], 2, c & 0x0000_ffff),
        ];
        let found = candidates
            .into_iter()
            .filter(|&(entry, _, _)| entry != 0)
            .map(|(entry, order, wanted)| (Self::unpack(entry, order), wanted))
            .find(|(hit, wanted)| self.context(hit.pos, hit.order as usize) == *wanted)
            .map(|(hit, _)| hit);
        self.store(h4, h3, h2, s as u64 + 1);
        found
    }

    /// Record that a match of `len` bytes was coded at position `s`.
    pub fn update(&mut self, s: usize, len: usize) {
        let (h4, h3, h2) = Self::hashes(self.context(s, 4));
        let len = len.saturating_sub(1) as u64;
        self.store(h4, h3, h2, (s as u64 | len << LOG_WINDOW_SIZE) + 1);
    }

    fn store(&mut self, h4: usize, h3: usize, h2: usize, entry: u64) {
        self.ctxt4[h4] = entry;
        self.ctxt3[h3] = entry;
        self.ctxt2[h2] = entry;
    }
}

#[cfg(test)]
mod test {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::{Window, MAX_MATCH_LEN, WINDOW_SIZE};

    #[test]
    fn seed_test() {
        let w = Window::new(Some(10));
        assert_eq!(w.pos(), 4);
        assert_eq!(w.context(4, 4), u32::from_be_bytes(*b"cSa "));
        assert_eq!(w.last_byte(), b' ');
    }

    #[test]
    fn unknown_size_test() {
        let mut w = Window::new(None);
        for i in 0..WINDOW_SIZE {
            w.put(i as u8);
        }
        // Wrapped around: four seed bytes were overwritten.
        assert_eq!(w.pos(), 4);
        assert_eq!(w.get(WINDOW_SIZE + 3), 0xff);
    }

    #[test]
    fn prediction_test() {
        let mut w = Window::new(None);
        for &b in b"abcdXabcd" {
            let s = w.pos();
            w.find_match(s);
            w.put(b);
        }
        // Context "abcd" was last seen ahead of the 'X'.
        let hit = w.find_match(w.pos()).unwrap();
        assert_eq!(hit.order, 4);
        assert_eq!(w.get(hit.pos), b'X');
        assert_eq!(hit.prev_len, 1);
    }

    #[test]
    fn length_is_remembered_test() {
        let mut w = Window::new(None);
        for &b in b"wxyz" {
            let s = w.pos();
            w.find_match(s);
            w.put(b);
        }
        let s = w.pos();
        w.find_match(s);
        w.update(s, 300);
        for &b in b"..wxyz" {
            w.put(b);
        }
        let hit = w.find_match(w.pos()).unwrap();
        assert_eq!(hit.pos, s);
        assert_eq!(hit.prev_len, 300);

        w.update(w.pos(), MAX_MATCH_LEN);
        let hit = w.find_match(w.pos()).unwrap();
        assert_eq!(hit.prev_len, MAX_MATCH_LEN);
    }

    #[test]
    fn accepted_hits_replay_context_test() {
        // Pseudo-random bytes over a small alphabet: plenty of hash collisions and short hits.
        let mut w = Window::new(None);
        let mut rng = ChaCha8Rng::seed_from_u64(0x2545_f491);
        let mut hits = 0;
        for _ in 0..200_000 {
            let s = w.pos();
            if let Some(hit) = w.find_match(s) {
                let n = hit.order as usize;
                assert_eq!(w.context(hit.pos, n), w.context(s, n));
                hits += 1;
            }
            w.put(b"ACGT"[rng.gen_range(0..4)]);
        }
        assert!(hits > 0);
    }
}
