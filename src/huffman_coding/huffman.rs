//! Adaptive (dynamic) Huffman coding.
//!
//! The tree lives in a flat table. Nodes are kept ordered by weight from the escape node up to
//! the root, and each internal node's children sit at `down` and `down - 1`. Leaves carry even
//! weights and internal nodes odd weights, so the low bit tells the two apart without a
//! separate flag.
//!
//! A symbol not yet in the tree is sent as the code of the escape node followed by the
//! symbol's rank among the unmapped symbols, written LSB first in just enough bits to cover
//! how many remain. The escape node is then split into the new leaf and a fresh escape.

use log::{debug, warn};

use crate::bitstream::{BitSink, BitSource};
use crate::error::{Error, Result};
use crate::models::{SymbolDecoder, SymbolEncoder};

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    up: usize,
    down: usize,
    symbol: usize,
    weight: u32,
}

#[derive(Debug, Clone)]
pub struct Huffman {
    table: Vec<Node>,
    /// Leaf position of each symbol, 0 while unmapped.
    map: Vec<usize>,
    size: usize,
    esc: usize,
    root: usize,
    max_weight: Option<u32>,
    /// Scratch space for the bits of one code, leaf first.
    path: Vec<bool>,
}

impl Huffman {
    /// A model for `size` symbols. The tree is halved whenever the root weight reaches
    /// `max_weight`.
    pub fn new(size: usize, max_weight: Option<u32>) -> Self {
        Self::with_capacity(size, size, max_weight)
    }

    /// A model for `size` symbols whose tree holds at most `capacity` of them.
    pub fn with_capacity(size: usize, capacity: usize, max_weight: Option<u32>) -> Self {
        debug_assert!(size > 0);
        let capacity = if capacity == 0 || capacity > size {
            size
        } else {
            capacity
        };
        let root = 2 * capacity - 1;
        Self {
            table: vec![Node::default(); root + 1],
            map: vec![0; size],
            size,
            esc: root,
            root,
            max_weight,
            path: Vec::new(),
        }
    }

    /// Give `symbol` a leaf by splitting the escape node. Returns the new leaf.
    fn split(&mut self, symbol: usize) -> usize {
        let mut pair = self.esc;
        self.esc -= 1;
        let mut node = self.esc;
        if node != 0 {
            self.table[pair].down = node;
            self.table[pair].weight = 1;
            self.table[node].up = pair;
            self.esc -= 1;
        } else {
            // Last free slot: the symbol takes the escape node itself.
            pair = 0;
            node = 1;
        }
        let leaf = &mut self.table[node];
        leaf.symbol = symbol;
        leaf.weight = 0;
        leaf.down = 0;
        self.map[symbol] = node;

        let esc = &mut self.table[self.esc];
        esc.weight = 0;
        esc.down = 0;
        esc.up = pair;
        node
    }

    /// Swap the leaf at `node` with the highest leaf of equal weight.
    fn leader(&mut self, node: usize) -> usize {
        let weight = self.table[node].weight;
        let mut leader = node;
        while leader < self.root && weight == self.table[leader + 1].weight {
            leader += 1;
        }
        if leader == node {
            return node;
        }
        let symbol = self.table[leader].symbol;
        self.table[leader].symbol = self.table[node].symbol;
        self.table[node].symbol = symbol;
        self.map[self.table[leader].symbol] = leader;
        self.map[symbol] = node;
        leader
    }

    /// Move `node` above its lighter neighbours, keeping each position's parent link.
    fn slide(&mut self, node: usize) -> usize {
        let swap = self.table[node];
        let internal = swap.weight & 1 == 1;
        let mut next = node + 1;
        // An internal node passes every lighter neighbour; a leaf moves up one slot.
        if internal {
            while next < self.root && swap.weight > self.table[next + 1].weight {
                next += 1;
            }
        }

        // Swap contents, but each slot keeps its own parent.
        self.table[node] = self.table[next];
        self.table[next] = swap;
        self.table[next].up = self.table[node].up;
        self.table[node].up = swap.up;

        // Repoint whatever hangs below the two moved nodes.
        if internal {
            let down = swap.down;
            self.table[down].up = next;
            self.table[down - 1].up = next;
            let symbol = self.table[node].symbol;
            self.map[symbol] = node;
        } else {
            let down = self.table[node].down;
            if down != 0 {
                self.table[down - 1].up = node;
                self.table[down].up = node;
            }
            self.map[swap.symbol] = next;
        }
        next
    }

    /// Add one occurrence to the leaf at `node` and restore the ordering above it.
    fn increment(&mut self, mut node: usize) {
        if self.table[node].up == node + 1 {
            // The leaf's parent is its immediate neighbour; bump the leaf in place.
            self.table[node].weight += 2;
            node += 1;
        } else {
            node = self.leader(node);
        }

        // Walk to the root, sliding each node past lighter ones before moving up.
        loop {
            self.table[node].weight += 2;
            let up = self.table[node].up;
            if up == 0 {
                break;
            }
            while node < self.root && self.table[node].weight > self.table[node + 1].weight {
                node = self.slide(node);
            }
            // Internal nodes continue from the parent they had before sliding.
            node = if self.table[node].weight & 1 == 1 {
                up
            } else {
                self.table[node].up
            };
        }

        if let Some(max_weight) = self.max_weight {
            if self.table[self.root].weight >= max_weight {
                self.scale(1);
            }
        }
    }

    /// Divide all leaf weights by `1 << bits`. Leaves that drop to zero are unmapped and
    /// their slots go back to the escape node.
    fn scale(&mut self, bits: u32) {
        let mut node = self.esc;
        while node < self.root {
            node += 1;
            let weight = if self.table[node].weight & 1 == 1 {
                // Internal: sum of the already rescaled children, kept odd.
                let down = self.table[node].down;
                let mut weight = self.table[down].weight & !1;
                if weight != 0 {
                    weight += self.table[down - 1].weight | 1;
                }
                weight
            } else {
                // Leaf: halve, kept even. A leaf that reaches zero goes back to the escape.
                let weight = (self.table[node].weight >> bits) & !1;
                if weight == 0 {
                    let symbol = self.table[node].symbol;
                    self.map[symbol] = 0;
                    let old = self.esc;
                    self.esc += 1;
                    if old != 0 {
                        self.esc += 1;
                    }
                }
                weight
            };
            self.table[node].weight = weight;

            // Rounding can break the ordering; sink the node back into place.
            let mut prev = node;
            while prev > 0 && weight < self.table[prev - 1].weight {
                prev -= 1;
                self.slide(prev);
            }
        }
        let esc = self.esc;
        self.table[esc].down = 0;
        debug!(
            "huffman rescale, {} of {} symbols mapped",
            (self.root - self.esc) / 2,
            self.size
        );
    }

    /// How many bits identify one of the symbols not yet mapped, less one.
    fn id_range(&self) -> usize {
        (self.size - 1).saturating_sub((self.root - self.esc) / 2)
    }

    fn send_id<C: BitSink>(&self, coder: &mut C, symbol: usize) -> Result<()> {
        let mut empty = self.map[..symbol].iter().filter(|&&m| m == 0).count();
        let mut max = self.id_range();
        while max != 0 {
            coder.write_bit(empty & 1 == 1)?;
            empty >>= 1;
            max >>= 1;
        }
        Ok(())
    }

    fn read_id<C: BitSource>(&self, coder: &mut C) -> Result<usize> {
        let mut empty = 0;
        let mut bit = 1;
        let mut max = self.id_range();
        while max != 0 {
            if coder.read_bit()? {
                empty |= bit;
            }
            bit <<= 1;
            max >>= 1;
        }
        self.map
            .iter()
            .enumerate()
            .filter(|(_, &m)| m == 0)
            .nth(empty)
            .map(|(symbol, _)| symbol)
            .ok_or_else(|| {
                warn!("huffman symbol id {} beyond the unmapped symbols", empty);
                Error::DataCorruption("huffman symbol id out of range".into())
            })
    }

    #[cfg(test)]
    fn sibling_property(&self) -> bool {
        self.table[self.esc..=self.root]
            .windows(2)
            .all(|w| w[0].weight <= w[1].weight)
    }
}

impl<C: BitSink> SymbolEncoder<C> for Huffman {
    fn encode(&mut self, coder: &mut C, symbol: usize) -> Result<()> {
        debug_assert!(symbol < self.size);
        let node = self.map[symbol];
        let mut idx = if node == 0 { self.esc } else { node };
        if idx == 0 {
            // The tree is full and cannot take a new symbol.
            return Err(Error::DataCorruption(
                "huffman tree has no room for a new symbol".into(),
            ));
        }

        let mut path = std::mem::take(&mut self.path);
        path.clear();
        while self.table[idx].up != 0 {
            path.push(idx & 1 == 1);
            idx = self.table[idx].up;
        }
        for &bit in path.iter().rev() {
            coder.write_bit(bit)?;
        }
        self.path = path;

        let node = if node == 0 {
            self.send_id(coder, symbol)?;
            self.split(symbol)
        } else {
            node
        };
        self.increment(node);
        Ok(())
    }
}

impl<C: BitSource> SymbolDecoder<C> for Huffman {
    fn decode(&mut self, coder: &mut C) -> Result<usize> {
        let mut node = self.root;
        loop {
            let down = self.table[node].down;
            if down == 0 {
                break;
            }
            node = if coder.read_bit()? { down - 1 } else { down };
        }

        let (symbol, node) = if node == self.esc {
            if self.esc == 0 {
                return Err(Error::DataCorruption(
                    "huffman escape decoded from a full tree".into(),
                ));
            }
            let symbol = self.read_id(coder)?;
            (symbol, self.split(symbol))
        } else {
            (self.table[node].symbol, node)
        };
        self.increment(node);
        Ok(symbol)
    }
}
