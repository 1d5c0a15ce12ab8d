//! Prefix code derivation from a Huffman tree.
//!
//! A depth-first walk assigns each leaf the path from the root: 0 for a left
//! branch, 1 for a right branch, packed MSB-first. One scratch prefix buffer
//! is threaded through the walk; a bit is set on the way into a right
//! subtree and cleared on the way out.
//!
//! A tree that is a single leaf has no branches. Its symbol gets the one-bit
//! code `0`, and the reader treats any bit at a leaf root as that symbol.

use crate::frequency::{FrequencyTable, ALPHABET_SIZE};
use crate::tree::{Node, MAX_DEPTH};

/// Bytes needed to hold the longest possible code.
const PREFIX_BYTES: usize = (MAX_DEPTH + 7) / 8;

/// One symbol's code: `length` bits packed MSB-first into `bits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    length: u8,
    bits: Vec<u8>,
}

impl Code {
    fn from_prefix(prefix: &[u8; PREFIX_BYTES], depth: usize) -> Self {
        Self {
            length: depth as u8,
            bits: prefix[..depth.div_ceil(8)].to_vec(),
        }
    }

    /// Code length in bits.
    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Packed bits, `ceil(len / 8)` bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Bit `j` of the code (0 = first bit from the root).
    pub fn bit(&self, j: usize) -> bool {
        self.bits[j / 8] & (0x80 >> (j % 8)) != 0
    }

    /// Iterate the code's bits from the root downwards.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(move |j| self.bit(j))
    }
}

/// Symbol-to-code mapping; defined only for symbols present in the tree.
#[derive(Debug, Clone)]
pub struct CodeTable {
    entries: [Option<Code>; ALPHABET_SIZE],
}

impl CodeTable {
    pub fn get(&self, symbol: u8) -> Option<&Code> {
        self.entries[symbol as usize].as_ref()
    }

    /// Number of symbols with a code.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(symbol, code)` pairs in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Code)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(symbol, code)| code.as_ref().map(|c| (symbol as u8, c)))
    }

    /// Payload size in bits for a source with these frequencies.
    pub fn encoded_bits(&self, freqs: &FrequencyTable) -> u64 {
        self.iter()
            .map(|(symbol, code)| freqs.count(symbol) * code.len() as u64)
            .sum()
    }
}

/// Derive the code table for `tree`.
pub fn build_codes(tree: &Node) -> CodeTable {
    let mut table = CodeTable {
        entries: std::array::from_fn(|_| None),
    };
    let mut prefix = [0u8; PREFIX_BYTES];

    match tree {
        Node::Leaf { symbol, .. } => {
            // Single-symbol file: one zero bit per byte.
            table.entries[*symbol as usize] = Some(Code::from_prefix(&prefix, 1));
        }
        Node::Internal { .. } => assign(tree, 0, &mut prefix, &mut table),
    }

    table
}

fn assign(node: &Node, depth: usize, prefix: &mut [u8; PREFIX_BYTES], table: &mut CodeTable) {
    match node {
        Node::Leaf { symbol, .. } => {
            table.entries[*symbol as usize] = Some(Code::from_prefix(prefix, depth));
        }
        Node::Internal { left, right, .. } => {
            assign(left, depth + 1, prefix, table);

            let byte = depth / 8;
            let mask = 0x80 >> (depth % 8);
            prefix[byte] |= mask;
            assign(right, depth + 1, prefix, table);
            prefix[byte] &= !mask;
        }
    }
}
