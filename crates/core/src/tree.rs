//! Huffman tree construction and preorder (de)serialization.
//!
//! # Building
//!
//! Every symbol with a non-zero count becomes a leaf in a bounded priority
//! queue sized to the number of distinct symbols. The two lightest nodes are
//! popped and joined under a new internal node until one node remains.
//!
//! - 0 symbols: no tree
//! - 1 symbol: the tree is a single leaf
//! - n symbols: n - 1 internal nodes
//!
//! # Serialized Form
//!
//! ```text
//! leaf     := 0x00 symbol
//! internal := 0x01 left right
//! empty    := 0x02            (record root only: file had no bytes)
//! ```
//!
//! Weights are not serialized; a deserialized tree carries zero weights.

use crate::error::{FormatError, QueueError, Result};
use crate::frequency::{FrequencyTable, ALPHABET_SIZE};
use crate::queue::{PriorityQueue, Weighted};
use std::io::{ErrorKind, Read};

/// Tag byte for a leaf, followed by its symbol.
pub const TAG_LEAF: u8 = 0;

/// Tag byte for an internal node, followed by its left then right subtree.
pub const TAG_INTERNAL: u8 = 1;

/// Tag byte standing in for the whole tree when a file has no bytes.
pub const TAG_EMPTY: u8 = 2;

/// Deepest leaf a 256-symbol tree can have.
pub const MAX_DEPTH: usize = ALPHABET_SIZE - 1;

/// A Huffman tree node. Each node exclusively owns its children.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf {
        symbol: u8,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn leaf(symbol: u8, weight: u64) -> Self {
        Node::Leaf { symbol, weight }
    }

    /// Join two subtrees; the new node weighs their sum.
    pub fn join(left: Node, right: Node) -> Self {
        Node::Internal {
            weight: left.weight() + right.weight(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Number of leaves (distinct symbols) under this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Same shape with the same symbols at the same positions; weights ignored.
    pub fn same_shape(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Leaf { symbol: a, .. }, Node::Leaf { symbol: b, .. }) => a == b,
            (
                Node::Internal {
                    left: l1, right: r1, ..
                },
                Node::Internal {
                    left: l2, right: r2, ..
                },
            ) => l1.same_shape(l2) && r1.same_shape(r2),
            _ => false,
        }
    }

    /// Preorder encoding of this tree.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf { symbol, .. } => {
                    out.push(TAG_LEAF);
                    out.push(*symbol);
                }
                Node::Internal { left, right, .. } => {
                    out.push(TAG_INTERNAL);
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        out
    }

    /// Parse one preorder-encoded tree from `reader`.
    ///
    /// # Errors
    /// - `FormatError::UnexpectedEof` if the stream ends mid-tree
    /// - `FormatError::InvalidTag` for any tag other than leaf or internal
    /// - `FormatError::DuplicateSymbol` if a symbol appears on two leaves
    /// - `FormatError::TreeTooLarge` if nesting exceeds the alphabet's depth
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Node> {
        let tag = read_u8(reader)?;
        parse_tree(tag, reader)
    }
}

impl Weighted for Node {
    fn weight(&self) -> u64 {
        Node::weight(self)
    }
}

/// Build the Huffman tree for a frequency table.
///
/// Returns `None` for an empty table.
pub fn build_tree(freqs: &FrequencyTable) -> std::result::Result<Option<Node>, QueueError> {
    let mut queue = PriorityQueue::new(freqs.distinct_symbols());
    for (symbol, count) in freqs.present() {
        queue.push(Node::leaf(symbol, count))?;
    }

    if queue.is_empty() {
        return Ok(None);
    }

    while queue.len() > 1 {
        let left = queue.pop()?;
        let right = queue.pop()?;
        queue.push(Node::join(left, right))?;
    }

    let root = queue.pop()?;
    tracing::trace!(
        symbols = freqs.distinct_symbols(),
        root_weight = root.weight(),
        "built huffman tree"
    );
    Ok(Some(root))
}

/// Encode the tree slot of a record: the tree, or the empty marker.
pub fn serialize_record_tree(tree: Option<&Node>) -> Vec<u8> {
    match tree {
        Some(node) => node.serialize(),
        None => vec![TAG_EMPTY],
    }
}

/// Decode the tree slot of a record.
///
/// The empty marker is accepted only as the first tag.
pub fn deserialize_record_tree<R: Read>(reader: &mut R) -> Result<Option<Node>> {
    match read_u8(reader)? {
        TAG_EMPTY => Ok(None),
        tag => parse_tree(tag, reader).map(Some),
    }
}

fn parse_tree<R: Read>(first_tag: u8, reader: &mut R) -> Result<Node> {
    // Internal nodes still waiting on children; `Some` once the left child is done.
    let mut pending: Vec<Option<Node>> = Vec::new();
    let mut seen = [false; ALPHABET_SIZE];
    let mut tag = first_tag;

    loop {
        let mut node = match tag {
            TAG_LEAF => {
                let symbol = read_u8(reader)?;
                if seen[symbol as usize] {
                    return Err(FormatError::DuplicateSymbol { symbol }.into());
                }
                seen[symbol as usize] = true;
                Node::leaf(symbol, 0)
            }
            TAG_INTERNAL => {
                if pending.len() >= MAX_DEPTH {
                    return Err(FormatError::TreeTooLarge.into());
                }
                pending.push(None);
                tag = read_u8(reader)?;
                continue;
            }
            other => return Err(FormatError::InvalidTag { tag: other }.into()),
        };

        // Attach the finished subtree to its waiting ancestors.
        loop {
            match pending.pop() {
                None => return Ok(node),
                Some(None) => {
                    pending.push(Some(node));
                    break;
                }
                Some(Some(left)) => node = Node::join(left, node),
            }
        }

        tag = read_u8(reader)?;
    }
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    match reader.read_exact(&mut byte) {
        Ok(()) => Ok(byte[0]),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            Err(FormatError::UnexpectedEof { context: "tree" }.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn depth_of(node: &Node, target: u8) -> Option<usize> {
        match node {
            Node::Leaf { symbol, .. } => (*symbol == target).then_some(0),
            Node::Internal { left, right, .. } => depth_of(left, target)
                .or_else(|| depth_of(right, target))
                .map(|d| d + 1),
        }
    }

    #[test]
    fn test_build_aaabbbc() {
        let tree = build_tree(&FrequencyTable::from_bytes(b"aaabbbc"))
            .unwrap()
            .unwrap();

        assert_eq!(tree.weight(), 7);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(depth_of(&tree, b'c'), Some(2));
        assert!(depth_of(&tree, b'a').unwrap() <= 2);
        assert!(depth_of(&tree, b'b').unwrap() <= 2);
    }

    #[test]
    fn test_build_empty() {
        let tree = build_tree(&FrequencyTable::new()).unwrap();
        assert!(tree.is_none());
    }

    #[test]
    fn test_build_single_symbol() {
        let tree = build_tree(&FrequencyTable::from_bytes(b"aaaa"))
            .unwrap()
            .unwrap();

        assert!(matches!(tree, Node::Leaf { symbol: b'a', weight: 4 }));
    }

    #[test]
    fn test_build_full_alphabet() {
        let data: Vec<u8> = (0..=255).collect();
        let tree = build_tree(&FrequencyTable::from_bytes(&data))
            .unwrap()
            .unwrap();

        assert_eq!(tree.leaf_count(), 256);
        // Equal weights give a perfectly balanced tree.
        for symbol in 0..=255u8 {
            assert_eq!(depth_of(&tree, symbol), Some(8));
        }
    }

    #[test]
    fn test_serialize_layout() {
        let tree = Node::join(Node::leaf(b'x', 1), Node::leaf(b'y', 1));
        assert_eq!(tree.serialize(), vec![1, 0, b'x', 0, b'y']);
        assert_eq!(serialize_record_tree(None), vec![TAG_EMPTY]);
    }

    #[test]
    fn test_deserialize_stops_at_tree_end() {
        let bytes = vec![1, 0, b'x', 0, b'y', 0xAA, 0xBB];
        let mut cursor = Cursor::new(bytes);

        let tree = Node::deserialize(&mut cursor).unwrap();
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn test_deserialize_truncated() {
        let result = Node::deserialize(&mut Cursor::new(vec![1, 0, b'x', 1]));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn test_deserialize_invalid_tag() {
        let result = Node::deserialize(&mut Cursor::new(vec![1, 0, b'x', 9]));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::InvalidTag { tag: 9 }))
        ));
    }

    #[test]
    fn test_empty_marker_only_at_root() {
        let root = deserialize_record_tree(&mut Cursor::new(vec![TAG_EMPTY])).unwrap();
        assert!(root.is_none());

        let nested = deserialize_record_tree(&mut Cursor::new(vec![1, TAG_EMPTY]));
        assert!(matches!(
            nested,
            Err(Error::Format(FormatError::InvalidTag { tag: TAG_EMPTY }))
        ));
    }

    #[test]
    fn test_deserialize_duplicate_symbol() {
        let result = Node::deserialize(&mut Cursor::new(vec![1, 0, b'x', 0, b'x']));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::DuplicateSymbol { symbol: b'x' }))
        ));
    }

    #[test]
    fn test_deserialize_depth_bound() {
        let bytes = vec![TAG_INTERNAL; MAX_DEPTH + 1];
        let result = Node::deserialize(&mut Cursor::new(bytes));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::TreeTooLarge))
        ));
    }

    proptest! {
        #[test]
        fn prop_serialize_inverse(data in proptest::collection::vec(any::<u8>(), 1..2000)) {
            let tree = build_tree(&FrequencyTable::from_bytes(&data)).unwrap().unwrap();
            let bytes = tree.serialize();

            let mut cursor = Cursor::new(&bytes);
            let back = Node::deserialize(&mut cursor).unwrap();

            prop_assert!(tree.same_shape(&back));
            prop_assert_eq!(cursor.position() as usize, bytes.len());
            prop_assert_eq!(back.serialize(), bytes);
        }

        #[test]
        fn prop_root_weight_is_total(data in proptest::collection::vec(any::<u8>(), 1..2000)) {
            let tree = build_tree(&FrequencyTable::from_bytes(&data)).unwrap().unwrap();
            prop_assert_eq!(tree.weight(), data.len() as u64);
        }
    }
}
