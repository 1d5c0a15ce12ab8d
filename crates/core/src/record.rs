//! Archive record framing.
//!
//! One record per input file, written back to back with no global header.
//!
//! # Record Format
//!
//! ```text
//! +---------------------+
//! | filename            |  UTF-8 bytes, no NUL
//! +---------------------+
//! | 0x00                |  filename terminator
//! +---------------------+
//! | tree                |  preorder tags (see `tree`), or 0x02 if the
//! | (variable)          |  file was empty
//! +---------------------+
//! | original_size (8)   |  i64 little-endian
//! +---------------------+
//! | payload             |  packed codes, zero-padded to a byte boundary;
//! | (variable)          |  absent when original_size is 0
//! +---------------------+
//! ```
//!
//! A record is assembled in memory and written with a single `write_all`, so
//! a failure while encoding one file never leaves a partial record behind.

use crate::bitio::{decode_stream, read_size, write_encoded_stream, write_size};
use crate::codes::build_codes;
use crate::error::{FormatError, Result};
use crate::frequency::FrequencyTable;
use crate::tree::{build_tree, deserialize_record_tree, serialize_record_tree, Node};
use std::io::{BufRead, Read, Seek, SeekFrom, Write};

/// Longest filename accepted, in bytes, excluding the terminator.
pub const MAX_NAME_LEN: usize = 4096;

/// Size of the original-size field.
pub const SIZE_FIELD_LEN: usize = 8;

/// What was written for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStats {
    pub name: String,
    /// Bytes in the source file
    pub original_size: u64,
    /// Symbols with a non-zero count
    pub distinct_symbols: usize,
    /// Bytes in the tree slot
    pub tree_bytes: usize,
    /// Bytes in the padded payload
    pub payload_bytes: u64,
}

impl RecordStats {
    /// Total bytes this record occupies in the archive.
    pub fn record_bytes(&self) -> u64 {
        (self.name.len() + 1 + self.tree_bytes + SIZE_FIELD_LEN) as u64 + self.payload_bytes
    }
}

/// Everything before a record's payload.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub name: String,
    pub tree: Option<Node>,
    pub original_size: u64,
}

impl RecordHeader {
    /// Bytes occupied by the name, tree slot and size field.
    pub fn header_bytes(&self) -> u64 {
        (self.name.len() + 1 + record_tree_len(self.tree.as_ref()) + SIZE_FIELD_LEN) as u64
    }

    pub fn distinct_symbols(&self) -> usize {
        self.tree.as_ref().map_or(0, Node::leaf_count)
    }
}

/// Encoded length of a record's tree slot.
///
/// A tree with `n` leaves has `n - 1` internal nodes: `2n + (n - 1)` bytes.
pub fn record_tree_len(tree: Option<&Node>) -> usize {
    match tree {
        None => 1,
        Some(node) => 3 * node.leaf_count() - 1,
    }
}

/// Encode `source` as one record named `name` and write it to `out`.
///
/// The source is read twice: once to count frequencies, then rewound and
/// read again to encode.
///
/// # Errors
/// - `FormatError::InvalidName` / `NameTooLong` for an unusable name
/// - `Error::Io` if the source cannot be read or `out` cannot be written
/// - `FormatError::SizeMismatch` if the source changed between passes
pub fn write_record<S, W>(out: &mut W, name: &str, mut source: S) -> Result<RecordStats>
where
    S: Read + Seek,
    W: Write,
{
    validate_name(name)?;

    let freqs = FrequencyTable::from_reader(&mut source)?;
    source.seek(SeekFrom::Start(0))?;
    let tree = build_tree(&freqs)?;

    let mut record = Vec::new();
    record.extend_from_slice(name.as_bytes());
    record.push(0);

    let tree_slot = serialize_record_tree(tree.as_ref());
    record.extend_from_slice(&tree_slot);

    let payload_bytes = match &tree {
        Some(tree) => {
            let codes = build_codes(tree);
            write_encoded_stream(&mut record, &codes, source, freqs.total())?
        }
        None => {
            write_size(&mut record, 0)?;
            0
        }
    };

    out.write_all(&record)?;

    let stats = RecordStats {
        name: name.to_string(),
        original_size: freqs.total(),
        distinct_symbols: freqs.distinct_symbols(),
        tree_bytes: tree_slot.len(),
        payload_bytes,
    };
    tracing::debug!(
        record = name,
        original_size = stats.original_size,
        symbols = stats.distinct_symbols,
        record_bytes = stats.record_bytes(),
        "wrote record"
    );
    Ok(stats)
}

/// Read the name, tree slot and size of the next record.
///
/// Returns `None` when the input is exhausted exactly at a record boundary.
///
/// # Errors
/// - `FormatError::UnexpectedEof` if the input ends inside the header
/// - `FormatError::TreeSizeMismatch` if the tree and size disagree
/// - any tree deserialization error
pub fn read_record_header<R: BufRead>(input: &mut R) -> Result<Option<RecordHeader>> {
    let name = match read_name(input)? {
        Some(name) => name,
        None => return Ok(None),
    };

    let header = read_header_body(input, &name).map_err(|e| e.in_record(&name))?;
    Ok(Some(header))
}

fn read_header_body<R: BufRead>(input: &mut R, name: &str) -> Result<RecordHeader> {
    let tree = deserialize_record_tree(input)?;
    let original_size = read_size(input)?;

    let symbols = tree.as_ref().map_or(0, Node::leaf_count);
    if (symbols == 0) != (original_size == 0) {
        return Err(FormatError::TreeSizeMismatch {
            size: original_size,
            symbols,
        }
        .into());
    }

    Ok(RecordHeader {
        name: name.to_string(),
        tree,
        original_size,
    })
}

/// Decode the payload that follows `header`, writing the original bytes to `out`.
///
/// Returns the number of payload bytes consumed from `input`.
pub fn read_record_payload<R: BufRead, W: Write>(
    input: &mut R,
    header: &RecordHeader,
    out: &mut W,
) -> Result<u64> {
    match &header.tree {
        Some(tree) => decode_stream(input, tree, header.original_size, out),
        None => Ok(0),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.as_bytes().contains(&0) {
        return Err(FormatError::InvalidName.into());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FormatError::NameTooLong { max: MAX_NAME_LEN }.into());
    }
    Ok(())
}

fn read_name<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut raw = Vec::new();
    input
        .by_ref()
        .take(MAX_NAME_LEN as u64 + 1)
        .read_until(0, &mut raw)?;

    match raw.last().copied() {
        None => Ok(None),
        Some(0) => {
            raw.pop();
            if raw.is_empty() {
                return Err(FormatError::InvalidName.into());
            }
            String::from_utf8(raw)
                .map(Some)
                .map_err(|_| FormatError::InvalidName.into())
        }
        Some(_) if raw.len() > MAX_NAME_LEN => {
            Err(FormatError::NameTooLong { max: MAX_NAME_LEN }.into())
        }
        Some(_) => Err(FormatError::UnexpectedEof { context: "filename" }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    fn record_bytes(name: &str, data: &[u8]) -> (Vec<u8>, RecordStats) {
        let mut out = Vec::new();
        let stats = write_record(&mut out, name, Cursor::new(data)).unwrap();
        (out, stats)
    }

    fn read_back(input: &mut Cursor<Vec<u8>>) -> (RecordHeader, Vec<u8>) {
        let header = read_record_header(input).unwrap().unwrap();
        let mut data = Vec::new();
        read_record_payload(input, &header, &mut data).unwrap();
        (header, data)
    }

    #[test]
    fn test_record_layout() {
        let (bytes, stats) = record_bytes("ab.txt", b"aaabbbc");

        assert!(bytes.starts_with(b"ab.txt\0"));
        assert_eq!(stats.original_size, 7);
        assert_eq!(stats.distinct_symbols, 3);
        assert_eq!(stats.tree_bytes, 8);
        assert_eq!(stats.payload_bytes, 2);
        assert_eq!(stats.record_bytes(), bytes.len() as u64);

        let size_at = 7 + stats.tree_bytes;
        assert_eq!(&bytes[size_at..size_at + 8], &7i64.to_le_bytes());
    }

    #[test]
    fn test_empty_file_record() {
        let (bytes, stats) = record_bytes("empty", b"");

        let mut expected = b"empty\0\x02".to_vec();
        expected.extend_from_slice(&0i64.to_le_bytes());
        assert_eq!(bytes, expected);
        assert_eq!(stats.payload_bytes, 0);

        let mut input = Cursor::new(bytes);
        let (header, data) = read_back(&mut input);
        assert_eq!(header.name, "empty");
        assert!(header.tree.is_none());
        assert!(data.is_empty());
        assert!(read_record_header(&mut input).unwrap().is_none());
    }

    #[test]
    fn test_two_records_back_to_back() {
        let (mut bytes, _) = record_bytes("one", b"aaaa");
        let (second, _) = record_bytes("two", b"hello, world");
        bytes.extend_from_slice(&second);

        let mut input = Cursor::new(bytes);
        let (first, data) = read_back(&mut input);
        assert_eq!((first.name.as_str(), data.as_slice()), ("one", &b"aaaa"[..]));

        let (next, data) = read_back(&mut input);
        assert_eq!((next.name.as_str(), data.as_slice()), ("two", &b"hello, world"[..]));

        assert!(read_record_header(&mut input).unwrap().is_none());
    }

    #[test]
    fn test_header_bytes_matches_layout() {
        let (bytes, stats) = record_bytes("notes", b"mississippi");
        let header = read_record_header(&mut Cursor::new(bytes)).unwrap().unwrap();

        assert_eq!(header.distinct_symbols(), 4);
        assert_eq!(
            header.header_bytes() + stats.payload_bytes,
            stats.record_bytes()
        );
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut out = Vec::new();
        for name in ["", "a\0b"] {
            let result = write_record(&mut out, name, Cursor::new(b"x"));
            assert!(matches!(result, Err(Error::Format(FormatError::InvalidName))));
        }

        let long = "n".repeat(MAX_NAME_LEN + 1);
        let result = write_record(&mut out, &long, Cursor::new(b"x"));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::NameTooLong { .. }))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unterminated_name() {
        let result = read_record_header(&mut Cursor::new(b"partial".to_vec()));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::UnexpectedEof { context: "filename" }))
        ));
    }

    #[test]
    fn test_truncated_header_names_record() {
        let (bytes, _) = record_bytes("cut.bin", b"abcdefabc");

        // Cut inside the tree.
        let mut input = Cursor::new(bytes[..12].to_vec());
        match read_record_header(&mut input) {
            Err(Error::Record { name, source }) => {
                assert_eq!(name, "cut.bin");
                assert!(matches!(
                    *source,
                    Error::Format(FormatError::UnexpectedEof { .. })
                ));
            }
            other => panic!("expected record error, got {other:?}"),
        }
    }

    #[test]
    fn test_size_without_tree_rejected() {
        let mut bytes = b"bad\0\x02".to_vec();
        bytes.extend_from_slice(&3i64.to_le_bytes());

        let result = read_record_header(&mut Cursor::new(bytes));
        assert!(matches!(
            result.unwrap_err().root(),
            Error::Format(FormatError::TreeSizeMismatch { size: 3, symbols: 0 })
        ));
    }
}
