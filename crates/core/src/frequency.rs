//! Byte frequency analysis.
//!
//! One pass over the source, in fixed-size chunks, producing a 256-entry
//! count table and the total byte count. An all-zero table (empty source)
//! is valid; the tree builder turns it into an empty record.

use crate::error::Result;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Number of distinct symbols in the byte alphabet.
pub const ALPHABET_SIZE: usize = 256;

/// Size of each read from the source during a pass.
pub const CHUNK_SIZE: usize = 4096;

/// Per-symbol occurrence counts for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; ALPHABET_SIZE],
    total: u64,
}

impl FrequencyTable {
    /// Create an all-zero table.
    pub fn new() -> Self {
        Self {
            counts: [0; ALPHABET_SIZE],
            total: 0,
        }
    }

    /// Count the bytes of an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::new();
        table.update(data);
        table
    }

    /// Count every byte of `reader` until end of stream.
    ///
    /// # Errors
    /// Propagates any read error other than `Interrupted`.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut table = Self::new();
        let mut chunk = [0u8; CHUNK_SIZE];

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            table.update(&chunk[..n]);
        }

        Ok(table)
    }

    fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.counts[byte as usize] += 1;
        }
        self.total += data.len() as u64;
    }

    /// Occurrences of `symbol`.
    pub fn count(&self, symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }

    /// Total bytes counted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of symbols with a non-zero count.
    pub fn distinct_symbols(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// True when no bytes were counted.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Symbols with a non-zero count, in ascending symbol order.
    pub fn present(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as u8, count))
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Count the bytes of the file at `path`.
///
/// # Errors
/// `Error::Io` if the file cannot be opened or read.
pub fn compute_frequencies(path: &Path) -> Result<FrequencyTable> {
    let file = File::open(path)?;
    FrequencyTable::from_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_counts_and_total() {
        let table = FrequencyTable::from_bytes(b"aaabbbc");

        assert_eq!(table.count(b'a'), 3);
        assert_eq!(table.count(b'b'), 3);
        assert_eq!(table.count(b'c'), 1);
        assert_eq!(table.count(b'z'), 0);
        assert_eq!(table.total(), 7);
        assert_eq!(table.distinct_symbols(), 3);
    }

    #[test]
    fn test_empty_input() {
        let table = FrequencyTable::from_bytes(b"");
        assert!(table.is_empty());
        assert_eq!(table.distinct_symbols(), 0);
        assert_eq!(table.present().count(), 0);
    }

    #[test]
    fn test_reader_spans_chunks() {
        let data: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let table = FrequencyTable::from_reader(Cursor::new(&data)).unwrap();

        assert_eq!(table, FrequencyTable::from_bytes(&data));
        assert_eq!(table.total(), data.len() as u64);
        assert_eq!(table.distinct_symbols(), 251);
    }

    #[test]
    fn test_present_is_ascending() {
        let table = FrequencyTable::from_bytes(b"zza");
        let present: Vec<(u8, u64)> = table.present().collect();
        assert_eq!(present, vec![(b'a', 1), (b'z', 2)]);
    }

    #[test]
    fn test_compute_frequencies_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.bin");
        std::fs::write(&path, [0u8, 0, 255]).unwrap();

        let table = compute_frequencies(&path).unwrap();
        assert_eq!(table.count(0), 2);
        assert_eq!(table.count(255), 1);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = compute_frequencies(&dir.path().join("missing"));
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }
}
