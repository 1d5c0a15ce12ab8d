//! Error types for the archiver core.
//!
//! Every codec operation returns a structured error instead of panicking or
//! exiting, so the driver decides whether a failed record aborts the run.

use thiserror::Error;

/// Top-level error type for all archive operations.
///
/// Each variant corresponds to a failure domain:
/// - I/O: the underlying file or stream failed
/// - Format: corrupt or truncated record framing
/// - Decode: the payload ran out before the declared size was reached
/// - Queue: priority queue misuse (an internal invariant was broken)
#[derive(Debug, Error)]
pub enum Error {
    /// File or stream I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt or truncated record framing
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// Payload bitstream could not be fully decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Priority queue misuse; unreachable when capacity is sized correctly
    #[error("priority queue error: {0}")]
    Queue(#[from] QueueError),

    /// A failure while processing a named record
    #[error("record {name:?}: {source}")]
    Record {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the record's filename to an error.
    pub fn in_record(self, name: impl Into<String>) -> Self {
        match self {
            Error::Record { .. } => self,
            other => Error::Record {
                name: name.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping any record context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Record { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Record framing errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The stream ended in the middle of a structure
    #[error("unexpected end of archive while reading {context}")]
    UnexpectedEof { context: &'static str },

    /// Tree tag byte was not a leaf or internal marker
    #[error("invalid tree tag {tag:#04x}")]
    InvalidTag { tag: u8 },

    /// The same symbol appeared on two leaves
    #[error("duplicate leaf symbol {symbol:#04x}")]
    DuplicateSymbol { symbol: u8 },

    /// More leaves or levels than a 256-symbol alphabet allows
    #[error("serialized tree exceeds the 256-symbol alphabet")]
    TreeTooLarge,

    /// Declared original size is negative
    #[error("negative original size {size}")]
    NegativeSize { size: i64 },

    /// Filename has no terminator within the allowed length
    #[error("filename longer than {max} bytes")]
    NameTooLong { max: usize },

    /// Filename is empty, contains NUL, or is not UTF-8
    #[error("invalid filename")]
    InvalidName,

    /// A non-empty record arrived with no tree, or an empty one with a size
    #[error("original size {size} does not match tree with {symbols} symbols")]
    TreeSizeMismatch { size: u64, symbols: usize },

    /// Source byte has no code; the source changed after its frequencies were counted
    #[error("source byte {symbol:#04x} has no code")]
    UnknownSymbol { symbol: u8 },

    /// Source changed between the frequency pass and the encoding pass
    #[error("source size mismatch: expected {expected} bytes, read {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// Payload decoding errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload ended before the declared number of bytes was produced
    #[error("payload truncated: decoded {decoded} of {expected} bytes")]
    Truncated { expected: u64, decoded: u64 },
}

/// Priority queue misuse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Push on a queue already holding `capacity` elements
    #[error("queue full: capacity {capacity}")]
    Full { capacity: usize },

    /// Top or pop on an empty queue
    #[error("queue empty")]
    Empty,
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_record_wraps_once() {
        let err = Error::from(DecodeError::Truncated {
            expected: 10,
            decoded: 3,
        })
        .in_record("a.txt")
        .in_record("b.txt");

        match &err {
            Error::Record { name, .. } => assert_eq!(name, "a.txt"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            err.root(),
            Error::Decode(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_display_includes_name() {
        let err = Error::from(FormatError::InvalidTag { tag: 7 }).in_record("notes.md");
        let text = err.to_string();
        assert!(text.contains("notes.md"));
        assert!(text.contains("0x07"));
    }
}
