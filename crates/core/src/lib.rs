//! archiver-core: multi-file Huffman archives
//!
//! This library provides the codec behind the `archive` tool:
//! - Counts byte frequencies and builds one Huffman tree per file
//! - Encodes each file as a self-describing record (name, tree, size, payload)
//! - Concatenates records into an archive with no global header
//! - Decodes records back in order, resuming exactly at each record boundary
//!
//! # Architecture
//!
//! - `queue`: Bounded binary min-heap with stable tie-breaking
//! - `frequency`: Byte frequency counting
//! - `tree`: Huffman tree construction and preorder serialization
//! - `codes`: Prefix code derivation
//! - `bitio`: Bit packing, size field, payload encode/decode
//! - `record`: Single-record framing
//! - `archive`: Multi-record writer and reader
//! - `metrics`: Run statistics
//!
//! # Design Principles
//!
//! - **No panics**: Every failure is a structured, recoverable `Error`
//! - **Deterministic**: The same input always produces the same archive bytes
//! - **Streaming**: Payloads are encoded and decoded in fixed-size buffers
//! - **No paths**: Output placement belongs to an [`OutputSink`] supplied by the caller

pub mod archive;
pub mod bitio;
pub mod codes;
pub mod error;
pub mod frequency;
pub mod metrics;
pub mod queue;
pub mod record;
pub mod tree;

// Re-export commonly used types
pub use archive::{ArchiveReader, ArchiveWriter, ExtractedRecord, MemorySink, OutputSink, RecordInfo};
pub use codes::{build_codes, Code, CodeTable};
pub use error::{Error, Result};
pub use frequency::{compute_frequencies, FrequencyTable};
pub use metrics::ArchiveMetrics;
pub use queue::{PriorityQueue, Weighted};
pub use record::RecordStats;
pub use tree::{build_tree, Node};
