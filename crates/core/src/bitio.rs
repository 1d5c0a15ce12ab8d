//! Bit-level stream writing and tree-walking decode.
//!
//! Both directions are MSB-first: bit `j` of a code lands at bit position
//! `7 - j % 8` of byte `j / 8` in the stream.
//!
//! # Padding Rules
//! - `BitWriter`: pads the final partial byte with zero bits, so every record
//!   payload ends on a byte boundary
//! - `decode_stream`: stops at the last bit of the declared byte count and
//!   consumes the rest of that byte as padding
//!
//! # Resumption
//!
//! `decode_stream` reads from a `BufRead`. It looks at the buffered bytes with
//! `fill_buf` and hands back only the bytes whose bits it used with `consume`,
//! so the stream is left exactly at the start of the next record. Nothing has
//! to be rewound, and non-seekable inputs work the same way.

use crate::codes::CodeTable;
use crate::error::{DecodeError, FormatError, Result};
use crate::frequency::CHUNK_SIZE;
use crate::tree::Node;
use std::io::{self, BufRead, ErrorKind, Read, Write};

/// Default size of the writer's bit buffer, in bytes.
pub const WRITE_BUFFER_SIZE: usize = 4096;

/// Smallest buffer that still fits a maximal code after a flush carries a
/// partial byte over.
const MIN_BUFFER_SIZE: usize = 64;

/// Packs codes MSB-first into a fixed-size buffer and flushes whole bytes to
/// the underlying writer.
///
/// # Invariants
/// - `bit_len <= buf.len() * 8`
/// - bits at positions `>= bit_len` are zero
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    out: W,
    buf: Vec<u8>,
    bit_len: usize,
    bytes_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a writer with the default buffer size.
    pub fn new(out: W) -> Self {
        Self::with_buffer_size(out, WRITE_BUFFER_SIZE)
    }

    /// Create a writer whose bit buffer holds `size` bytes (at least 64).
    pub fn with_buffer_size(out: W, size: usize) -> Self {
        Self {
            out,
            buf: vec![0; size.max(MIN_BUFFER_SIZE)],
            bit_len: 0,
            bytes_written: 0,
        }
    }

    /// Append one code's bits.
    ///
    /// When the code does not fit in the space left, the whole bytes collected
    /// so far are flushed and the partial byte moves to the front.
    pub fn write_code(&mut self, code: &crate::codes::Code) -> io::Result<()> {
        if code.len() > self.buf.len() * 8 - self.bit_len {
            self.flush_whole_bytes()?;
        }

        for j in 0..code.len() {
            if code.bit(j) {
                self.buf[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
            }
            self.bit_len += 1;
        }
        Ok(())
    }

    fn flush_whole_bytes(&mut self) -> io::Result<()> {
        let whole = self.bit_len / 8;
        self.out.write_all(&self.buf[..whole])?;
        self.bytes_written += whole as u64;

        let carry = if self.bit_len % 8 != 0 {
            self.buf[whole]
        } else {
            0
        };
        self.buf.fill(0);
        self.buf[0] = carry;
        self.bit_len %= 8;
        Ok(())
    }

    /// Total bits appended so far, flushed or not.
    pub fn bit_len(&self) -> u64 {
        self.bytes_written * 8 + self.bit_len as u64
    }

    /// Write every remaining bit, zero-padding the last byte.
    ///
    /// Returns the underlying writer and the number of payload bytes written.
    pub fn finish(mut self) -> io::Result<(W, u64)> {
        let tail = self.bit_len.div_ceil(8);
        self.out.write_all(&self.buf[..tail])?;
        self.bytes_written += tail as u64;
        Ok((self.out, self.bytes_written))
    }
}

/// Write the original size as a little-endian signed 64-bit integer.
pub fn write_size<W: Write>(out: &mut W, size: u64) -> Result<()> {
    let size = i64::try_from(size).map_err(|_| FormatError::SizeMismatch {
        expected: i64::MAX as u64,
        actual: size,
    })?;
    out.write_all(&size.to_le_bytes())?;
    Ok(())
}

/// Read the original size written by [`write_size`].
///
/// # Errors
/// - `FormatError::UnexpectedEof` if fewer than 8 bytes remain
/// - `FormatError::NegativeSize` if the stored value is negative
pub fn read_size<R: Read>(input: &mut R) -> Result<u64> {
    let mut raw = [0u8; 8];
    input.read_exact(&mut raw).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => FormatError::UnexpectedEof {
            context: "original size",
        }
        .into(),
        _ => crate::error::Error::from(e),
    })?;

    let size = i64::from_le_bytes(raw);
    u64::try_from(size).map_err(|_| FormatError::NegativeSize { size }.into())
}

/// Write `size`, then the code for every byte of `source`.
///
/// `size` must be the byte count the code table was built from.
///
/// Returns the number of payload bytes written (excluding the size field).
///
/// # Errors
/// - `FormatError::UnknownSymbol` if a source byte has no code
/// - `FormatError::SizeMismatch` if `source` does not hold exactly `size` bytes
pub fn write_encoded_stream<R: Read, W: Write>(
    out: &mut W,
    codes: &CodeTable,
    mut source: R,
    size: u64,
) -> Result<u64> {
    write_size(out, size)?;

    let mut writer = BitWriter::new(&mut *out);
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut read_total = 0u64;

    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        read_total += n as u64;

        for &byte in &chunk[..n] {
            let code = codes
                .get(byte)
                .ok_or(FormatError::UnknownSymbol { symbol: byte })?;
            writer.write_code(code)?;
        }
    }

    if read_total != size {
        return Err(FormatError::SizeMismatch {
            expected: size,
            actual: read_total,
        }
        .into());
    }

    let (_, payload_bytes) = writer.finish()?;
    Ok(payload_bytes)
}

/// Decode `expected` bytes from `input` by walking `tree`, writing them to `out`.
///
/// On success the input is positioned at the first byte after this payload's
/// padding. Returns the number of payload bytes consumed.
///
/// # Errors
/// - `DecodeError::Truncated` if the input ends before `expected` bytes decode
/// - `Error::Io` on read or write failure
pub fn decode_stream<R: BufRead, W: Write>(
    input: &mut R,
    tree: &Node,
    expected: u64,
    out: &mut W,
) -> Result<u64> {
    if expected == 0 {
        return Ok(0);
    }

    let mut decoded = 0u64;
    let mut consumed = 0u64;
    let mut cursor = tree;
    let mut pending = Vec::with_capacity(CHUNK_SIZE);

    loop {
        let chunk = match input.fill_buf() {
            Ok(chunk) => chunk,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if chunk.is_empty() {
            return Err(DecodeError::Truncated { expected, decoded }.into());
        }

        let mut used = chunk.len();
        let mut done = false;

        'bytes: for (i, &byte) in chunk.iter().enumerate() {
            for bit in 0..8 {
                let right = byte & (0x80 >> bit) != 0;

                // A leaf root (single-symbol tree) matches on every bit.
                if let Node::Internal { left, right: r, .. } = cursor {
                    cursor = if right { &**r } else { &**left };
                }
                let Node::Leaf { symbol, .. } = cursor else {
                    continue;
                };

                pending.push(*symbol);
                cursor = tree;
                decoded += 1;

                if pending.len() == CHUNK_SIZE {
                    out.write_all(&pending)?;
                    pending.clear();
                }
                if decoded == expected {
                    // Rest of this byte is padding.
                    used = i + 1;
                    done = true;
                    break 'bytes;
                }
            }
        }

        input.consume(used);
        consumed += used as u64;

        if done {
            out.write_all(&pending)?;
            return Ok(consumed);
        }
    }
}
