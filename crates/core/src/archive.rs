//! Multi-record archives.
//!
//! `ArchiveWriter` appends one record per source. `ArchiveReader` walks the
//! records strictly in order: each payload must be decoded (or skipped, which
//! also decodes it) before the next header can be found, because payload
//! length is only known by decoding.
//!
//! Where decoded files go is decided by an [`OutputSink`], so the core never
//! touches output paths itself.

use crate::error::{Error, Result};
use crate::record::{read_record_header, read_record_payload, write_record, RecordHeader, RecordStats};
use std::fs::File;
use std::io::{self, BufRead, Cursor, Read, Seek, Write};
use std::path::Path;

/// Appends records to an archive stream.
#[derive(Debug)]
pub struct ArchiveWriter<W: Write> {
    out: W,
    records: u64,
    bytes_written: u64,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            records: 0,
            bytes_written: 0,
        }
    }

    /// Encode a rewindable source as a record named `name`.
    ///
    /// Errors carry the record name. A failed record writes nothing, so the
    /// archive stays valid and later records can still be appended.
    pub fn append<S: Read + Seek>(&mut self, name: &str, source: S) -> Result<RecordStats> {
        let stats = write_record(&mut self.out, name, source).map_err(|e| e.in_record(name))?;
        self.records += 1;
        self.bytes_written += stats.record_bytes();
        Ok(stats)
    }

    /// Encode the file at `path` as a record named `name`.
    pub fn append_file(&mut self, path: &Path, name: &str) -> Result<RecordStats> {
        let file = File::open(path).map_err(|e| Error::from(e).in_record(name))?;
        self.append(name, file)
    }

    /// Encode an in-memory buffer as a record named `name`.
    pub fn append_bytes(&mut self, name: &str, data: &[u8]) -> Result<RecordStats> {
        self.append(name, Cursor::new(data))
    }

    /// Records appended so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Archive bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Summary of one record as seen by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    pub name: String,
    pub original_size: u64,
    pub distinct_symbols: usize,
    /// Offset of the record's first byte in the archive
    pub offset: u64,
}

/// A fully decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub info: RecordInfo,
    /// Bytes the record occupied in the archive
    pub stored_bytes: u64,
    /// CRC-32 of the decoded content
    pub crc32: u32,
}

/// Destination for decoded records.
pub trait OutputSink {
    type Writer: Write;

    /// Open a writer for the record named `name`.
    fn create(&mut self, name: &str) -> Result<Self::Writer>;

    /// Called after a record decoded completely.
    fn complete(&mut self, _name: &str, mut writer: Self::Writer) -> Result<()> {
        writer.flush()?;
        Ok(())
    }

    /// Called when decoding a record failed; the writer holds partial output.
    fn discard(&mut self, _name: &str, _writer: Self::Writer) -> Result<()> {
        Ok(())
    }
}

/// Collects decoded records in memory, in archive order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

impl OutputSink for MemorySink {
    type Writer = Vec<u8>;

    fn create(&mut self, _name: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn complete(&mut self, name: &str, writer: Vec<u8>) -> Result<()> {
        self.files.push((name.to_string(), writer));
        Ok(())
    }
}

struct Pending {
    header: RecordHeader,
    offset: u64,
}

/// Reads records from an archive stream in order.
pub struct ArchiveReader<R: BufRead> {
    input: R,
    pending: Option<Pending>,
    position: u64,
}

impl<R: BufRead> ArchiveReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            pending: None,
            position: 0,
        }
    }

    /// Bytes of the archive consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Advance to the next record.
    ///
    /// If the previous record's payload was never extracted it is decoded into
    /// a sink first, keeping the stream aligned. Returns `None` at the end of
    /// the archive.
    pub fn next_record(&mut self) -> Result<Option<Record<'_, R>>> {
        if let Some(pending) = self.pending.take() {
            tracing::trace!(record = %pending.header.name, "skipping payload");
            self.decode_pending(pending, &mut io::sink())?;
        }

        let offset = self.position;
        let header = match read_record_header(&mut self.input)? {
            Some(header) => header,
            None => return Ok(None),
        };
        self.position += header.header_bytes();
        let info = info_of(&header, offset);
        self.pending = Some(Pending { header, offset });

        Ok(Some(Record { reader: self, info }))
    }

    /// Decode every record into `sink`, stopping at the first failure.
    ///
    /// A record that fails to decode is handed to [`OutputSink::discard`] and
    /// its error, tagged with the record name, is returned.
    pub fn extract_all<S: OutputSink>(&mut self, sink: &mut S) -> Result<Vec<ExtractedRecord>> {
        let mut extracted = Vec::new();
        self.extract_each(sink, |done| extracted.push(done.clone()))?;
        Ok(extracted)
    }

    /// Like [`extract_all`](Self::extract_all), reporting each record to
    /// `on_record` as soon as it completes. Returns the number of records.
    pub fn extract_each<S, F>(&mut self, sink: &mut S, mut on_record: F) -> Result<u64>
    where
        S: OutputSink,
        F: FnMut(&ExtractedRecord),
    {
        let mut count = 0;

        while let Some(record) = self.next_record()? {
            let name = record.info().name.clone();
            let mut writer = sink.create(&name).map_err(|e| e.in_record(&name))?;

            match record.extract(&mut writer) {
                Ok(done) => {
                    sink.complete(&name, writer).map_err(|e| e.in_record(&name))?;
                    on_record(&done);
                    count += 1;
                }
                Err(e) => {
                    if let Err(cleanup) = sink.discard(&name, writer) {
                        tracing::warn!(record = %name, error = %cleanup, "could not discard partial output");
                    }
                    return Err(e);
                }
            }
        }

        Ok(count)
    }

    /// Decode every record without keeping the content, for listing and
    /// integrity checking.
    pub fn list(&mut self) -> Result<Vec<ExtractedRecord>> {
        let mut listed = Vec::new();
        while let Some(record) = self.next_record()? {
            listed.push(record.extract(&mut io::sink())?);
        }
        Ok(listed)
    }

    fn decode_pending<W: Write>(&mut self, pending: Pending, out: &mut W) -> Result<ExtractedRecord> {
        let Pending { header, offset } = pending;
        let mut hashing = HashingWriter::new(out);

        let consumed = read_record_payload(&mut self.input, &header, &mut hashing)
            .map_err(|e| e.in_record(&header.name))?;
        self.position += consumed;

        let crc32 = hashing.finalize();
        tracing::debug!(
            record = %header.name,
            original_size = header.original_size,
            payload_bytes = consumed,
            "decoded record"
        );

        Ok(ExtractedRecord {
            stored_bytes: header.header_bytes() + consumed,
            info: info_of(&header, offset),
            crc32,
        })
    }
}

/// A record whose header has been read and whose payload is next in the stream.
///
/// Dropping it without calling [`Record::extract`] is allowed; the reader
/// skips the payload on the next [`ArchiveReader::next_record`].
pub struct Record<'a, R: BufRead> {
    reader: &'a mut ArchiveReader<R>,
    info: RecordInfo,
}

impl<R: BufRead> Record<'_, R> {
    pub fn info(&self) -> &RecordInfo {
        &self.info
    }

    /// Decode the payload into `out`.
    pub fn extract<W: Write>(self, out: &mut W) -> Result<ExtractedRecord> {
        match self.reader.pending.take() {
            Some(pending) => self.reader.decode_pending(pending, out),
            None => Err(io::Error::new(io::ErrorKind::Other, "record already extracted").into()),
        }
    }
}

fn info_of(header: &RecordHeader, offset: u64) -> RecordInfo {
    RecordInfo {
        name: header.name.clone(),
        original_size: header.original_size,
        distinct_symbols: header.distinct_symbols(),
        offset,
    }
}

/// Passes bytes through while keeping a CRC-32 of everything written.
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: crc32fast::Hasher,
}

impl<'a, W: Write> HashingWriter<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
