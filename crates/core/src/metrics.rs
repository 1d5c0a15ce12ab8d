//! Run statistics for archiving, extraction and listing.
//!
//! The driver feeds one event per record; everything else is derived:
//! - Compression ratio (archive bytes / input bytes)
//! - Throughput over the run's wall-clock duration
//! - Pass/fail based on the number of failed records
//!
//! `ArchiveMetrics` is a plain struct updated from a single thread.

use crate::archive::ExtractedRecord;
use crate::record::RecordStats;
use std::time::{Duration, Instant};

/// Counters for one run of the archiver.
#[derive(Debug, Clone)]
pub struct ArchiveMetrics {
    /// When the run started
    pub start_time: Instant,

    /// When the run ended (set on completion)
    pub end_time: Option<Instant>,

    /// Records written or decoded successfully
    pub files_processed: u64,

    /// Records that failed and were skipped or aborted the run
    pub files_failed: u64,

    /// Original (uncompressed) bytes across processed records
    pub input_bytes: u64,

    /// Archive bytes occupied by processed records
    pub archive_bytes: u64,

    /// Bytes written to extracted files
    pub output_bytes: u64,
}

impl ArchiveMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            files_processed: 0,
            files_failed: 0,
            input_bytes: 0,
            archive_bytes: 0,
            output_bytes: 0,
        }
    }

    /// Mark the run as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Archive bytes per input byte. Returns 0.0 if nothing was processed.
    pub fn compression_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            self.archive_bytes as f64 / self.input_bytes as f64
        }
    }

    /// Original bytes per second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.input_bytes as f64 / duration_secs
        }
    }

    pub fn record_compressed(&mut self, stats: &RecordStats) {
        self.files_processed += 1;
        self.input_bytes += stats.original_size;
        self.archive_bytes += stats.record_bytes();
    }

    /// A record decoded and written out.
    pub fn record_extracted(&mut self, record: &ExtractedRecord) {
        self.record_listed(record);
        self.output_bytes += record.info.original_size;
    }

    /// A record decoded for verification only.
    pub fn record_listed(&mut self, record: &ExtractedRecord) {
        self.files_processed += 1;
        self.input_bytes += record.info.original_size;
        self.archive_bytes += record.stored_bytes;
    }

    pub fn record_failure(&mut self) {
        self.files_failed += 1;
    }

    /// True when no record failed.
    pub fn succeeded(&self) -> bool {
        self.files_failed == 0
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Archive Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!("Files: {} ok, {} failed", self.files_processed, self.files_failed);
        println!();

        println!("Original: {} bytes ({:.2} MiB)", self.input_bytes, mib(self.input_bytes));
        println!("Archive:  {} bytes ({:.2} MiB)", self.archive_bytes, mib(self.archive_bytes));
        if self.output_bytes > 0 {
            println!("Written:  {} bytes ({:.2} MiB)", self.output_bytes, mib(self.output_bytes));
        }
        println!("Ratio: {:.1}%", self.compression_ratio() * 100.0);
        println!("Throughput: {:.2} MB/s", self.throughput_bps() / 1_000_000.0);
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.succeeded() {
            println!("✓ {} file(s) processed", self.files_processed);
            println!("  {} bytes in {} ms", self.input_bytes, self.duration().as_millis());
        } else {
            println!(
                "✗ {} file(s) failed, {} processed",
                self.files_failed, self.files_processed
            );
        }
    }

    /// Export metrics as `key=value` lines.
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             files_processed={}\n\
             files_failed={}\n\
             input_bytes={}\n\
             archive_bytes={}\n\
             output_bytes={}\n\
             compression_ratio={:.4}\n",
            self.duration().as_millis(),
            self.files_processed,
            self.files_failed,
            self.input_bytes,
            self.archive_bytes,
            self.output_bytes,
            self.compression_ratio(),
        )
    }
}

impl Default for ArchiveMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveReader, ArchiveWriter};
    use std::io::Cursor;

    #[test]
    fn test_metrics_creation() {
        let metrics = ArchiveMetrics::new();
        assert!(metrics.end_time.is_none());
        assert!(metrics.succeeded());
        assert_eq!(metrics.compression_ratio(), 0.0);
    }

    #[test]
    fn test_compression_ratio() {
        let mut metrics = ArchiveMetrics::new();
        metrics.input_bytes = 1000;
        metrics.archive_bytes = 750;

        assert_eq!(metrics.compression_ratio(), 0.75);
    }

    #[test]
    fn test_compress_and_extract_counts_agree() {
        let mut writer = ArchiveWriter::new(Vec::new());
        let mut written = ArchiveMetrics::new();
        for (name, data) in [("a", &b"aaabbbc"[..]), ("b", &b""[..])] {
            let stats = writer.append_bytes(name, data).unwrap();
            written.record_compressed(&stats);
        }
        let archive = writer.finish().unwrap();

        let mut read = ArchiveMetrics::new();
        let mut reader = ArchiveReader::new(Cursor::new(archive.clone()));
        for record in reader.list().unwrap() {
            read.record_extracted(&record);
        }

        assert_eq!(written.files_processed, 2);
        assert_eq!(written.input_bytes, 7);
        assert_eq!(written.archive_bytes, archive.len() as u64);
        assert_eq!(read.archive_bytes, written.archive_bytes);
        assert_eq!(read.output_bytes, 7);
    }

    #[test]
    fn test_failure_marks_run_failed() {
        let mut metrics = ArchiveMetrics::new();
        metrics.record_failure();
        assert!(!metrics.succeeded());
        assert_eq!(metrics.files_failed, 1);
    }

    #[test]
    fn test_throughput() {
        let mut metrics = ArchiveMetrics::new();
        metrics.input_bytes = 1_000_000;

        std::thread::sleep(Duration::from_millis(10));
        metrics.complete();

        assert!(metrics.throughput_bps() > 0.0);
    }

    #[test]
    fn test_export_text() {
        let mut metrics = ArchiveMetrics::new();
        metrics.input_bytes = 1000;
        metrics.archive_bytes = 500;
        metrics.files_processed = 3;

        let text = metrics.export_text();
        assert!(text.contains("input_bytes=1000"));
        assert!(text.contains("archive_bytes=500"));
        assert!(text.contains("files_processed=3"));
        assert!(text.contains("compression_ratio=0.5000"));
    }
}
