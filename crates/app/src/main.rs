//! archive: command-line front end for archiver-core.
//!
//! Compress: every input becomes one record, named by the path as given.
//! A file that fails is reported and skipped; the archive stays valid.
//!
//! Decompress: records are extracted in order under the output directory and
//! extraction stops at the first damaged record.
//!
//! List: every record is decoded and checksummed without writing files.
//!
//! Any failure makes the process exit non-zero.

mod config;
mod paths;

use archiver_core::bitio::WRITE_BUFFER_SIZE;
use archiver_core::{ArchiveMetrics, ArchiveReader, ArchiveWriter, Result};
use config::{print_help, Config, Mode};
use paths::FsSink;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage information");
            return ExitCode::from(2);
        }
    };

    if config.mode == Mode::Help {
        print_help();
        return ExitCode::SUCCESS;
    }

    init_logging(config.verbosity);

    if config.print_config {
        config.print();
    }

    let outcome = match &config.mode {
        Mode::Compress { inputs, archive } => compress(inputs, archive),
        Mode::Decompress { archive, output_dir } => {
            decompress(archive, output_dir.as_deref().unwrap_or(Path::new(".")))
        }
        Mode::List { archive } => list(archive),
        Mode::Help => Ok(ArchiveMetrics::new()),
    };

    match outcome {
        Ok(metrics) => {
            if config.print_metrics {
                metrics.print_summary();
            }
            metrics.print_result();
            if metrics.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Encode `inputs` into a new archive at `archive_path`.
fn compress(inputs: &[PathBuf], archive_path: &Path) -> Result<ArchiveMetrics> {
    let mut metrics = ArchiveMetrics::new();
    let out = BufWriter::with_capacity(WRITE_BUFFER_SIZE, File::create(archive_path)?);
    let mut writer = ArchiveWriter::new(out);

    for input in inputs {
        let Some(name) = input.to_str() else {
            eprintln!("error: {}: file name is not valid UTF-8, skipped", input.display());
            metrics.record_failure();
            continue;
        };

        match writer.append_file(input, name) {
            Ok(stats) => metrics.record_compressed(&stats),
            Err(e) => {
                tracing::warn!(record = name, error = %e, "skipping file");
                eprintln!("error: {}", e);
                metrics.record_failure();
            }
        }
    }

    writer.finish()?;
    metrics.complete();
    tracing::info!(records = metrics.files_processed, archive = %archive_path.display(), "archive written");
    Ok(metrics)
}

/// Extract every record of `archive_path` under `output_dir`.
fn decompress(archive_path: &Path, output_dir: &Path) -> Result<ArchiveMetrics> {
    let mut metrics = ArchiveMetrics::new();
    let mut reader = ArchiveReader::new(BufReader::new(File::open(archive_path)?));
    let mut sink = FsSink::new(output_dir);

    let result = reader.extract_each(&mut sink, |record| metrics.record_extracted(record));
    if let Err(e) = result {
        eprintln!("error: {}", e);
        metrics.record_failure();
    }

    for path in &sink.written {
        println!("{}", path.display());
    }

    metrics.complete();
    Ok(metrics)
}

/// Decode every record of `archive_path` and print a table.
fn list(archive_path: &Path) -> Result<ArchiveMetrics> {
    let mut metrics = ArchiveMetrics::new();
    let mut reader = ArchiveReader::new(BufReader::new(File::open(archive_path)?));

    println!("{:>12} {:>12} {:>8} {:>10}  name", "original", "stored", "symbols", "crc32");
    loop {
        let record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(e) => {
                eprintln!("error: {}", e);
                metrics.record_failure();
                break;
            }
        };

        match record.extract(&mut std::io::sink()) {
            Ok(done) => {
                println!(
                    "{:>12} {:>12} {:>8} {:>10}  {}",
                    done.info.original_size,
                    done.stored_bytes,
                    done.info.distinct_symbols,
                    format!("{:08x}", done.crc32),
                    done.info.name
                );
                metrics.record_listed(&done);
            }
            Err(e) => {
                eprintln!("error: {}", e);
                metrics.record_failure();
                break;
            }
        }
    }

    metrics.complete();
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_compress_then_decompress() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("one.txt"), b"abracadabra").unwrap();
        fs::write(src.join("two.txt"), b"").unwrap();

        let archive = dir.path().join("out.huf");
        let inputs = vec![src.join("one.txt"), src.join("two.txt")];
        let written = compress(&inputs, &archive).unwrap();
        assert!(written.succeeded());
        assert_eq!(written.files_processed, 2);
        assert_eq!(written.archive_bytes, fs::metadata(&archive).unwrap().len());

        let out = dir.path().join("restored");
        let read = decompress(&archive, &out).unwrap();
        assert!(read.succeeded());
        assert_eq!(read.output_bytes, 11);

        // Stored names are absolute here; extraction re-roots them under `out`.
        let relative = src.strip_prefix("/").unwrap();
        assert_eq!(fs::read(out.join(relative).join("one.txt")).unwrap(), b"abracadabra");
        assert!(out.join(relative).join("two.txt").exists());
    }

    #[test]
    fn test_compress_skips_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("here.txt");
        fs::write(&present, b"present").unwrap();

        let archive = dir.path().join("out.huf");
        let inputs = vec![dir.path().join("missing.txt"), present];
        let metrics = compress(&inputs, &archive).unwrap();

        assert!(!metrics.succeeded());
        assert_eq!(metrics.files_failed, 1);
        assert_eq!(metrics.files_processed, 1);

        let listed = list(&archive).unwrap();
        assert!(listed.succeeded());
        assert_eq!(listed.files_processed, 1);
    }

    #[test]
    fn test_list_flags_truncated_archive() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.txt");
        fs::write(&input, b"a reasonably long line of text to encode ".repeat(10)).unwrap();

        let archive = dir.path().join("out.huf");
        compress(&[input], &archive).unwrap();
        let bytes = fs::read(&archive).unwrap();
        fs::write(&archive, &bytes[..bytes.len() - 5]).unwrap();

        let metrics = list(&archive).unwrap();
        assert!(!metrics.succeeded());
        assert_eq!(metrics.files_processed, 0);
    }

    #[test]
    fn test_missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list(&dir.path().join("nope.huf")).is_err());
        assert!(decompress(&dir.path().join("nope.huf"), dir.path()).is_err());
    }
}
