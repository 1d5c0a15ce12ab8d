//! Output placement for extracted records.
//!
//! Record names are stored exactly as they were given at compression time.
//! On extraction they are made relative (root, prefix and `..` components
//! dropped) and joined under the output directory. Missing parent
//! directories are created, and an existing file is never overwritten: the
//! first free name among `name`, `name.1`, `name.2`, ... is used.

use archiver_core::error::FormatError;
use archiver_core::{OutputSink, Result};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

/// Map a stored record name to a path relative to the output directory.
///
/// Returns `None` if nothing usable remains.
pub fn sanitize_record_name(name: &str) -> Option<PathBuf> {
    let relative: PathBuf = Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            Component::Prefix(_) | Component::RootDir | Component::CurDir | Component::ParentDir => None,
        })
        .collect();

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// Create every missing directory above `path`.
pub fn create_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// `path` with `.n` appended to its file name.
fn numbered(path: &Path, n: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// First of `path`, `path.1`, `path.2`, ... that does not exist yet.
pub fn unique_output_path(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    let mut n = 0;
    while candidate.exists() {
        n += 1;
        candidate = numbered(path, n);
    }
    candidate
}

/// Create a new file at the first free name derived from `path`.
///
/// Uses `create_new`, so a file that appears between the check and the
/// open is skipped rather than overwritten.
pub fn create_unique_file(path: &Path) -> io::Result<(File, PathBuf)> {
    create_parent_dirs(path)?;

    let mut candidate = unique_output_path(path);
    let mut n = 0;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                n += 1;
                candidate = unique_output_path(&numbered(path, n));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Writes extracted records as files under a root directory.
#[derive(Debug)]
pub struct FsSink {
    root: PathBuf,
    current: Option<PathBuf>,
    /// Files written so far, in archive order
    pub written: Vec<PathBuf>,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current: None,
            written: Vec::new(),
        }
    }
}

impl OutputSink for FsSink {
    type Writer = BufWriter<File>;

    fn create(&mut self, name: &str) -> Result<Self::Writer> {
        let relative = sanitize_record_name(name).ok_or(FormatError::InvalidName)?;
        let (file, path) = create_unique_file(&self.root.join(relative))?;

        tracing::debug!(record = name, path = %path.display(), "extracting");
        self.current = Some(path);
        Ok(BufWriter::new(file))
    }

    fn complete(&mut self, _name: &str, mut writer: Self::Writer) -> Result<()> {
        writer.flush()?;
        if let Some(path) = self.current.take() {
            self.written.push(path);
        }
        Ok(())
    }

    fn discard(&mut self, name: &str, writer: Self::Writer) -> Result<()> {
        drop(writer);
        if let Some(path) = self.current.take() {
            tracing::debug!(record = name, path = %path.display(), "removing partial output");
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
