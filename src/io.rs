//! Line scanning over dump files.
//!
//! Every file is read as a sequence of trimmed, non-empty lines. Small files go
//! through a buffered reader; large files are memory-mapped and split with
//! `memchr`. Both paths enforce the same per-line cap and stop the file at the
//! first error, yielding that error exactly once.
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

/// Threshold in bytes above which we attempt to use mmap for reading.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Longest accepted line; anything longer ends the scan of that file.
pub const DEFAULT_MAX_LINE_BYTES: usize = 10 * 1024 * 1024; // 10 MiB

pub type LineIter = Box<dyn Iterator<Item = Result<String, ScanError>> + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("mmap {}: {source}", .path.display())]
    Map { path: PathBuf, source: io::Error },
    #[error("read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("line longer than {limit} bytes in {}", .path.display())]
    LineTooLong { path: PathBuf, limit: usize },
}

impl ScanError {
    /// True when the file could not be opened at all.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, ScanError::Open { .. } | ScanError::Map { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_line_bytes: usize,
    pub mmap_threshold_bytes: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            mmap_threshold_bytes: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }
}

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Iterate lines from a file path using a buffered reader (non-mmap).
pub fn iter_lines_bufread<P: AsRef<Path>>(
    path: P,
    max_line_bytes: usize,
) -> Result<LineIter, ScanError> {
    let path = path.as_ref().to_path_buf();
    let file = File::open(&path).map_err(|source| ScanError::Open {
        path: path.clone(),
        source,
    })?;
    Ok(Box::new(CappedLines {
        reader: BufReader::new(file),
        path,
        max_line_bytes,
        buf: Vec::new(),
        done: false,
    }))
}

/// Iterate lines from a file path using mmap. Empty files are never mapped.
pub fn iter_lines_mmap<P: AsRef<Path>>(
    path: P,
    max_line_bytes: usize,
) -> Result<LineIter, ScanError> {
    let path = path.as_ref().to_path_buf();
    let file = File::open(&path).map_err(|source| ScanError::Open {
        path: path.clone(),
        source,
    })?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ScanError::Map {
        path: path.clone(),
        source,
    })?;
    Ok(Box::new(MmapLines {
        mmap,
        pos: 0,
        path,
        max_line_bytes,
        done: false,
    }))
}

/// Choose mmap or bufread and return an iterator over trimmed, non-empty lines.
pub fn open_lines<P: AsRef<Path>>(path: P, opts: &ScanOptions) -> Result<LineIter, ScanError> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.is_file()
        && meta.len() > 0
        && should_use_mmap(meta.len(), opts.mmap_threshold_bytes)
    {
        iter_lines_mmap(path, opts.max_line_bytes)
    } else {
        iter_lines_bufread(path, opts.max_line_bytes)
    }
}

struct CappedLines<R> {
    reader: R,
    path: PathBuf,
    max_line_bytes: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Iterator for CappedLines<R> {
    type Item = Result<String, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            // One byte past the cap is enough to tell an oversized line apart.
            let limit = self.max_line_bytes as u64 + 1;
            let read = (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf);
            match read {
                Ok(0) => self.done = true,
                Ok(n) => {
                    let content = if self.buf.last() == Some(&b'\n') {
                        n - 1
                    } else {
                        n
                    };
                    if content > self.max_line_bytes {
                        self.done = true;
                        return Some(Err(ScanError::LineTooLong {
                            path: self.path.clone(),
                            limit: self.max_line_bytes,
                        }));
                    }
                    if let Some(line) = line_from_bytes(&self.buf[..content]) {
                        return Some(Ok(line));
                    }
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(ScanError::Read {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
        }
        None
    }
}

struct MmapLines {
    mmap: Mmap,
    pos: usize,
    path: PathBuf,
    max_line_bytes: usize,
    done: bool,
}

impl Iterator for MmapLines {
    type Item = Result<String, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let data: &[u8] = &self.mmap;
            if self.pos >= data.len() {
                self.done = true;
                break;
            }
            let start = self.pos;
            let end = match memchr::memchr(b'\n', &data[start..]) {
                Some(off) => {
                    self.pos = start + off + 1; // skip newline
                    start + off
                }
                None => {
                    // Last line without trailing newline
                    self.pos = data.len();
                    data.len()
                }
            };
            if end - start > self.max_line_bytes {
                self.done = true;
                return Some(Err(ScanError::LineTooLong {
                    path: self.path.clone(),
                    limit: self.max_line_bytes,
                }));
            }
            if let Some(line) = line_from_bytes(&data[start..end]) {
                return Some(Ok(line));
            }
        }
        None
    }
}

/// Decode a raw line, dropping CR and surrounding whitespace. Blank lines
/// return `None`.
fn line_from_bytes(bytes: &[u8]) -> Option<String> {
    let slice = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let text = String::from_utf8_lossy(slice);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
