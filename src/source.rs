//! Enumeration of candidate dump files.
use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("directory does not exist: {}", .0.display())]
    RootMissing(PathBuf),
}

/// Supplies the immutable list of files an operation runs over.
pub trait FileSource {
    fn files(&self) -> Result<Vec<PathBuf>, SourceError>;
}

/// Every regular `*.txt` file (case-insensitive) below a root, recursively.
#[derive(Debug, Clone)]
pub struct TxtTreeSource {
    root: PathBuf,
}

impl TxtTreeSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl FileSource for TxtTreeSource {
    fn files(&self) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::RootMissing(self.root.clone()));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && is_txt(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_txt(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(".txt"))
        .unwrap_or(false)
}

/// Sum of file sizes in bytes; files that cannot be stat'ed count as zero.
pub fn total_size_bytes(files: &[PathBuf]) -> u64 {
    files
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum()
}
