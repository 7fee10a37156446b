//! Append-only artifact writer shared by all workers of one operation.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
pub struct ResultSink {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
    written: AtomicU64,
}

impl ResultSink {
    /// Create (or truncate) the artifact at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            out: Mutex::new(BufWriter::new(file)),
            written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` plus a newline. The whole line is written under the lock.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{}", line)?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Flush and close the artifact, returning the number of lines written.
    /// A sink dropped without `finish` still flushes on a best-effort basis.
    pub fn finish(self) -> io::Result<u64> {
        let written = self.written.load(Ordering::Relaxed);
        let mut out = self.out.into_inner().unwrap_or_else(PoisonError::into_inner);
        out.flush()?;
        Ok(written)
    }
}
