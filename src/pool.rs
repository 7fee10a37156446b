//! Fixed-size worker pool that fans files out to threads.
//!
//! Each operation builds its own rayon pool so the worker count is exactly
//! what the caller asked for. Every file is handed to one worker once; the
//! unit of work decides what happens to its lines. Per-file failures are
//! logged at the worker boundary and never reach the barrier.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{debug, warn};
use rayon::prelude::*;

use crate::io::ScanError;
use crate::progress::ProgressReporter;

/// Terminal state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Completed,
    FailedOpen,
    FailedScan,
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FileError {
    pub fn outcome(&self) -> FileOutcome {
        match self {
            FileError::Scan(e) if e.is_open_failure() => FileOutcome::FailedOpen,
            _ => FileOutcome::FailedScan,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolSummary {
    pub completed: usize,
    pub failed_open: usize,
    pub failed_scan: usize,
    /// Files never started because a stop was requested.
    pub skipped: usize,
}

impl PoolSummary {
    pub fn failed(&self) -> usize {
        self.failed_open + self.failed_scan
    }
}

#[derive(Default)]
struct Tally {
    completed: AtomicUsize,
    failed_open: AtomicUsize,
    failed_scan: AtomicUsize,
    skipped: AtomicUsize,
}

impl Tally {
    fn record(&self, outcome: FileOutcome) {
        let slot = match outcome {
            FileOutcome::Completed => &self.completed,
            FileOutcome::FailedOpen => &self.failed_open,
            FileOutcome::FailedScan => &self.failed_scan,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    fn into_summary(self) -> PoolSummary {
        PoolSummary {
            completed: self.completed.into_inner(),
            failed_open: self.failed_open.into_inner(),
            failed_scan: self.failed_scan.into_inner(),
            skipped: self.skipped.into_inner(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    stop: Option<Arc<AtomicBool>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            stop: None,
        }
    }

    /// Twice the available parallelism; workers spend most time blocked on I/O.
    pub fn default_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            * 2
    }

    /// Files not yet started are skipped once `flag` is set.
    pub fn with_stop(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Process every file with `unit` and block until all of them are done,
    /// failed, or skipped.
    pub fn run<F>(
        &self,
        files: &[PathBuf],
        progress: &dyn ProgressReporter,
        unit: F,
    ) -> Result<PoolSummary, PoolError>
    where
        F: Fn(&Path) -> Result<(), FileError> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("cloudscan-worker-{i}"))
            .build()?;
        let tally = Tally::default();

        pool.install(|| {
            files.par_iter().with_max_len(1).for_each(|path| {
                if self.stopped() {
                    tally.skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                let outcome = match unit(path) {
                    Ok(()) => {
                        debug!("processed {}", path.display());
                        FileOutcome::Completed
                    }
                    Err(e) => {
                        warn!("{}", e);
                        e.outcome()
                    }
                };
                tally.record(outcome);
                progress.file_done(path, outcome);
            });
        });

        Ok(tally.into_summary())
    }
}
