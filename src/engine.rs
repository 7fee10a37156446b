//! Engine: one scanning session over a fixed list of dump files. Runs the
//! stats and extraction operations through the worker pool, one operation at
//! a time, and caches the corpus statistics for the rest of the session.
//!
//! Typical usage:
//!
//! ```no_run
//! use cloudscan::engine::{Engine, ScanConfig};
//! use cloudscan::progress::NoProgress;
//! # fn main() -> anyhow::Result<()> {
//! let mut engine = Engine::open("/path/to/cloud", ScanConfig::default())?;
//! let stats = engine.compute_stats(&NoProgress)?;
//! println!("{} lines, {} domains", stats.total_lines, stats.distinct_domain_count());
//! let report = engine.extract_emails(&NoProgress)?;
//! println!("{} pairs in {}", report.matches, report.artifact.display());
//! # Ok(())
//! # }
//! ```
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;

use crate::dedup::Deduplicator;
use crate::io::{ScanOptions, open_lines};
use crate::pool::{FileError, PoolError, PoolSummary, WorkerPool};
use crate::progress::ProgressReporter;
use crate::rule::{
    CnpjCredentialRule, CpfCredentialRule, DomainRule, EmailCredentialRule, ExtractionRule,
};
use crate::sink::ResultSink;
use crate::source::{FileSource, SourceError, TxtTreeSource};
use crate::stats::{AggregateStats, StatsAggregator};

pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const EMAILS_ARTIFACT: &str = "emails_extracted.txt";
pub const CPF_ARTIFACT: &str = "cpf_extracted.txt";
pub const CNPJ_ARTIFACT: &str = "cnpj_extracted.txt";

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to create results directory {}: {source}", .path.display())]
    ResultsDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid domain filter {0:?}")]
    InvalidFilter(String),
    #[error("failed to remove {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl OperationError {
    /// Fatal errors abort the whole run; the rest only void one operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OperationError::Source(_) | OperationError::ResultsDir { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub workers: usize,
    pub results_dir: PathBuf,
    pub scan: ScanOptions,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: WorkerPool::default_size(),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            scan: ScanOptions::default(),
        }
    }
}

/// Outcome of one extraction or filter operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Distinct entries written to the artifact.
    pub matches: u64,
    pub artifact: PathBuf,
    pub pool: PoolSummary,
}

#[derive(Debug)]
pub struct Engine {
    files: Vec<PathBuf>,
    config: ScanConfig,
    stats: Option<AggregateStats>,
}

impl Engine {
    /// Enumerate `*.txt` files under `root`. A missing root fails before any
    /// file is touched.
    pub fn open<P: AsRef<Path>>(root: P, config: ScanConfig) -> Result<Self, OperationError> {
        let files = TxtTreeSource::new(root).files()?;
        info!("found {} txt files", files.len());
        Ok(Self::new(files, config))
    }

    pub fn new(files: Vec<PathBuf>, config: ScanConfig) -> Self {
        Self {
            files,
            config,
            stats: None,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn total_size_bytes(&self) -> u64 {
        crate::source::total_size_bytes(&self.files)
    }

    /// Statistics from an earlier `compute_stats` call in this session.
    pub fn cached_stats(&self) -> Option<&AggregateStats> {
        self.stats.as_ref()
    }

    pub fn reset_stats(&mut self) {
        self.stats = None;
    }

    /// Count non-empty lines and distinct domains. Scans at most once per
    /// session; later calls return the cached result.
    pub fn compute_stats(
        &mut self,
        progress: &dyn ProgressReporter,
    ) -> Result<&AggregateStats, OperationError> {
        let stats = match self.stats.take() {
            Some(s) => s,
            None => self.scan_stats(progress)?,
        };
        Ok(self.stats.insert(stats))
    }

    fn scan_stats(
        &self,
        progress: &dyn ProgressReporter,
    ) -> Result<AggregateStats, OperationError> {
        let started = Instant::now();
        let rule = DomainRule::new();
        let agg = StatsAggregator::new();
        let opts = self.config.scan;

        info!(
            "stats: scanning {} files with {} workers",
            self.files.len(),
            self.config.workers
        );
        progress.start(rule.name(), self.files.len());
        let summary = self.pool().run(&self.files, progress, |path| {
            let mut lines = 0u64;
            let mut domains: HashSet<String> = HashSet::new();
            // Lines read before a scan error still count.
            let res = for_each_line(path, &opts, |line| {
                lines += 1;
                if let Some(c) = rule.apply(line) {
                    if !domains.contains(c.primary_key.as_ref()) {
                        domains.insert(c.primary_key.into_owned());
                    }
                }
                Ok(())
            });
            agg.add_lines(lines);
            agg.extend_domains(domains);
            res
        });
        progress.finish();
        let summary = summary?;

        let stats = agg.merge();
        info!(
            "stats: {} lines, {} distinct domains ({} files failed) in {:.2?}",
            stats.total_lines,
            stats.distinct_domain_count(),
            summary.failed(),
            started.elapsed()
        );
        Ok(stats)
    }

    /// Write every distinct line whose domain contains `needle` to
    /// `<needle>.txt`.
    pub fn filter_by_domain(
        &self,
        needle: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<ExtractionReport, OperationError> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() || needle.contains(['/', '\\']) {
            return Err(OperationError::InvalidFilter(needle));
        }
        let artifact = format!("{}.txt", needle);
        self.run_extraction(&DomainRule::containing(&needle), &artifact, progress)
    }

    pub fn extract_emails(
        &self,
        progress: &dyn ProgressReporter,
    ) -> Result<ExtractionReport, OperationError> {
        self.run_extraction(&EmailCredentialRule, EMAILS_ARTIFACT, progress)
    }

    pub fn extract_cpf(
        &self,
        progress: &dyn ProgressReporter,
    ) -> Result<ExtractionReport, OperationError> {
        self.run_extraction(&CpfCredentialRule, CPF_ARTIFACT, progress)
    }

    pub fn extract_cnpj(
        &self,
        progress: &dyn ProgressReporter,
    ) -> Result<ExtractionReport, OperationError> {
        self.run_extraction(&CnpjCredentialRule, CNPJ_ARTIFACT, progress)
    }

    /// Remove the results directory. Returns false when there was nothing to
    /// remove.
    pub fn delete_results(&self) -> Result<bool, OperationError> {
        let dir = &self.config.results_dir;
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(dir).map_err(|source| OperationError::Cleanup {
            path: dir.clone(),
            source,
        })?;
        info!("removed {}", dir.display());
        Ok(true)
    }

    /// Scan all files with `rule`, writing each distinct dedup key once to
    /// `artifact` inside the results directory.
    pub fn run_extraction<R: ExtractionRule>(
        &self,
        rule: &R,
        artifact: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<ExtractionReport, OperationError> {
        let started = Instant::now();
        let path = self.ensure_results_dir()?.join(artifact);
        let sink = ResultSink::create(&path).map_err(|source| OperationError::Artifact {
            path: path.clone(),
            source,
        })?;
        let dedup = Deduplicator::new();
        let opts = self.config.scan;

        info!(
            "{}: scanning {} files with {} workers into {}",
            rule.name(),
            self.files.len(),
            self.config.workers,
            path.display()
        );
        progress.start(rule.name(), self.files.len());
        let summary = self.pool().run(&self.files, progress, |file| {
            for_each_line(file, &opts, |line| {
                let Some(candidate) = rule.apply(line) else {
                    return Ok(());
                };
                let key = candidate.dedup_key();
                if dedup.check_and_insert(&key) {
                    sink.write_line(&key).map_err(|source| FileError::Write {
                        path: sink.path().to_path_buf(),
                        source,
                    })?;
                }
                Ok(())
            })
        });
        progress.finish();
        let summary = summary?;

        let matches = sink.finish().map_err(|source| OperationError::Artifact {
            path: path.clone(),
            source,
        })?;
        info!(
            "{}: {} distinct entries ({} files failed) in {:.2?}",
            rule.name(),
            matches,
            summary.failed(),
            started.elapsed()
        );
        Ok(ExtractionReport {
            matches,
            artifact: path,
            pool: summary,
        })
    }

    fn ensure_results_dir(&self) -> Result<&Path, OperationError> {
        let dir = &self.config.results_dir;
        fs::create_dir_all(dir).map_err(|source| OperationError::ResultsDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    fn pool(&self) -> WorkerPool {
        WorkerPool::new(self.config.workers)
    }
}

/// Feed every line of `path` to `f`, stopping at the first scan or sink error.
pub fn for_each_line<F>(path: &Path, opts: &ScanOptions, mut f: F) -> Result<(), FileError>
where
    F: FnMut(&str) -> Result<(), FileError>,
{
    for line in open_lines(path, opts)? {
        f(&line?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use tempfile::{TempDir, tempdir};

    fn fixture(files: &[(&str, &str)]) -> (TempDir, Engine) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cloud");
        fs::create_dir_all(&root).unwrap();
        for (name, body) in files {
            let p = root.join(name);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, body).unwrap();
        }
        let config = ScanConfig {
            workers: 4,
            results_dir: dir.path().join("results"),
            scan: ScanOptions::default(),
        };
        let engine = Engine::open(&root, config).unwrap();
        (dir, engine)
    }

    fn artifact_lines(path: &Path) -> Vec<String> {
        let mut v: Vec<String> = fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        v.sort();
        v
    }

    #[test]
    fn stats_count_lines_and_domains_and_are_cached() {
        let (dir, mut engine) = fixture(&[
            ("a.txt", "https://www.netflix.com/login:u@a.com:p\n\n  \nNETFLIX.com:x:y\n"),
            ("sub/b.TXT", "http://hulu.com/:z@z.com:q\nandroid://app@pkg/:a:b\n"),
        ]);
        let stats = engine.compute_stats(&NoProgress).unwrap().clone();
        assert_eq!(stats.total_lines, 4);
        assert!(stats.distinct_domains.contains("netflix.com"));
        assert!(stats.distinct_domains.contains("hulu.com"));
        assert!(stats.distinct_domains.contains("app@pkg"));
        assert!(stats.distinct_domains.contains("netflix.com:x:y"));
        assert_eq!(stats.distinct_domain_count(), 4);

        // Cached: removing the corpus does not change the answer.
        fs::remove_dir_all(dir.path().join("cloud")).unwrap();
        assert_eq!(engine.compute_stats(&NoProgress).unwrap(), &stats);
        assert_eq!(engine.cached_stats(), Some(&stats));

        engine.reset_stats();
        assert_eq!(engine.compute_stats(&NoProgress).unwrap().total_lines, 0);
    }

    #[test]
    fn filter_writes_distinct_raw_lines() {
        let (_dir, engine) = fixture(&[
            ("a.txt", "NETFLIX.com:a:b\nwww.netflix.com/x:c:d\nhulu.com:e:f\n"),
            ("b.txt", "NETFLIX.com:a:b\n"),
        ]);
        let report = engine.filter_by_domain("Netflix", &NoProgress).unwrap();
        assert_eq!(report.matches, 2);
        assert!(report.artifact.ends_with("netflix.txt"));
        assert_eq!(
            artifact_lines(&report.artifact),
            vec!["NETFLIX.com:a:b", "www.netflix.com/x:c:d"]
        );
    }

    #[test]
    fn filter_rejects_empty_and_path_like_needles() {
        let (_dir, engine) = fixture(&[("a.txt", "x.com\n")]);
        for bad in ["", "   ", "../etc", "a\\b"] {
            let err = engine.filter_by_domain(bad, &NoProgress).unwrap_err();
            assert!(matches!(err, OperationError::InvalidFilter(_)));
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn credential_extractions_write_pairs() {
        let (_dir, engine) = fixture(&[
            (
                "a.txt",
                "https://www.netflix.com/login:user@a.com:pass123\n11122233344:senha123\n12345678000199,empresa\n",
            ),
            ("b.txt", "user@a.com pass123\n111222333445:nope\n"),
        ]);
        let emails = engine.extract_emails(&NoProgress).unwrap();
        assert_eq!(artifact_lines(&emails.artifact), vec!["user@a.com:pass123"]);
        assert_eq!(emails.matches, 1);

        let cpf = engine.extract_cpf(&NoProgress).unwrap();
        assert_eq!(artifact_lines(&cpf.artifact), vec!["11122233344:senha123"]);
        assert!(cpf.artifact.ends_with(CPF_ARTIFACT));

        let cnpj = engine.extract_cnpj(&NoProgress).unwrap();
        assert_eq!(artifact_lines(&cnpj.artifact), vec!["12345678000199:empresa"]);
    }

    #[test]
    fn oversized_line_fails_one_file_only() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cloud");
        fs::create_dir_all(&root).unwrap();
        fs::write(
            root.join("bad.txt"),
            "a@b.com:one\nthis line is much too long\nc@d.com:two\n",
        )
        .unwrap();
        fs::write(root.join("good.txt"), "e@f.com:three\n").unwrap();
        let config = ScanConfig {
            workers: 2,
            results_dir: dir.path().join("results"),
            scan: ScanOptions {
                max_line_bytes: 16,
                ..ScanOptions::default()
            },
        };
        let mut engine = Engine::open(&root, config).unwrap();

        let report = engine.extract_emails(&NoProgress).unwrap();
        assert_eq!(report.pool.completed, 1);
        assert_eq!(report.pool.failed_scan, 1);
        assert_eq!(
            artifact_lines(&report.artifact),
            vec!["a@b.com:one", "e@f.com:three"]
        );

        // The partial file still contributes the lines read before the error.
        assert_eq!(engine.compute_stats(&NoProgress).unwrap().total_lines, 2);
    }

    #[test]
    fn artifact_creation_failure_is_per_operation() {
        let (dir, engine) = fixture(&[("a.txt", "a@b.com:pw\n")]);
        fs::create_dir_all(dir.path().join("results").join(EMAILS_ARTIFACT)).unwrap();
        let err = engine.extract_emails(&NoProgress).unwrap_err();
        assert!(matches!(err, OperationError::Artifact { .. }));
        assert!(!err.is_fatal());
        // Other operations still run.
        assert_eq!(engine.extract_cpf(&NoProgress).unwrap().matches, 0);
    }

    #[test]
    fn results_dir_failure_is_fatal() {
        let (dir, _engine) = fixture(&[("a.txt", "a@b.com:pw\n")]);
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a dir").unwrap();
        let engine = Engine::new(
            vec![],
            ScanConfig {
                workers: 1,
                results_dir: blocker.join("results"),
                scan: ScanOptions::default(),
            },
        );
        let err = engine.extract_emails(&NoProgress).unwrap_err();
        assert!(matches!(err, OperationError::ResultsDir { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let err = Engine::open(dir.path().join("nope"), ScanConfig::default()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn delete_results_removes_directory_once() {
        let (dir, engine) = fixture(&[("a.txt", "a@b.com:pw\n")]);
        engine.extract_emails(&NoProgress).unwrap();
        assert!(dir.path().join("results").is_dir());
        assert!(engine.delete_results().unwrap());
        assert!(!dir.path().join("results").exists());
        assert!(!engine.delete_results().unwrap());
    }

    #[test]
    fn default_config_writes_under_results() {
        let config = ScanConfig::default();
        assert_eq!(config.results_dir, PathBuf::from("results"));
        assert_eq!(config.workers, WorkerPool::default_size());
    }
}
