//! Export helpers for writing corpus statistics to disk.
//!
//! - `save_stats_csv` writes a single summary row (timestamp, file count,
//!   total lines, distinct domains).
//! - `save_domains_txt` writes every distinct domain, one per line, sorted.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use csv::Writer;
use serde::Serialize;

use crate::stats::AggregateStats;

#[derive(Debug, Serialize)]
struct StatsRow<'a> {
    generated_at: &'a str,
    files: usize,
    total_lines: u64,
    distinct_domains: usize,
}

pub fn save_stats_csv<P: AsRef<Path>>(
    stats: &AggregateStats,
    files: usize,
    generated_at: &str,
    path: P,
) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.serialize(StatsRow {
        generated_at,
        files,
        total_lines: stats.total_lines,
        distinct_domains: stats.distinct_domain_count(),
    })?;
    wtr.flush()?;
    Ok(())
}

pub fn save_domains_txt<P: AsRef<Path>>(stats: &AggregateStats, path: P) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    for d in stats.sorted_domains() {
        writeln!(f, "{}", d)?;
    }
    f.flush()?;
    Ok(())
}
