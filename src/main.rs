//! CLI entrypoint for `cloudscan`.
//!
//! Validates the cloud directory, enumerates its TXT files, then runs the
//! requested operations in order against one engine session so statistics are
//! computed at most once. Results are printed to stdout; artifacts land in the
//! results directory.
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use cloudscan::{
    engine::{DEFAULT_RESULTS_DIR, Engine, OperationError, ScanConfig},
    export::{save_domains_txt, save_stats_csv},
    io::{DEFAULT_MAX_LINE_BYTES, DEFAULT_MMAP_THRESHOLD_BYTES, ScanOptions},
    pool::WorkerPool,
    progress::{BarProgress, NoProgress, ProgressReporter},
    report::{render_cloud_info, render_distinct_domains, render_extraction, render_total_lines},
};
use colored::Colorize;
use log::{LevelFilter, error, info};

#[derive(Parser, Debug)]
#[command(
    name = "cloudscan",
    version,
    about = "Extract domains and credential pairs from leaked TXT dumps"
)]
struct Args {
    /// Directory scanned recursively for *.txt files
    #[arg(short = 'd', long = "dir", required = true)]
    dir: PathBuf,

    /// Operations to run, in order (default: lines domains)
    #[arg(value_enum)]
    ops: Vec<Op>,

    /// Domain substring for the `filter` operation (e.g. netflix)
    #[arg(short = 'f', long = "domain")]
    domain: Option<String>,

    /// Directory receiving the extracted artifacts
    #[arg(short = 'r', long = "results-dir", default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Longest accepted line in bytes; longer lines end the scan of their file
    #[arg(long = "max-line-bytes", default_value_t = DEFAULT_MAX_LINE_BYTES)]
    max_line_bytes: usize,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Also write stats CSV and the sorted domain list to the results directory
    #[arg(long = "export-stats")]
    export_stats: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress the header and progress bar (results are still printed)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Op {
    /// Total non-empty lines
    Lines,
    /// Distinct domain count
    Domains,
    /// Lines whose domain contains --domain
    Filter,
    /// email:password pairs
    Emails,
    /// cnpj:password pairs
    Cnpj,
    /// cpf:password pairs
    Cpf,
    /// Delete the results directory
    Clean,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn verify_inputs(args: &Args) -> Result<()> {
    if !args.dir.is_dir() {
        bail!("directory does not exist: {}", args.dir.display());
    }
    if args.ops.contains(&Op::Filter)
        && args.domain.as_deref().is_none_or(|d| d.trim().is_empty())
    {
        bail!("the filter operation needs a non-empty --domain");
    }
    Ok(())
}

fn run_op(
    engine: &mut Engine,
    op: Op,
    domain: Option<&str>,
    progress: &dyn ProgressReporter,
) -> Result<(), OperationError> {
    match op {
        Op::Lines => {
            let stats = engine.compute_stats(progress)?;
            println!("{}", render_total_lines(stats.total_lines));
        }
        Op::Domains => {
            let stats = engine.compute_stats(progress)?;
            println!("{}", render_distinct_domains(stats.distinct_domain_count()));
        }
        Op::Filter => {
            let domain = domain.unwrap_or_default();
            let report = engine.filter_by_domain(domain, progress)?;
            println!("{}", render_extraction("occurrences", &report));
        }
        Op::Emails => {
            let report = engine.extract_emails(progress)?;
            println!("{}", render_extraction("emails", &report));
        }
        Op::Cnpj => {
            let report = engine.extract_cnpj(progress)?;
            println!("{}", render_extraction("CNPJ", &report));
        }
        Op::Cpf => {
            let report = engine.extract_cpf(progress)?;
            println!("{}", render_extraction("CPF", &report));
        }
        Op::Clean => {
            let dir = engine.config().results_dir.display().to_string();
            if engine.delete_results()? {
                println!("{}", format!("Removed '{}'", dir).green());
            } else {
                println!("{}", format!("Nothing to remove at '{}'", dir).yellow());
            }
        }
    }
    Ok(())
}

fn export_stats(engine: &mut Engine, progress: &dyn ProgressReporter) -> Result<()> {
    let files = engine.files().len();
    let results_dir = engine.config().results_dir.clone();
    let stats = engine.compute_stats(progress)?;
    fs::create_dir_all(&results_dir)?;
    let ts = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S").to_string();
    let csv = results_dir.join(format!("stats_{}.csv", ts));
    let txt = results_dir.join(format!("domains_{}.txt", ts));
    save_stats_csv(stats, files, &ts, &csv)?;
    save_domains_txt(stats, &txt)?;
    info!("exported {} and {}", csv.display(), txt.display());
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    if let Err(e) = verify_inputs(&args) {
        error!("{}", e);
        process::exit(2);
    }

    let threshold = if args.mmap_threshold == 0 {
        u64::MAX
    } else {
        args.mmap_threshold
    };
    let config = ScanConfig {
        workers: WorkerPool::default_size(),
        results_dir: args.results_dir.clone(),
        scan: ScanOptions {
            max_line_bytes: args.max_line_bytes,
            mmap_threshold_bytes: threshold,
        },
    };
    let mut engine = match Engine::open(&args.dir, config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };
    if engine.files().is_empty() {
        error!("no TXT files found under {}", args.dir.display());
        process::exit(3);
    }

    if !args.quiet {
        println!("{}", "CLOUDSCAN".bold().red());
        println!(
            "{}",
            render_cloud_info(engine.files().len(), engine.total_size_bytes())
        );
    }

    let bar;
    let progress: &dyn ProgressReporter = if args.quiet {
        &NoProgress
    } else {
        bar = BarProgress::new();
        &bar
    };

    let ops = if args.ops.is_empty() {
        vec![Op::Lines, Op::Domains]
    } else {
        args.ops.clone()
    };
    for op in ops {
        if let Err(e) = run_op(&mut engine, op, args.domain.as_deref(), progress) {
            if e.is_fatal() {
                error!("{}", e);
                process::exit(4);
            }
            error!("{:?} failed: {}", op, e);
            println!("{}", format!("{:?}: 0 results ({})", op, e).red());
        }
    }

    if args.export_stats {
        if let Err(e) = export_stats(&mut engine, progress) {
            error!("failed to export stats: {}", e);
            process::exit(5);
        }
    }
}
