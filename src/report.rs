//! Human-readable report rendering for terminal output.
//!
//! Produces the cloud information header, the statistics lines and the
//! per-operation extraction summaries printed by the CLI.
use colored::*;

use crate::engine::ExtractionReport;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push('\n');
    s
}

fn bullet(text: &str) -> String {
    format!("{} {}\n", "•".blue(), text)
}

pub fn format_gib(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

pub fn render_cloud_info(file_count: usize, total_bytes: u64) -> String {
    let mut out = section_header(&"Cloud Information".bold().blue().to_string());
    out.push_str(&bullet(
        &format!("TXT files found: {}", file_count).green().to_string(),
    ));
    out.push_str(&bullet(
        &format!("Total size: {}", format_gib(total_bytes))
            .green()
            .to_string(),
    ));
    out
}

pub fn render_total_lines(total_lines: u64) -> String {
    format!("{} {}", "Total lines:".blue(), total_lines.to_string().yellow())
}

pub fn render_distinct_domains(count: usize) -> String {
    format!("{} {}", "Distinct domains:".blue(), count.to_string().yellow())
}

/// Summary of one extraction: `what` names the extracted records.
pub fn render_extraction(what: &str, report: &ExtractionReport) -> String {
    let mut out = format!(
        "{} {}\n",
        format!("Total {} extracted:", what).blue(),
        report.matches.to_string().yellow()
    );
    if report.matches > 0 {
        out.push_str(
            &format!("Results saved to '{}'", report.artifact.display())
                .green()
                .to_string(),
        );
    } else {
        out.push_str(&format!("No {} found.", what).red().to_string());
    }
    if report.pool.failed() > 0 {
        out.push('\n');
        out.push_str(
            &format!("{} file(s) could not be fully read", report.pool.failed())
                .yellow()
                .to_string(),
        );
    }
    out
}
