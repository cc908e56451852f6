//! Human-readable renderings of a [`Report`]

use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::report::{write_file, Report, Stats};

/// Render the report as a Markdown document
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Consistency Report\n");
    let _ = writeln!(out, "**Generated**: {}\n", report.generated.to_rfc3339());

    let _ = writeln!(out, "## Overview\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Total tests | {} |", report.summary.total_tests);
    let _ = writeln!(
        out,
        "| Consistent | {} ({:.1}%) |",
        report.summary.total_passed, report.summary.consistency_rate
    );
    let _ = writeln!(out, "| Inconsistent | {} |", report.summary.total_failed);
    out.push('\n');

    stats_table(&mut out, "By Implementation", "Implementation", &report.by_implementation);
    stats_table(&mut out, "By Mode", "Mode", &report.by_mode);
    if !report.by_category.is_empty() {
        stats_table(&mut out, "By Category", "Category", &report.by_category);
    }

    let keys = run_columns(report);
    if !report.comparisons.is_empty() && !keys.is_empty() {
        let _ = writeln!(out, "## Comparison Matrix\n");
        let _ = write!(out, "| Test |");
        for key in &keys {
            let _ = write!(out, " {} |", cell(key));
        }
        let _ = writeln!(out, " Consistent |");
        let _ = write!(out, "|------|");
        for _ in &keys {
            out.push_str("---|");
        }
        out.push_str("---|\n");
        for c in &report.comparisons {
            let _ = write!(out, "| {} |", cell(&c.test_name));
            for key in &keys {
                let cell = match c.runs.get(*key) {
                    Some(true) => "pass",
                    Some(false) => "FAIL",
                    None => "-",
                };
                let _ = write!(out, " {} |", cell);
            }
            let _ = writeln!(out, " {} |", if c.consistent { "yes" } else { "NO" });
        }
        out.push('\n');
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "## Failure Details\n");
        for f in &report.failures {
            let _ = writeln!(out, "### {}\n", cell(&f.test_name));
            for (key, err) in &f.failures {
                let _ = writeln!(out, "- **{}**: {}", cell(key), cell(err));
            }
            out.push('\n');
        }
    }

    out.push_str("---\n\n*Generated by docparity verify*\n");
    out
}

fn stats_table(out: &mut String, title: &str, column: &str, rows: &std::collections::BTreeMap<String, Stats>) {
    let _ = writeln!(out, "## {}\n", title);
    let _ = writeln!(out, "| {} | Total | Passed | Failed | Pass rate |", column);
    let _ = writeln!(out, "|------|-------|--------|--------|-----------|");
    for (name, stats) in rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:.1}% |",
            cell(name),
            stats.total,
            stats.passed,
            stats.failed,
            stats.pass_rate()
        );
    }
    out.push('\n');
}

/// Make text safe inside a table cell or list item: one line, `|` escaped
fn cell(text: &str) -> String {
    text.split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Every run key that appears in any comparison row, sorted
fn run_columns(report: &Report) -> Vec<&str> {
    let mut keys: Vec<&str> = report
        .comparisons
        .iter()
        .flat_map(|c| c.runs.keys().map(String::as_str))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Write the Markdown rendering to `path`
pub fn write_markdown(report: &Report, path: &Path) -> Result<()> {
    write_file(path, &render_markdown(report))
}

/// Short console summary
pub fn summary_lines(report: &Report) -> Vec<String> {
    let mut lines = vec![
        format!("Total tests: {}", report.summary.total_tests),
        format!(
            "Consistent: {} ({:.1}%)",
            report.summary.total_passed, report.summary.consistency_rate
        ),
        format!("Inconsistent: {}", report.summary.total_failed),
    ];
    for f in &report.failures {
        let runs: Vec<&str> = f.failures.keys().map(String::as_str).collect();
        lines.push(format!("  {} failed in {}", f.test_name, runs.join(", ")));
    }
    lines
}
