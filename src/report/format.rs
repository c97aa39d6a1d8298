//! Formatted terminal output and shared number formatting.
//!
//! We keep formatting code in one place so:
//! - the return math and layout code stay free of presentation details
//! - the workbook metadata line and the terminal agree on number style

use crate::report::outcome::{ItemOutcome, PublishOutcome, RunReport};
use crate::report::rows::ReportTable;

const RETURN_HEADERS: [&str; 5] = ["Daily %", "Weekly %", "Monthly %", "YoY %", "YTD %"];

/// `1234567.891` -> `1,234,567.89`.
pub fn fmt_thousands(v: f64) -> String {
    if !v.is_finite() {
        return "N/A".to_string();
    }
    let raw = format!("{:.2}", v.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let nonzero = raw.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if v < 0.0 && nonzero { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// `+1.23%`, `-0.50%`, or `N/A` when undefined.
pub fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:+.2}%"),
        _ => "N/A".to_string(),
    }
}

/// The metadata line written under each title.
pub fn format_metadata_line(table: &ReportTable) -> String {
    format!(
        "Period: {} | Min: ${} | Max: ${} | Avg: ${}",
        table.retention.describe(),
        fmt_thousands(table.summary.min),
        fmt_thousands(table.summary.max),
        fmt_thousands(table.summary.mean),
    )
}

/// Format one instrument's report table for the terminal.
pub fn format_report_table(table: &ReportTable) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", table.instrument.full_name()));
    out.push_str(&format_metadata_line(table));
    out.push_str("\n\n");

    let mut header = format!("{:<10} {:>12}", "Date", "Close");
    for h in RETURN_HEADERS {
        header.push_str(&format!(" {h:>10}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<10} {:-<12}{}\n", "", "", " ----------".repeat(RETURN_HEADERS.len())));

    for row in &table.rows {
        let mut line = format!("{:<10} {:>12}", row.date, fmt_thousands(row.close));
        for r in row.returns {
            line.push_str(&format!(" {:>10}", fmt_pct(r)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Format the end-of-run summary (sections, skips, publish result).
pub fn format_run_summary(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("=== commodity-charts run summary ===\n");
    for section in &report.sections {
        out.push_str(&format!(
            "\n{} -> {}\n  rendered={} skipped={}",
            section.title,
            section.output.display(),
            section.rendered(),
            section.skipped(),
        ));
        let by_kind: Vec<String> = section
            .skipped_by_kind()
            .into_iter()
            .map(|(kind, n)| format!("{}: {n}", kind.label()))
            .collect();
        if !by_kind.is_empty() {
            out.push_str(&format!(" ({})", by_kind.join(", ")));
        }
        out.push('\n');
        for outcome in &section.outcomes {
            match outcome {
                ItemOutcome::Rendered { label, detail } => {
                    out.push_str(&format!("  ok   {:<32} {detail}\n", truncate(label, 32)));
                }
                ItemOutcome::Skipped { label, error } => {
                    out.push_str(&format!(
                        "  skip {:<32} [{}] {error}\n",
                        truncate(label, 32),
                        error.kind().label()
                    ));
                }
            }
        }
    }

    out.push_str("\nPublish: ");
    match &report.publish {
        PublishOutcome::Disabled => out.push_str("disabled (local mode)\n"),
        PublishOutcome::Attempted { site, uploads } => {
            out.push('\n');
            match site {
                Ok(Some(msg)) => out.push_str(&format!("  site:  committed \"{msg}\"\n")),
                Ok(None) => out.push_str("  site:  no changes\n"),
                Err(err) => out.push_str(&format!("  site:  FAILED ({err})\n")),
            }
            match uploads {
                Ok(uploads) => {
                    out.push_str(&format!("  drive: {} workbook(s) uploaded\n", uploads.len()));
                    for upload in uploads {
                        out.push_str(&format!("    {} (id {})", upload.name, upload.remote_id));
                        if let Some(link) = &upload.link {
                            out.push_str(&format!(" {link}"));
                        }
                        out.push('\n');
                    }
                }
                Err(err) => out.push_str(&format!("  drive: FAILED ({err})\n")),
            }
            if !report.publish.failures().is_empty() {
                out.push_str("  local reports were kept\n");
            }
        }
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
