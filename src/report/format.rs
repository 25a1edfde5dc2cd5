//! Formatted terminal output.
//!
//! Kept apart from assembly so the report files and the terminal table can change
//! independently.

use crate::domain::ReportRow;
use crate::io::export::RunSummary;

/// Short run summary plus one line per sample.
pub fn format_run_summary(rows: &[ReportRow], summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("=== frnt - Foci Reduction Neutralization Fit ===\n");
    out.push_str(&format!(
        "Plates: {} | samples: {} | fitted: {} | failed: {}\n\n",
        summary.plates, summary.processed, summary.fitted, summary.failed
    ));
    out.push_str(&format_table(rows));

    out
}

fn format_table(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:<16} {:<12} {:>10} {:>8} {:>8} {:>10} {:<24}\n",
            "row", "sample", "plate", "ND50", "ND80", "r2", "chi2", "status"
        )
        .trim_end(),
    );
    out.push('\n');

    out.push_str(
        format!(
            "{:->4} {:-<16} {:-<12} {:->10} {:->8} {:->8} {:->10} {:-<24}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:>4} {:<16} {:<12} {:>10} {:>8} {:>8} {:>10} {:<24}\n",
                r.row,
                truncate(&r.sample_id, 16),
                truncate(&r.plate_id, 12),
                fmt_opt(r.nd50, 1),
                fmt_opt(r.nd80, 1),
                fmt_opt(r.r_squared, 4),
                fmt_opt(r.chi_square, 5),
                truncate(&r.status, 24),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sample: &str, nd50: Option<f64>, status: &str) -> ReportRow {
        ReportRow {
            row: 1,
            sample_id: sample.to_string(),
            plate_id: "P1".to_string(),
            chi_square: nd50.map(|_| 0.0123),
            r_squared: nd50.map(|_| 0.9876),
            upper_limit: None,
            slope: None,
            lower_limit: None,
            nd50,
            nd80: nd50.map(|v| v * 0.25),
            plots: None,
            status: status.to_string(),
        }
    }

    #[test]
    fn failed_rows_show_dashes_not_numbers() {
        let summary = RunSummary {
            plates: 1,
            processed: 2,
            fitted: 1,
            failed: 1,
        };
        let text = format_run_summary(
            &[row("S1", Some(123.46), "ok"), row("S2", None, "ND80 undefined for slope 0")],
            &summary,
        );
        assert!(text.contains("fitted: 1 | failed: 1"));
        assert!(text.contains("123.5"));
        let failed = text.lines().find(|l| l.contains("S2")).unwrap();
        assert!(failed.contains(" - "));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
