// Colored terminal output for command summaries and sheet previews.
//
// This module handles all terminal-specific formatting. The main.rs
// command arms delegate here once the work is done.

use colored::Colorize;

use crate::formats::dta::DtaMeta;
use crate::metadata::TranscriptInfo;
use crate::pipeline::exposure::ExposureOutcome;
use crate::pipeline::sentiment::SentimentRow;
use crate::sector::ClassificationReport;
use crate::sheet::Table;

/// Print the first `n` rows of a table, one aligned line per row.
pub fn display_table_preview(table: &Table, n: usize) {
    if table.headers.is_empty() {
        println!("  (empty sheet)");
        return;
    }

    let shown: Vec<&Vec<_>> = table.rows.iter().take(n).collect();
    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            shown
                .iter()
                .map(|r| super::truncate_chars(&r[i].to_string(), 24).chars().count())
                .chain(std::iter::once(super::truncate_chars(h, 24).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header_line: Vec<String> = table
        .headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", super::truncate_chars(h, 24), w = *w))
        .collect();
    println!("  {}", header_line.join("  ").dimmed());

    for row in &shown {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", super::truncate_chars(&c.to_string(), 24), w = *w))
            .collect();
        println!("  {}", line.join("  "));
    }

    if table.len() > n {
        println!("  {}", format!("... {} more rows", table.len() - n).dimmed());
    }
}

/// Summarize a finished exposure run.
pub fn display_exposure_summary(outcome: &ExposureOutcome, column: &str) {
    println!("\n{}", "Exposure run complete.".bold());
    println!("  Transcripts: {}", outcome.files);
    println!(
        "  Batches: {} ({} resumed from checkpoint)",
        outcome.total_batches, outcome.resumed_batches
    );

    let nonzero = outcome.exposures.iter().filter(|&&e| e > 0.0).count();
    println!("  Column: {column}");
    println!(
        "  Non-zero exposures: {} of {}",
        nonzero,
        outcome.exposures.len()
    );
    if let Some((min, mean, max)) = super::summarize(&outcome.exposures) {
        println!("  Min / mean / max: {min:.4} / {mean:.4} / {max:.4}");
    }
}

/// Summarize a sector classification pass.
pub fn display_classification_report(report: &ClassificationReport) {
    println!("\n{}", "=== Sector Classification ===".bold());
    println!("  Rows: {}", report.rows);
    println!("  Already classified: {}", report.already_classified);
    println!(
        "  {} {} filled from same-name rows",
        "+".green(),
        report.filled_by_propagation
    );
    println!(
        "  {} {} filled by keyword",
        "+".green(),
        report.filled_by_keyword
    );
    if report.unclassified > 0 {
        println!(
            "  {} {} still unclassified",
            "~".yellow(),
            report.unclassified
        );
    }
}

/// Summarize sentiment scores.
pub fn display_sentiment_summary(rows: &[SentimentRow]) {
    println!(
        "\n{}",
        format!("=== Sentiment ({} transcripts) ===", rows.len()).bold()
    );
    if rows.is_empty() {
        println!("  No transcripts found.");
        return;
    }

    let positive = rows.iter().filter(|r| r.score.sentiment_score > 0).count();
    let negative = rows.iter().filter(|r| r.score.sentiment_score < 0).count();
    let neutral = rows.len() - positive - negative;
    println!(
        "  {} net positive   {} net negative   {} neutral",
        positive.to_string().green(),
        negative.to_string().red(),
        neutral
    );

    let scores: Vec<f64> = rows.iter().map(|r| r.score.sentiment_score as f64).collect();
    if let Some((min, mean, max)) = super::summarize(&scores) {
        println!("  Net score min / mean / max: {min:.0} / {mean:.2} / {max:.0}");
    }
}

/// Print extracted transcript metadata, flagging incomplete rows.
pub fn display_metadata(infos: &[TranscriptInfo], n: usize) {
    println!(
        "\n{}",
        format!("=== Transcript Metadata ({} files) ===", infos.len()).bold()
    );
    for info in infos.iter().take(n) {
        let line = format!(
            "  {:<10} {:<36} {:<8} {}",
            info.company_id,
            super::truncate_chars(&info.company_name, 34),
            info.earnings_call_period,
            super::truncate_chars(&info.file, 60).dimmed()
        );
        if info.company_id == crate::metadata::NOT_AVAILABLE {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }
    if infos.len() > n {
        println!("  {}", format!("... {} more files", infos.len() - n).dimmed());
    }
}

/// Print Stata dataset metadata: release, label, and column names/labels.
pub fn display_dta_meta(meta: &DtaMeta) {
    println!(
        "\n{}",
        format!("=== Stata dataset (release {}) ===", meta.release).bold()
    );
    if !meta.data_label.is_empty() {
        println!("  Label: {}", meta.data_label);
    }
    if !meta.timestamp.is_empty() {
        println!("  Saved: {}", meta.timestamp);
    }
    println!("  Observations: {}", meta.observations);
    println!("  Columns:");
    for (name, label) in meta.column_names.iter().zip(&meta.column_labels) {
        if label.is_empty() {
            println!("    {name}");
        } else {
            println!("    {:<32} {}", name, label.dimmed());
        }
    }
}
