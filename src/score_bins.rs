//! Threshold split and score-bin anomaly ratios
//!
//! Splits the combined table into anomalous and normal rows on one metric
//! column, then bins detection scores into nine fixed bins over (0.1, 1.0]
//! and reports the fraction of anomalous rows per bin. Scores at or below
//! 0.1 carry no signal for this detector and are excluded.

use crate::csv_table::{CsvWriter, Table};
use anyhow::Result;
use std::path::Path;

/// Number of fixed score bins over (0.1, 1.0].
pub const BIN_COUNT: usize = 9;

/// Human-readable label of a bin, e.g. `0.1~0.2`.
pub fn bin_label(index: usize) -> String {
    let lower = (index + 1) as f64 / 10.0;
    let upper = (index + 2) as f64 / 10.0;
    format!("{:.1}~{:.1}", lower, upper)
}

/// Bin index of a score, or `None` when the score is outside (0.1, 1.0].
pub fn bin_index(score: f64) -> Option<usize> {
    if !(score > 0.1 && score <= 1.0) {
        return None;
    }
    (0..BIN_COUNT).find(|&i| score <= (i + 2) as f64 / 10.0)
}

/// Count scores per bin; out-of-range scores are skipped.
fn bin_counts(scores: impl Iterator<Item = f64>) -> [u64; BIN_COUNT] {
    let mut counts = [0u64; BIN_COUNT];
    for score in scores {
        if let Some(i) = bin_index(score) {
            counts[i] += 1;
        }
    }
    counts
}

/// Split the input on `column > threshold`, write the anomalous rows and the
/// per-bin anomaly ratios into the output directory.
pub fn run(input_csv: &Path, column: &str, threshold: f64, output_dir: &Path) -> Result<()> {
    let table = Table::read(input_csv)?;
    let metric_idx = table.require_column(column)?;
    let score_idx = table.require_column("score")?;

    // Rows whose metric cell is missing or non-numeric belong to neither side.
    let mut anomalies: Vec<&Vec<String>> = Vec::new();
    let mut normal: Vec<&Vec<String>> = Vec::new();
    for row in &table.rows {
        let value = table.numeric_cell(row, metric_idx);
        if value > threshold {
            anomalies.push(row);
        } else if value <= threshold {
            normal.push(row);
        }
    }

    std::fs::create_dir_all(output_dir)?;

    let anomalies_path = output_dir.join(format!("{}_anomalies.csv", column));
    let header_refs: Vec<&str> = table.header.iter().map(|s| s.as_str()).collect();
    let mut writer = CsvWriter::create(&anomalies_path, &header_refs)?;
    for row in &anomalies {
        writer.write_row(row)?;
    }
    writer.finish()?;
    println!("Anomalies saved to {}", anomalies_path.display());

    let anomaly_counts = bin_counts(
        anomalies
            .iter()
            .map(|row| table.numeric_cell(row, score_idx)),
    );
    let normal_counts = bin_counts(normal.iter().map(|row| table.numeric_cell(row, score_idx)));

    let ratio_path = output_dir.join(format!("anomaly_ratio_by_score_bin_{}.csv", column));
    let mut writer = CsvWriter::create(&ratio_path, &["score_bin", "anomaly_ratio"])?;
    for i in 0..BIN_COUNT {
        let total = anomaly_counts[i] + normal_counts[i];
        let ratio = if total > 0 {
            format!("{}", anomaly_counts[i] as f64 / total as f64)
        } else {
            String::new()
        };
        writer.write_row(&[bin_label(i), ratio])?;
    }
    writer.finish()?;
    println!("Anomaly ratio by score bin saved to {}", ratio_path.display());

    Ok(())
}
