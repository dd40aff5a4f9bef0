//! Per-file classification pivot
//!
//! Classifies every row of the combined table as anomalous/normal (on the
//! anomaly distance and angle columns) crossed with high/low score, then
//! counts classifications per `category_filename` key and writes the counts
//! as a pivot table.

use crate::csv_table::{CsvWriter, Table};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Default anomaly cutoff for `anomaly_distances`, calibrated on the
/// reference capture set.
pub const DEFAULT_DIST_THRESHOLD: f64 = 207.19406350700632;
/// Default anomaly cutoff for `angle_diff`, calibrated on the same set.
pub const DEFAULT_DIFF_THRESHOLD: f64 = 426.2900228969236;
/// Score at or above which a detection counts as high confidence.
pub const SCORE_SPLIT: f64 = 0.5;

/// Classification labels, in output column order.
pub const CLASSIFICATIONS: [&str; 4] = [
    "Anomalous Data + Score High",
    "Anomalous Data + Score Low",
    "Normal Data + Score High",
    "Normal Data + Score Low",
];

/// Classification index for one row's metric values.
///
/// Missing metrics compare false, so a row with no usable anomaly columns
/// classifies as normal and a missing score as low.
pub fn classify(dist: f64, diff: f64, score: f64, dist_threshold: f64, diff_threshold: f64) -> usize {
    let anomalous = dist >= dist_threshold || diff >= diff_threshold;
    let high_score = score >= SCORE_SPLIT;
    match (anomalous, high_score) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    }
}

/// Count classifications per combined `category_filename` key.
pub fn pivot_counts(
    table: &Table,
    dist_threshold: f64,
    diff_threshold: f64,
) -> Result<BTreeMap<String, [u64; 4]>> {
    let category_idx = table.require_column("category")?;
    let filename_idx = table.require_column("filename")?;
    let dist_idx = table.require_column("anomaly_distances")?;
    let diff_idx = table.require_column("angle_diff")?;
    let score_idx = table.require_column("score")?;

    let mut counts: BTreeMap<String, [u64; 4]> = BTreeMap::new();
    for row in &table.rows {
        let key = format!(
            "{}_{}",
            row.get(category_idx).map(String::as_str).unwrap_or(""),
            row.get(filename_idx).map(String::as_str).unwrap_or("")
        );
        let class = classify(
            table.numeric_cell(row, dist_idx),
            table.numeric_cell(row, diff_idx),
            table.numeric_cell(row, score_idx),
            dist_threshold,
            diff_threshold,
        );
        counts.entry(key).or_default()[class] += 1;
    }
    Ok(counts)
}

/// Read the input table and write `category_analysis_results.csv` into the
/// output directory.
pub fn run(
    input_csv: &Path,
    output_dir: &Path,
    dist_threshold: f64,
    diff_threshold: f64,
) -> Result<()> {
    let table = Table::read(input_csv)?;
    let counts = pivot_counts(&table, dist_threshold, diff_threshold)?;

    std::fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join("category_analysis_results.csv");

    let mut header = vec!["combined_filename"];
    header.extend(CLASSIFICATIONS);
    let mut writer = CsvWriter::create(&output_path, &header)?;
    for (key, class_counts) in &counts {
        let mut fields = vec![key.clone()];
        fields.extend(class_counts.iter().map(|c| c.to_string()));
        writer.write_row(&fields)?;
    }
    writer.finish()?;

    println!("Analysis completed. Results saved to {}", output_path.display());
    Ok(())
}
