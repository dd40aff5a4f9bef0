//! Z-score threshold sweep
//!
//! For each requested numeric column of the combined table, sweeps integer
//! z-score thresholds from 1 to 9 and reports the lower/upper cutoffs
//! (mean ± z·stddev) together with how many values fall outside them.

use crate::csv_table::{CsvWriter, Table};
use crate::stats;
use anyhow::Result;
use std::path::Path;

pub const Z_RANGE: std::ops::RangeInclusive<u32> = 1..=9;

/// Sweep result for one column at one z threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub z: u32,
    pub lower_threshold: f32,
    pub upper_threshold: f32,
    pub anomalies: usize,
}

/// Sweep every z in `Z_RANGE` over one column's values.
pub fn sweep(values: &[f32]) -> Vec<SweepEntry> {
    let mean = stats::mean(values);
    let stddev = stats::stddev(values);
    let z_scores = stats::z_scores(values);

    Z_RANGE
        .map(|z| SweepEntry {
            z,
            lower_threshold: mean - z as f32 * stddev,
            upper_threshold: mean + z as f32 * stddev,
            anomalies: z_scores.iter().filter(|s| s.abs() > z as f32).count(),
        })
        .collect()
}

/// Read the input table, sweep the requested columns, write the result CSV.
pub fn run(input_csv: &Path, columns: &[String], output_csv: &Path) -> Result<()> {
    let table = Table::read(input_csv)?;

    let mut sweeps = Vec::new();
    for column in columns {
        let values = table.numeric_column(column)?;
        sweeps.push((column.clone(), sweep(&values)));
    }

    let mut header = vec!["z_score".to_string()];
    for (column, _) in &sweeps {
        header.push(format!("{}_lower_threshold", column));
        header.push(format!("{}_upper_threshold", column));
        header.push(format!("{}_anomalies_count", column));
    }
    let header_refs: Vec<&str> = header.iter().map(|s| s.as_str()).collect();

    let mut writer = CsvWriter::create(output_csv, &header_refs)?;
    for (i, z) in Z_RANGE.enumerate() {
        let mut fields = vec![z.to_string()];
        for (_, entries) in &sweeps {
            let entry = &entries[i];
            fields.push(format!("{}", entry.lower_threshold));
            fields.push(format!("{}", entry.upper_threshold));
            fields.push(entry.anomalies.to_string());
        }
        writer.write_row(&fields)?;
    }
    writer.finish()?;

    println!("Z-score thresholds saved to {}", output_csv.display());
    Ok(())
}
