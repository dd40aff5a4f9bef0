//! Regression-residual anomaly analysis
//!
//! Fits a random forest regression of the detection score on the anomaly
//! metrics and box area, then flags test rows whose absolute prediction
//! residual exceeds a multiple of the residual standard deviation. Rows the
//! model explains well are "representative"; the rest are anomalous.

mod forest;

pub use forest::{RandomForestRegressor, RegressionTree};

use crate::csv_table::{CsvWriter, Table};
use crate::record::fmt_num;
use crate::stats;
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

/// Feature columns the model regresses on, in order.
pub const FEATURE_COLUMNS: [&str; 3] = ["anomaly_distances", "angle_diff", "box_area"];
/// Target column.
pub const TARGET_COLUMN: &str = "score";

/// Options for one residual analysis run.
#[derive(Debug, Clone)]
pub struct RegressOptions {
    /// Trees in the forest.
    pub trees: usize,
    /// Depth cap per tree.
    pub max_depth: usize,
    /// Fraction of rows held out for testing.
    pub test_fraction: f64,
    /// RNG seed for the split and the bootstrap.
    pub seed: u64,
    /// Residuals beyond `residual_sigma` standard deviations are anomalous.
    pub residual_sigma: f64,
}

impl Default for RegressOptions {
    fn default() -> Self {
        RegressOptions {
            trees: 100,
            max_depth: 16,
            test_fraction: 0.2,
            seed: 42,
            residual_sigma: 2.0,
        }
    }
}

/// One held-out row with its prediction.
#[derive(Debug, Clone)]
pub struct TestPoint {
    pub features: Vec<f64>,
    pub actual: f64,
    pub predicted: f64,
    pub residual: f64,
}

/// Outcome of a residual analysis.
#[derive(Debug, Clone)]
pub struct RegressReport {
    pub train_count: usize,
    pub test_count: usize,
    pub rmse: f64,
    /// Absolute-residual cutoff used to flag anomalies.
    pub threshold: f64,
    pub anomalies: Vec<TestPoint>,
    pub representative_count: usize,
}

/// Split, fit, predict, and flag residual outliers.
pub fn analyze(samples: &[Vec<f64>], targets: &[f64], opts: &RegressOptions) -> Result<RegressReport> {
    if samples.len() != targets.len() {
        bail!("feature/target length mismatch");
    }
    if samples.len() < 5 {
        bail!(
            "need at least 5 complete rows for regression, got {}",
            samples.len()
        );
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    indices.shuffle(&mut rng);

    let test_count = ((samples.len() as f64 * opts.test_fraction).round() as usize)
        .clamp(1, samples.len() - 1);
    let (test_indices, train_indices) = indices.split_at(test_count);

    let train_samples: Vec<Vec<f64>> = train_indices.iter().map(|&i| samples[i].clone()).collect();
    let train_targets: Vec<f64> = train_indices.iter().map(|&i| targets[i]).collect();

    let mut forest = RandomForestRegressor::new(opts.trees, opts.max_depth);
    forest.fit(&train_samples, &train_targets, &mut rng);

    let mut points: Vec<TestPoint> = test_indices
        .iter()
        .map(|&i| {
            let predicted = forest.predict(&samples[i]);
            TestPoint {
                features: samples[i].clone(),
                actual: targets[i],
                predicted,
                residual: (targets[i] - predicted).abs(),
            }
        })
        .collect();

    let mse: f64 =
        points.iter().map(|p| p.residual * p.residual).sum::<f64>() / points.len() as f64;
    let rmse = mse.sqrt();

    let residuals: Vec<f32> = points.iter().map(|p| p.residual as f32).collect();
    let threshold = opts.residual_sigma * stats::stddev(&residuals) as f64;

    points.sort_by(|a, b| {
        b.residual
            .partial_cmp(&a.residual)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let (anomalies, representative): (Vec<TestPoint>, Vec<TestPoint>) =
        points.into_iter().partition(|p| p.residual > threshold);

    Ok(RegressReport {
        train_count: train_indices.len(),
        test_count,
        rmse,
        threshold,
        representative_count: representative.len(),
        anomalies,
    })
}

/// Pull complete feature/target rows out of a combined table.
fn extract_matrix(table: &Table) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    let feature_idx: Vec<usize> = FEATURE_COLUMNS
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<_>>()?;
    let target_idx = table.require_column(TARGET_COLUMN)?;

    let mut samples = Vec::new();
    let mut targets = Vec::new();
    for row in &table.rows {
        let features: Vec<f64> = feature_idx
            .iter()
            .map(|&i| table.numeric_cell(row, i))
            .collect();
        let target = table.numeric_cell(row, target_idx);
        // Rows with any missing value are dropped
        if features.iter().all(|v| v.is_finite()) && target.is_finite() {
            samples.push(features);
            targets.push(target);
        }
    }
    Ok((samples, targets))
}

/// Read the table, run the analysis, print the report, and optionally write
/// the anomalous rows as CSV.
pub fn run(input_csv: &Path, output_dir: Option<&Path>, opts: &RegressOptions) -> Result<()> {
    let table = Table::read(input_csv)?;
    let (samples, targets) = extract_matrix(&table)?;
    let report = analyze(&samples, &targets, opts)?;

    println!(
        "Random forest: {} trees, {} train rows, {} test rows",
        opts.trees, report.train_count, report.test_count
    );
    println!("Random Forest RMSE: {}", report.rmse);
    println!(
        "Residual threshold ({}σ): {}",
        opts.residual_sigma, report.threshold
    );
    println!(
        "Anomalous test rows: {} (representative: {})",
        report.anomalies.len(),
        report.representative_count
    );
    for point in &report.anomalies {
        println!(
            "  features={:?} actual={} predicted={:.4} residual={:.4}",
            point.features, point.actual, point.predicted, point.residual
        );
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("regression_anomalies.csv");
        let mut header: Vec<&str> = FEATURE_COLUMNS.to_vec();
        header.extend(["score", "predicted_score", "residual"]);
        let mut writer = CsvWriter::create(&path, &header)?;
        for point in &report.anomalies {
            let mut fields: Vec<String> = point.features.iter().map(|&v| fmt_num(v)).collect();
            fields.push(fmt_num(point.actual));
            fields.push(format!("{}", point.predicted));
            fields.push(format!("{}", point.residual));
            writer.write_row(&fields)?;
        }
        writer.finish()?;
        println!("Anomalous rows saved to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learnable_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        // score tracks anomaly distance; the other features are noise-free
        let samples: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64, (i % 7) as f64, (i % 13) as f64 * 100.0])
            .collect();
        let targets: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        (samples, targets)
    }

    #[test]
    fn test_analyze_rejects_tiny_input() {
        let samples = vec![vec![1.0, 2.0, 3.0]; 3];
        let targets = vec![0.5; 3];
        assert!(analyze(&samples, &targets, &RegressOptions::default()).is_err());
    }

    #[test]
    fn test_analyze_rejects_length_mismatch() {
        let samples = vec![vec![1.0]; 6];
        let targets = vec![0.5; 5];
        assert!(analyze(&samples, &targets, &RegressOptions::default()).is_err());
    }

    #[test]
    fn test_analyze_partitions_every_test_row() {
        let (samples, targets) = learnable_data(50);
        let report = analyze(&samples, &targets, &RegressOptions::default()).unwrap();
        assert_eq!(report.test_count, 10);
        assert_eq!(report.train_count, 40);
        assert_eq!(
            report.anomalies.len() + report.representative_count,
            report.test_count
        );
        assert!(report.rmse.is_finite());
        assert!(report.threshold >= 0.0);
    }

    #[test]
    fn test_analyze_beats_mean_baseline_on_learnable_data() {
        let (samples, targets) = learnable_data(100);
        let report = analyze(&samples, &targets, &RegressOptions::default()).unwrap();

        let mean: f64 = targets.iter().sum::<f64>() / targets.len() as f64;
        let baseline_mse: f64 = targets.iter().map(|t| (t - mean) * (t - mean)).sum::<f64>()
            / targets.len() as f64;
        assert!(report.rmse < baseline_mse.sqrt());
    }

    #[test]
    fn test_analyze_is_deterministic_for_fixed_seed() {
        let (samples, targets) = learnable_data(60);
        let opts = RegressOptions::default();
        let a = analyze(&samples, &targets, &opts).unwrap();
        let b = analyze(&samples, &targets, &opts).unwrap();
        assert_eq!(a.rmse, b.rmse);
        assert_eq!(a.anomalies.len(), b.anomalies.len());
    }

    #[test]
    fn test_extract_matrix_drops_incomplete_rows() {
        let table = Table {
            header: vec![
                "score".into(),
                "anomaly_distances".into(),
                "angle_diff".into(),
                "box_area".into(),
            ],
            rows: vec![
                vec!["0.5".into(), "10".into(), "1".into(), "100".into()],
                vec!["0.6".into(), "".into(), "2".into(), "200".into()],
                vec!["".into(), "30".into(), "3".into(), "300".into()],
                vec!["0.7".into(), "40".into(), "4".into(), "400".into()],
            ],
        };
        let (samples, targets) = extract_matrix(&table).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(targets, vec![0.5, 0.7]);
        assert_eq!(samples[1], vec![40.0, 4.0, 400.0]);
    }
}
