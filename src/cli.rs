//! CLI argument parsing for anodet

use crate::pivot;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Metric column a threshold split can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnomalyColumn {
    #[value(name = "anomaly_distances")]
    AnomalyDistances,
    #[value(name = "angle_diff")]
    AngleDiff,
}

impl AnomalyColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyColumn::AnomalyDistances => "anomaly_distances",
            AnomalyColumn::AngleDiff => "angle_diff",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "anodet")]
#[command(version)]
#[command(about = "Detection-output anomaly analysis toolkit", long_about = None)]
pub struct Cli {
    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Flatten per-category detection JSON into one combined CSV
    Flatten {
        /// Base directory containing one subdirectory per category
        #[arg(long = "base-dir", value_name = "DIR")]
        base_dir: PathBuf,

        /// Combined output CSV path
        #[arg(long = "output-csv", value_name = "FILE")]
        output_csv: PathBuf,

        /// Scratch directory for per-category intermediate tables
        #[arg(long = "scratch-dir", value_name = "DIR", default_value = "tmp_csvs")]
        scratch_dir: PathBuf,

        /// Retain the scratch directory after the merge
        #[arg(long = "keep-scratch")]
        keep_scratch: bool,

        /// Worker threads (default: available parallelism)
        #[arg(long = "jobs", value_name = "N")]
        jobs: Option<usize>,
    },

    /// Sweep z-score thresholds over numeric columns
    Thresholds {
        /// Input CSV (combined table)
        #[arg(long = "input-csv", value_name = "FILE")]
        input_csv: PathBuf,

        /// Columns to sweep
        #[arg(
            long = "columns",
            value_name = "COLS",
            value_delimiter = ',',
            default_value = "anomaly_distances,angle_diff"
        )]
        columns: Vec<String>,

        /// Output CSV path
        #[arg(
            long = "output-csv",
            value_name = "FILE",
            default_value = "z_score_thresholds.csv"
        )]
        output_csv: PathBuf,
    },

    /// Split rows at a threshold and report anomaly ratios per score bin
    Bins {
        /// Input CSV (combined table)
        #[arg(long = "input-csv", value_name = "FILE")]
        input_csv: PathBuf,

        /// Column the threshold applies to
        #[arg(long = "column", value_enum)]
        column: AnomalyColumn,

        /// Values above this threshold are anomalous
        #[arg(long = "threshold", value_name = "VALUE")]
        threshold: f64,

        /// Output directory for analysis results
        #[arg(long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,
    },

    /// Pivot per-file classification counts
    Pivot {
        /// Input CSV (combined table)
        #[arg(long = "input-csv", value_name = "FILE")]
        input_csv: PathBuf,

        /// Output directory for results
        #[arg(long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,

        /// Anomaly cutoff for anomaly_distances
        #[arg(
            long = "dist-threshold",
            value_name = "VALUE",
            default_value_t = pivot::DEFAULT_DIST_THRESHOLD
        )]
        dist_threshold: f64,

        /// Anomaly cutoff for angle_diff
        #[arg(
            long = "diff-threshold",
            value_name = "VALUE",
            default_value_t = pivot::DEFAULT_DIFF_THRESHOLD
        )]
        diff_threshold: f64,
    },

    /// Filter rows with field/operator/value rules from a TOML config
    Filter {
        /// Input CSV (combined table)
        #[arg(long = "input-csv", value_name = "FILE")]
        input_csv: PathBuf,

        /// TOML config with [[filters]] rules
        #[arg(long = "config", value_name = "FILE")]
        config: PathBuf,

        /// Output directory for filtered data
        #[arg(long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,
    },

    /// Flag rows a score regression cannot explain
    Regress {
        /// Input CSV (combined table)
        #[arg(long = "input-csv", value_name = "FILE")]
        input_csv: PathBuf,

        /// Optional output directory for the anomalous rows CSV
        #[arg(long = "output-dir", value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Trees in the forest
        #[arg(long = "trees", value_name = "N", default_value_t = 100)]
        trees: usize,

        /// RNG seed for the train/test split and the bootstrap
        #[arg(long = "seed", value_name = "SEED", default_value_t = 42)]
        seed: u64,

        /// Residuals beyond this many standard deviations are anomalous
        #[arg(long = "residual-sigma", value_name = "SIGMA", default_value_t = 2.0)]
        residual_sigma: f64,
    },
}
