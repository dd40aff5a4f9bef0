//! anodet - detection-output anomaly analysis toolkit
//!
//! Flattens per-category object-detection JSON into tabular CSV data, then
//! applies statistical thresholding, binning, filtering, pivoting, and
//! regression-residual analysis to flag anomalous records. Every operation
//! is a stateless, single-pass computation over flat files.

pub mod cli;
pub mod csv_table;
pub mod filter;
pub mod flatten;
pub mod pivot;
pub mod record;
pub mod regression;
pub mod score_bins;
pub mod stats;
pub mod thresholds;
