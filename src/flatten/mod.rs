//! Category flattening and aggregation pipeline
//!
//! Discovers one category per subdirectory of the base directory, flattens
//! each category's detection JSON files into a scratch-local CSV on a
//! fixed-size worker pool, then merges the per-category tables into one
//! combined table. A failing category is logged and excluded from the merge;
//! it never aborts the run.

mod worker;

pub use worker::{process_category, CategoryError, CategoryTable};

use crate::csv_table::{CsvWriter, Table};
use crate::record::COLUMNS;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Pipeline configuration for one `flatten` run.
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    pub base_dir: PathBuf,
    pub output_csv: PathBuf,
    pub scratch_dir: PathBuf,
    /// Retain the per-category scratch tables after the merge.
    pub keep_scratch: bool,
    /// Worker threads; `None` sizes the pool to available parallelism.
    pub jobs: Option<usize>,
}

/// Per-run outcome counts plus the categories that failed.
#[derive(Debug, Clone, Default)]
pub struct FlattenSummary {
    pub categories: usize,
    pub succeeded: usize,
    pub rows: usize,
    pub failed: Vec<String>,
}

/// Run the whole pipeline: discover, dispatch, merge, clean up.
pub fn run(opts: &FlattenOptions) -> Result<FlattenSummary> {
    let categories = discover_categories(&opts.base_dir)?;
    std::fs::create_dir_all(&opts.scratch_dir)
        .with_context(|| format!("failed to create {}", opts.scratch_dir.display()))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.unwrap_or(0))
        .build()
        .context("failed to build worker pool")?;

    // One task per category; the collect is the completion barrier.
    let outcomes: Vec<(String, Result<CategoryTable, CategoryError>)> = pool.install(|| {
        categories
            .par_iter()
            .map(|(name, path)| {
                let result = process_category(name, path, &opts.scratch_dir);
                (name.clone(), result)
            })
            .collect()
    });

    let mut summary = FlattenSummary {
        categories: categories.len(),
        ..Default::default()
    };
    let mut tables = Vec::new();
    for (category, outcome) in outcomes {
        match outcome {
            Ok(table) => {
                println!(
                    "Category {}: processed {} rows, saved to {}",
                    category,
                    table.rows,
                    table.path.display()
                );
                summary.succeeded += 1;
                summary.rows += table.rows;
                tables.push(table);
            }
            Err(err) => {
                println!("Category {}: failed: {}", category, err);
                tracing::warn!(category = %category, error = %err, "category excluded from merge");
                summary.failed.push(category);
            }
        }
    }

    combine(&tables, &opts.output_csv)?;
    println!(
        "All category tables combined into {}",
        opts.output_csv.display()
    );

    if !opts.keep_scratch {
        std::fs::remove_dir_all(&opts.scratch_dir)
            .with_context(|| format!("failed to remove {}", opts.scratch_dir.display()))?;
    }

    Ok(summary)
}

/// Immediate subdirectories of the base directory, one category each.
/// Non-directory entries are ignored. Sorted by name for stable output.
pub fn discover_categories(base_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(base_dir)
        .with_context(|| format!("failed to read base directory {}", base_dir.display()))?;
    let mut categories = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            categories.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    categories.sort();
    Ok(categories)
}

/// Concatenate the given category tables into the combined table.
///
/// The column schema is fixed; an empty input set produces a header-only
/// file. Row content is order-independent across tables.
pub fn combine(tables: &[CategoryTable], output_csv: &Path) -> Result<()> {
    if let Some(parent) = output_csv.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let mut writer = CsvWriter::create(output_csv, &COLUMNS)?;
    for table in tables {
        let parsed = Table::read(&table.path)
            .with_context(|| format!("failed to read category table for {}", table.category))?;
        for row in &parsed.rows {
            writer.write_row(row)?;
        }
    }
    writer.finish()
}
