//! Per-category worker: one category directory in, one category table out.

use crate::csv_table::CsvWriter;
use crate::record::{DetectionRecord, FlattenedRow, COLUMNS};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure scoped to a single category. Never aborts sibling categories.
#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid detection JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write category table: {0}")]
    Write(#[from] anyhow::Error),
}

/// A successfully written category table.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    pub category: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Flatten every detection file of one category into a scratch-local CSV.
///
/// A category without a `detect` subdirectory yields a header-only table;
/// that is a valid, empty result rather than an error.
pub fn process_category(
    category: &str,
    category_path: &Path,
    scratch_dir: &Path,
) -> Result<CategoryTable, CategoryError> {
    let table_path = scratch_dir.join(format!("{}_output.csv", category));
    let mut writer = CsvWriter::create(&table_path, &COLUMNS)?;
    let mut rows = 0usize;

    let detect_dir = category_path.join("detect");
    if detect_dir.is_dir() {
        for file_path in detection_files(&detect_dir)? {
            let filename = file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = std::fs::read_to_string(&file_path).map_err(|source| {
                CategoryError::Io {
                    path: file_path.clone(),
                    source,
                }
            })?;
            let records: Vec<DetectionRecord> =
                serde_json::from_str(&text).map_err(|source| CategoryError::Parse {
                    path: file_path.clone(),
                    source,
                })?;
            for record in &records {
                let row = FlattenedRow::from_record(category, &filename, record);
                writer.write_row(&row.to_fields())?;
                rows += 1;
            }
        }
    }

    writer.finish()?;
    Ok(CategoryTable {
        category: category.to_string(),
        path: table_path,
        rows,
    })
}

/// JSON files under a detect directory, sorted by name so a rerun visits
/// them in a stable order. Record order inside each file is preserved.
fn detection_files(detect_dir: &Path) -> Result<Vec<PathBuf>, CategoryError> {
    let entries = std::fs::read_dir(detect_dir).map_err(|source| CategoryError::Io {
        path: detect_dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CategoryError::Io {
            path: detect_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
