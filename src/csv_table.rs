//! CSV reading and writing for the analysis tables
//!
//! Hand-rolled on purpose: the tables use a fixed schema and the only CSV
//! subtleties that matter are field escaping and quote-aware parsing.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Escape a CSV field (handle commas, quotes, newlines).
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV line, escaping where needed.
pub fn format_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Buffered CSV file writer that emits the header on creation.
pub struct CsvWriter {
    inner: BufWriter<File>,
}

impl CsvWriter {
    pub fn create(path: &Path, header: &[&str]) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut inner = BufWriter::new(file);
        writeln!(inner, "{}", header.join(","))?;
        Ok(CsvWriter { inner })
    }

    pub fn write_row(&mut self, fields: &[String]) -> Result<()> {
        writeln!(self.inner, "{}", format_row(fields))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// An in-memory CSV table: header plus string rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read and parse a CSV file. Quoted fields may contain commas,
    /// doubled quotes, and newlines.
    pub fn read(path: &Path) -> Result<Table> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut records = parse_csv(&text);
        if records.is_empty() {
            bail!("{} has no header row", path.display());
        }
        let header = records.remove(0);
        Ok(Table {
            header,
            rows: records,
        })
    }

    /// Index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|c| c == name)
    }

    /// Index of a named column, as an error when absent.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .with_context(|| format!("input CSV has no '{}' column", name))
    }

    /// Parse a column as f32 values, skipping empty and non-numeric cells.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f32>> {
        let idx = self.require_column(name)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(idx))
            .filter_map(|cell| cell.parse::<f32>().ok())
            .collect())
    }

    /// Cell value for a row/column pair, parsed as f64. Returns NaN for
    /// missing or non-numeric cells so threshold comparisons come out false.
    pub fn numeric_cell(&self, row: &[String], idx: usize) -> f64 {
        row.get(idx)
            .and_then(|cell| cell.parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    }
}

/// Parse CSV text into records of unescaped fields.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    record.push(std::mem::take(&mut field));
                    // A trailing comma means one more (empty) field
                    if chars.peek().is_none() {
                        record.push(String::new());
                        records.push(std::mem::take(&mut record));
                    }
                }
                '\r' => {}
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
