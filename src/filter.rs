//! Rule-based row filtering
//!
//! Applies a sequence of field/operator/value rules from a TOML config to
//! the combined table, extracts a `time` column from the source filename,
//! and writes the surviving rows plus a copy of the config to the output
//! directory.

use crate::csv_table::{CsvWriter, Table};
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Filter configuration: rules are applied in order, each narrowing the
/// surviving row set.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    pub filters: Vec<FilterRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterRule {
    pub field: String,
    pub operator: Operator,
    pub value: RuleValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        };
        f.write_str(symbol)
    }
}

/// Rule comparison value: numeric rules compare parsed cell values,
/// string rules compare cell text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for RuleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleValue::Number(n) => write!(f, "{}", n),
            RuleValue::Text(s) => f.write_str(s),
        }
    }
}

impl FilterConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read filter config {}", path.display()))?;
        toml::from_str(&content).context("failed to parse filter config TOML")
    }
}

impl FilterRule {
    /// Does a cell value satisfy this rule? Cells that fail to parse against
    /// a numeric rule never match.
    pub fn matches(&self, cell: &str) -> bool {
        match &self.value {
            RuleValue::Number(expected) => match cell.parse::<f64>() {
                Ok(actual) => compare(self.operator, actual.partial_cmp(expected)),
                Err(_) => false,
            },
            RuleValue::Text(expected) => {
                compare(self.operator, Some(cell.cmp(expected.as_str())))
            }
        }
    }
}

fn compare(op: Operator, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match ordering {
        None => false,
        Some(ord) => match op {
            Operator::Eq => ord == Equal,
            Operator::Ne => ord != Equal,
            Operator::Gt => ord == Greater,
            Operator::Lt => ord == Less,
            Operator::Ge => ord != Less,
            Operator::Le => ord != Greater,
        },
    }
}

/// Six-digit time stamp embedded in detection filenames,
/// e.g. `frame_120500.json` -> `120500`.
pub fn extract_time(filename: &str, pattern: &Regex) -> String {
    pattern
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Apply the config to the input table and write `filtered_output.csv`
/// (with the extra `time` column) plus a copy of the config.
pub fn run(input_csv: &Path, config_path: &Path, output_dir: &Path) -> Result<()> {
    println!("Loading filter conditions from {}...", config_path.display());
    let config = FilterConfig::from_file(config_path)?;

    println!("Reading data from {}...", input_csv.display());
    let table = Table::read(input_csv)?;

    let mut surviving: Vec<&Vec<String>> = table.rows.iter().collect();
    for rule in &config.filters {
        let idx = table.require_column(&rule.field)?;
        println!("Applying filter: {} {} {}", rule.field, rule.operator, rule.value);
        surviving.retain(|row| row.get(idx).is_some_and(|cell| rule.matches(cell)));
    }
    println!("Number of records after filtering: {}", surviving.len());

    let filename_idx = table.require_column("filename")?;
    let time_pattern = Regex::new(r"_(\d{6})\.json")?;

    std::fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join("filtered_output.csv");

    let mut header: Vec<&str> = table.header.iter().map(|s| s.as_str()).collect();
    header.push("time");
    let mut writer = CsvWriter::create(&output_path, &header)?;
    for row in &surviving {
        let mut fields = (*row).clone();
        // Rows may legitimately be shorter than the header
        let filename = row.get(filename_idx).map(String::as_str).unwrap_or("");
        fields.push(extract_time(filename, &time_pattern));
        writer.write_row(&fields)?;
    }
    writer.finish()?;
    println!("Filtered data saved to {}", output_path.display());

    if let Some(name) = config_path.file_name() {
        std::fs::copy(config_path, output_dir.join(name))
            .with_context(|| format!("failed to copy {} to output", config_path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(field: &str, operator: Operator, value: RuleValue) -> FilterRule {
        FilterRule {
            field: field.to_string(),
            operator,
            value,
        }
    }

    #[test]
    fn test_config_parses_toml() {
        let config: FilterConfig = toml::from_str(
            r#"
            [[filters]]
            field = "score"
            operator = ">="
            value = 0.5

            [[filters]]
            field = "category"
            operator = "=="
            value = "body"
            "#,
        )
        .unwrap();
        assert_eq!(config.filters.len(), 2);
        assert_eq!(config.filters[0].operator, Operator::Ge);
        assert!(matches!(config.filters[1].value, RuleValue::Text(_)));
    }

    #[test]
    fn test_numeric_rule_matching() {
        let r = rule("score", Operator::Gt, RuleValue::Number(0.5));
        assert!(r.matches("0.8"));
        assert!(!r.matches("0.5"));
        assert!(!r.matches("0.2"));
        assert!(!r.matches(""));
        assert!(!r.matches("not a number"));
    }

    #[test]
    fn test_string_rule_matching() {
        let r = rule("category", Operator::Eq, RuleValue::Text("body".into()));
        assert!(r.matches("body"));
        assert!(!r.matches("face"));

        let r = rule("category", Operator::Ne, RuleValue::Text("body".into()));
        assert!(!r.matches("body"));
        assert!(r.matches("face"));
    }

    #[test]
    fn test_all_operators() {
        let cell = "10";
        let cases = [
            (Operator::Eq, 10.0, true),
            (Operator::Ne, 10.0, false),
            (Operator::Gt, 5.0, true),
            (Operator::Lt, 5.0, false),
            (Operator::Ge, 10.0, true),
            (Operator::Le, 9.0, false),
        ];
        for (op, value, expected) in cases {
            let r = rule("x", op, RuleValue::Number(value));
            assert_eq!(r.matches(cell), expected, "{:?} {}", op, value);
        }
    }

    #[test]
    fn test_extract_time() {
        let pattern = Regex::new(r"_(\d{6})\.json").unwrap();
        assert_eq!(extract_time("frame_120500.json", &pattern), "120500");
        assert_eq!(extract_time("cam2_093015.json", &pattern), "093015");
        assert_eq!(extract_time("no_time_here.json", &pattern), "");
        assert_eq!(extract_time("frame_12.json", &pattern), "");
    }

    #[test]
    fn test_run_tolerates_short_rows() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("combined.csv");
        // Second row has fewer fields than the header
        std::fs::write(
            &input,
            "category,filename,score\n\
             body,frame_120000.json,0.9\n\
             stray\n",
        )
        .unwrap();
        let config = dir.path().join("rules.toml");
        std::fs::write(
            &config,
            "[[filters]]\nfield = \"category\"\noperator = \"!=\"\nvalue = \"face\"\n",
        )
        .unwrap();
        let out = dir.path().join("out");

        run(&input, &config, &out).unwrap();

        let result = Table::read(&out.join("filtered_output.csv")).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][3], "120000");
        // The short row survives with an empty time value
        assert_eq!(result.rows[1][0], "stray");
        assert_eq!(result.rows[1].last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_run_filters_and_adds_time_column() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("combined.csv");
        std::fs::write(
            &input,
            "category,filename,score\n\
             body,frame_120000.json,0.9\n\
             body,frame_130000.json,0.3\n\
             face,frame_140000.json,0.95\n",
        )
        .unwrap();
        let config = dir.path().join("rules.toml");
        std::fs::write(
            &config,
            "[[filters]]\nfield = \"score\"\noperator = \">=\"\nvalue = 0.5\n\
             [[filters]]\nfield = \"category\"\noperator = \"==\"\nvalue = \"body\"\n",
        )
        .unwrap();
        let out = dir.path().join("out");

        run(&input, &config, &out).unwrap();

        let result = Table::read(&out.join("filtered_output.csv")).unwrap();
        assert_eq!(result.header.last().map(String::as_str), Some("time"));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], "body");
        assert_eq!(result.rows[0][3], "120000");
        assert!(out.join("rules.toml").exists());
    }
}
