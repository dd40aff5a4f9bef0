// CLI tests for the analysis subcommands over a combined table.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "category,filename,class_id,class_label,score,anomaly_distances,angle_diff,\
                      box_x1,box_y1,box_x2,box_y2,box_width,box_height,box_area,box_area_percentage";

/// Synthetic combined table: 40 rows, two categories, score rising with
/// anomaly distance so the regression has something to learn.
fn sample_combined(dir: &Path) -> PathBuf {
    let mut content = String::from(HEADER);
    content.push('\n');
    for i in 0..40 {
        let category = if i % 2 == 0 { "body" } else { "face" };
        let score = 0.05 + (i % 10) as f64 / 10.0;
        let dist = (i * 10) as f64;
        let diff = i as f64;
        let area = 1000 + i * 10;
        content.push_str(&format!(
            "{cat},frame_1200{i:02}.json,0,person,{score},{dist},{diff},0,0,10,10,10,10,{area},0.65\n",
            cat = category,
            i = i,
            score = score,
            dist = dist,
            diff = diff,
            area = area,
        ));
    }
    let path = dir.join("combined.csv");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_thresholds_cli_writes_sweep() {
    let tmp = TempDir::new().unwrap();
    let input = sample_combined(tmp.path());
    let output = tmp.path().join("z_score_thresholds.csv");

    let mut cmd = Command::cargo_bin("anodet").unwrap();
    cmd.arg("thresholds")
        .arg("--input-csv")
        .arg(&input)
        .arg("--output-csv")
        .arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Z-score thresholds saved"));

    let content = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 10); // header + z = 1..=9
    assert!(lines[0].contains("anomaly_distances_lower_threshold"));
    assert!(lines[0].contains("angle_diff_anomalies_count"));
    assert!(lines[1].starts_with("1,"));
    assert!(lines[9].starts_with("9,"));
}

#[test]
fn test_bins_cli_writes_split_and_ratios() {
    let tmp = TempDir::new().unwrap();
    let input = sample_combined(tmp.path());
    let out_dir = tmp.path().join("bins_out");

    let mut cmd = Command::cargo_bin("anodet").unwrap();
    cmd.arg("bins")
        .arg("--input-csv")
        .arg(&input)
        .arg("--column")
        .arg("anomaly_distances")
        .arg("--threshold")
        .arg("200")
        .arg("--output-dir")
        .arg(&out_dir);
    cmd.assert().success();

    let anomalies =
        fs::read_to_string(out_dir.join("anomaly_distances_anomalies.csv")).unwrap();
    // dist > 200 means rows 21..=39
    assert_eq!(anomalies.lines().count(), 1 + 19);

    let ratios = fs::read_to_string(
        out_dir.join("anomaly_ratio_by_score_bin_anomaly_distances.csv"),
    )
    .unwrap();
    let lines: Vec<&str> = ratios.lines().collect();
    assert_eq!(lines.len(), 1 + 9);
    assert_eq!(lines[0], "score_bin,anomaly_ratio");
    assert!(lines[1].starts_with("0.1~0.2,"));
    assert!(lines[9].starts_with("0.9~1.0,"));
}

#[test]
fn test_bins_cli_rejects_unknown_column() {
    let tmp = TempDir::new().unwrap();
    let input = sample_combined(tmp.path());

    let mut cmd = Command::cargo_bin("anodet").unwrap();
    cmd.arg("bins")
        .arg("--input-csv")
        .arg(&input)
        .arg("--column")
        .arg("box_area")
        .arg("--threshold")
        .arg("1")
        .arg("--output-dir")
        .arg(tmp.path().join("out"));
    cmd.assert().failure();
}

#[test]
fn test_pivot_cli_counts_classifications() {
    let tmp = TempDir::new().unwrap();
    let input = sample_combined(tmp.path());
    let out_dir = tmp.path().join("pivot_out");

    let mut cmd = Command::cargo_bin("anodet").unwrap();
    cmd.arg("pivot")
        .arg("--input-csv")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--dist-threshold")
        .arg("200")
        .arg("--diff-threshold")
        .arg("10000");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Analysis completed"));

    let content =
        fs::read_to_string(out_dir.join("category_analysis_results.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "combined_filename,Anomalous Data + Score High,Anomalous Data + Score Low,\
         Normal Data + Score High,Normal Data + Score Low"
    );
    // One row per (category, filename) pair; every input filename is unique
    assert_eq!(lines.len(), 1 + 40);
    assert!(lines[1].starts_with("body_frame_120000.json,"));
}

#[test]
fn test_filter_cli_applies_rules_and_extracts_time() {
    let tmp = TempDir::new().unwrap();
    let input = sample_combined(tmp.path());
    let config = tmp.path().join("rules.toml");
    fs::write(
        &config,
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
    let out_dir = tmp.path().join("filter_out");

    let mut cmd = Command::cargo_bin("anodet").unwrap();
    cmd.arg("filter")
        .arg("--input-csv")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .arg("--output-dir")
        .arg(&out_dir);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Applying filter: score >= 0.5"))
        .stdout(predicate::str::contains("Applying filter: category == body"));

    let content = fs::read_to_string(out_dir.join("filtered_output.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines[0].ends_with(",time"));
    // body rows are even i; score >= 0.5 means i % 10 >= 5, so i in {6, 8, 16, 18, ...}
    assert_eq!(lines.len(), 1 + 8);
    for line in &lines[1..] {
        assert!(line.starts_with("body,"));
        let time = line.rsplit(',').next().unwrap();
        assert_eq!(time.len(), 6, "bad time field in {}", line);
    }
    assert!(out_dir.join("rules.toml").exists());
}

#[test]
fn test_regress_cli_reports_rmse_and_writes_anomalies() {
    let tmp = TempDir::new().unwrap();
    let input = sample_combined(tmp.path());
    let out_dir = tmp.path().join("regress_out");

    let mut cmd = Command::cargo_bin("anodet").unwrap();
    cmd.arg("regress")
        .arg("--input-csv")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--trees")
        .arg("30");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Random Forest RMSE:"))
        .stdout(predicate::str::contains("Anomalous test rows:"));

    let content = fs::read_to_string(out_dir.join("regression_anomalies.csv")).unwrap();
    assert!(content.starts_with(
        "anomaly_distances,angle_diff,box_area,score,predicted_score,residual"
    ));
}

#[test]
fn test_regress_cli_rejects_tiny_table() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("tiny.csv");
    fs::write(
        &input,
        format!("{}\nbody,f.json,0,p,0.5,10,1,0,0,1,1,1,1,1,0.1\n", HEADER),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("anodet").unwrap();
    cmd.arg("regress").arg("--input-csv").arg(&input);
    cmd.assert().failure();
}
