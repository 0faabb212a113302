use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_abs_diff_eq;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stackplot"))
}

fn repo_root() -> PathBuf {
    // crates/sp-cli -> repo root
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures").join(name)
}

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("stackplot_cli_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

#[test]
fn stack_produces_artifact_with_expected_totals() {
    let spec = fixture_path("stack/processes.json");
    assert!(spec.exists(), "missing fixture: {}", spec.display());

    let out_path = tmp_path("stack.json");
    let out = run(&[
        "stack",
        "--input",
        spec.to_string_lossy().as_ref(),
        "--output",
        out_path.to_string_lossy().as_ref(),
    ]);
    assert!(
        out.status.success(),
        "stack should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let artifact: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&out_path).unwrap()).unwrap();
    assert_eq!(artifact["schema_version"], "stackplot_stack_v0");
    assert_eq!(artifact["x_title"], "m_{ll} [GeV]");
    assert_eq!(artifact["y_title"], "Events / 1 GeV");

    // Nominal total: [15, 25] with stat-only quadrature errors.
    let total_y: Vec<f64> =
        serde_json::from_value(artifact["total"]["y"].clone()).unwrap();
    let total_yerr: Vec<f64> =
        serde_json::from_value(artifact["total"]["yerr"].clone()).unwrap();
    assert_eq!(total_y, vec![15.0, 25.0]);
    assert_abs_diff_eq!(total_yerr[0], 1.41421356, epsilon = 1e-7);
    assert_abs_diff_eq!(total_yerr[1], 2.23606798, epsilon = 1e-7);

    // procB (smaller) sits at the bottom of the stack.
    let order: Vec<String> =
        serde_json::from_value(artifact["stack_order"].clone()).unwrap();
    assert_eq!(order, vec!["procB", "procA"]);

    // Legend: biggest background first, then band, then overlays.
    let labels: Vec<String> = artifact["legend"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["Process A", "Process B", "Total SM", "Signal", "Data"]);

    // Integer data counts get Garwood intervals.
    assert_eq!(artifact["data"]["error_model"], "garwood_poisson_68");

    let _ = std::fs::remove_file(&out_path);
}

#[test]
fn aggregate_emits_band_to_stdout() {
    let spec = fixture_path("stack/processes.json");
    let out = run(&["aggregate", "--input", spec.to_string_lossy().as_ref()]);
    assert!(
        out.status.success(),
        "aggregate should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let band_x: Vec<f64> = serde_json::from_value(result["band"]["x"].clone()).unwrap();
    let band_y: Vec<f64> = serde_json::from_value(result["band"]["y"].clone()).unwrap();
    assert_eq!(band_x, vec![0.5, 1.5]);
    assert_eq!(band_y, vec![15.0, 25.0]);
    assert_eq!(result["total"]["name"], "bkg_total");
}

#[test]
fn summary_reports_totals_per_process() {
    let spec = fixture_path("stack/processes.json");
    let out = run(&["summary", "--input", spec.to_string_lossy().as_ref()]);
    assert!(out.status.success());

    let summaries: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rows = summaries.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["name"], "procA");
    assert_eq!(rows[0]["total_in_range"], 30.0);
}

#[test]
fn rejects_unknown_schema_version() {
    let bad = tmp_path("bad_spec.json");
    std::fs::write(
        &bad,
        r#"{"schema_version": "nope_v9", "binning": {"n_bins": 1, "x_min": 0.0, "x_max": 1.0}, "processes": []}"#,
    )
    .unwrap();

    let out = run(&["stack", "--input", bad.to_string_lossy().as_ref()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unsupported schema_version"), "stderr={}", stderr);

    let _ = std::fs::remove_file(&bad);
}
