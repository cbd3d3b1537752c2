//! Integration tests for the TRA CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get a tra command isolated from the user's global config
fn tra(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tra").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("TRA_AUTHOR")
        .env_remove("TRA_FORMAT")
        .env_remove("TRA_SEED")
        .env_remove("TRA_PARALLEL")
        .env_remove("TRA_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path()).arg("init").assert().success();
    tmp
}

/// Helper to write a parameter file into the project
fn write_params(tmp: &TempDir, name: &str, content: &str) -> String {
    let path = tmp.path().join("analyses").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    format!("analyses/{}", name)
}

fn run_json(tmp: &TempDir, file: &str, extra: &[&str]) -> serde_json::Value {
    let mut args = vec!["run", file, "-f", "json"];
    args.extend_from_slice(extra);
    let output = tra(tmp.path()).args(&args).output().unwrap();
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn completed<'a>(record: &'a serde_json::Value, kind: &str) -> &'a serde_json::Value {
    record["calculation_results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["status"] == "completed" && o["type"] == kind)
        .map(|o| &o["result"])
        .unwrap_or_else(|| panic!("no completed {} result in {}", kind, record))
}

const SCENARIOS: &str = r#"
risk_id: "RISK-SCN"
methodology: scenario
scenarios:
  - name: best_case
    probability: 0.05
    impact: 50000
  - name: base_case
    probability: 0.15
    impact: 500000
  - name: worst_case
    probability: 0.35
    impact: 2500000
  - name: stress_test
    probability: 0.6
    impact: 10000000
"#;

const MONTE_CARLO: &str = r#"
risk_id: "RISK-MC"
methodology: monte_carlo
monte_carlo:
  iterations: 2000
  distribution: normal
  probability_min: 0.1
  probability_max: 0.3
  probability_mean: 0.2
  probability_std: 0.05
  impact_min: 100000
  impact_max: 500000
  impact_mean: 250000
  impact_std: 75000
  correlation_factor: 0.3
  confidence_levels: [0.9, 0.95, 0.99]
  time_horizon: 1.0
"#;

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tessera Risk Analysis"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tra"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path()).arg("frobnicate").assert().failure();
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized TRA project"));

    assert!(tmp.path().join(".tra").is_dir());
    assert!(tmp.path().join(".tra/config.yaml").is_file());
    assert!(tmp.path().join("analyses").is_dir());
}

#[test]
fn test_init_twice_suggests_force() {
    let tmp = setup_test_project();
    tra(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    tra(tmp.path()).args(["init", "--force"]).assert().success();
}

// ============================================================================
// New Command Tests
// ============================================================================

#[test]
fn test_new_writes_parameter_file_under_analyses() {
    let tmp = setup_test_project();
    tra(tmp.path())
        .args(["new", "fmea", "--risk-id", "RISK-042"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let path = tmp.path().join("analyses/risk-042-fmea.tra.yaml");
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("risk_id: \"RISK-042\""));
    assert!(content.contains("methodology: fmea"));
    assert!(content.contains("failure_modes:"));
}

#[test]
fn test_new_refuses_to_overwrite_without_force() {
    let tmp = setup_test_project();
    tra(tmp.path()).args(["new", "scenario"]).assert().success();
    tra(tmp.path())
        .args(["new", "scenario"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    tra(tmp.path())
        .args(["new", "scenario", "--force"])
        .assert()
        .success();
}

#[test]
fn test_new_stdout_prints_template() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path())
        .args(["new", "monte_carlo", "--stdout", "--seed", "7", "-n", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seed: 7"))
        .stdout(predicate::str::contains("iterations: 500"));
}

#[test]
fn test_new_without_methodology_lists_choices() {
    let tmp = setup_test_project();
    tra(tmp.path())
        .arg("new")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bow_tie"));
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_generated_files_pass() {
    let tmp = setup_test_project();
    for methodology in ["monte_carlo", "fmea", "bow_tie", "scenario", "value_at_risk"] {
        tra(tmp.path()).args(["new", methodology]).assert().success();
    }

    tra(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All files passed validation"));
}

#[test]
fn test_validate_reports_schema_violation() {
    let tmp = setup_test_project();
    let file = write_params(
        &tmp,
        "bad.tra.yaml",
        "risk_id: \"R\"\nmethodology: delphi\n",
    );

    tra(tmp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed: 1 file has errors"));
}

#[test]
fn test_validate_reports_inconsistent_ranges() {
    let tmp = setup_test_project();
    let file = write_params(
        &tmp,
        "range.tra.yaml",
        &MONTE_CARLO.replace("probability_min: 0.1", "probability_min: 0.9"),
    );

    tra(tmp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stdout(predicate::str::contains("monte_carlo"));
}

#[test]
fn test_validate_catches_infeasible_distribution() {
    let tmp = setup_test_project();
    let file = write_params(
        &tmp,
        "beta.tra.yaml",
        &MONTE_CARLO
            .replace("distribution: normal", "distribution: beta")
            .replace("probability_std: 0.05", "probability_std: 0.5"),
    );

    tra(tmp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stdout(predicate::str::contains("beta requires"));
}

#[test]
fn test_validate_rejects_both_var_spellings() {
    let tmp = setup_test_project();
    let var = "  return_mean: 0\n  return_std: 10000\n";
    let file = write_params(
        &tmp,
        "var.tra.yaml",
        &format!(
            "risk_id: \"R\"\nmethodology: var\nvalue_at_risk:\n{}var:\n{}",
            var, var
        ),
    );

    tra(tmp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_validate_keep_going_counts_every_failure() {
    let tmp = setup_test_project();
    write_params(&tmp, "a.tra.yaml", "methodology: fmea\n");
    write_params(&tmp, "b.tra.yaml", "risk_id: 5\n");
    write_params(&tmp, "c.tra.yaml", SCENARIOS);

    tra(tmp.path())
        .args(["validate", "--keep-going", "analyses"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 files have errors"));
}

#[test]
fn test_validate_outside_project_needs_paths() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path()).arg("validate").assert().failure();
}

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_run_scenario_weighted_average() {
    let tmp = setup_test_project();
    let file = write_params(&tmp, "scn.tra.yaml", SCENARIOS);

    let record = run_json(&tmp, &file, &["--seed", "1"]);
    assert_eq!(record["risk_id"], "RISK-SCN");
    assert_eq!(record["methodology"], "scenario");
    assert!(record["id"].as_str().unwrap().starts_with("ANL-"));

    let result = completed(&record, "scenario");
    let weighted = result["weighted_average"].as_f64().unwrap();
    assert!((weighted - 1_738_125.0).abs() < 1e-6);
}

#[test]
fn test_run_same_seed_is_reproducible() {
    let tmp = setup_test_project();
    let file = write_params(&tmp, "mc.tra.yaml", MONTE_CARLO);

    let first = run_json(&tmp, &file, &["--seed", "42"]);
    let second = run_json(&tmp, &file, &["--seed", "42", "--no-parallel"]);

    assert_eq!(first["seed"], 42);
    let a = completed(&first, "monte_carlo");
    let b = completed(&second, "monte_carlo");
    assert_eq!(a["mean"], b["mean"]);
    assert_eq!(a["percentiles"], b["percentiles"]);
}

#[test]
fn test_run_seed_from_config_is_used() {
    let tmp = setup_test_project();
    let file = write_params(&tmp, "mc.tra.yaml", MONTE_CARLO);
    tra(tmp.path())
        .args(["config", "set", "seed", "99"])
        .assert()
        .success();

    let record = run_json(&tmp, &file, &[]);
    assert_eq!(record["seed"], 99);
}

#[test]
fn test_run_iterations_override() {
    let tmp = setup_test_project();
    let file = write_params(&tmp, "mc.tra.yaml", MONTE_CARLO);

    let record = run_json(&tmp, &file, &["--seed", "3", "-n", "300"]);
    assert_eq!(completed(&record, "monte_carlo")["iterations"], 300);
}

#[test]
fn test_run_csv_and_markdown_formats() {
    let tmp = setup_test_project();
    let file = write_params(&tmp, "scn.tra.yaml", SCENARIOS);

    tra(tmp.path())
        .args(["run", &file, "--seed", "5", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("section,metric,value"))
        .stdout(predicate::str::contains("record,seed,5"));

    tra(tmp.path())
        .args(["run", &file, "--seed", "5", "-f", "md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Risk Analysis ANL-"))
        .stdout(predicate::str::contains("|"));
}

#[test]
fn test_run_writes_output_file() {
    let tmp = setup_test_project();
    let file = write_params(&tmp, "scn.tra.yaml", SCENARIOS);

    tra(tmp.path())
        .args(["run", &file, "-f", "yaml", "-o", "record.yaml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Written to"));

    let content = fs::read_to_string(tmp.path().join("record.yaml")).unwrap();
    assert!(content.contains("risk_id: RISK-SCN"));
}

#[test]
fn test_run_records_failed_evaluator_without_aborting() {
    let tmp = setup_test_project();
    let content = format!(
        "{}failure_modes: []\n",
        SCENARIOS.replace("methodology: scenario", "methodology: comprehensive")
    );
    let file = write_params(&tmp, "mixed.tra.yaml", &content);

    let output = tra(tmp.path())
        .args(["run", &file, "-f", "json", "--seed", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed"));

    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let failed = record["calculation_results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["status"] == "failed")
        .expect("fmea failure recorded");
    assert_eq!(failed["evaluator"], "fmea");
    assert_eq!(failed["error_kind"], "empty_input");
    completed(&record, "scenario");
}

#[test]
fn test_run_invalid_file_shows_diagnostic() {
    let tmp = setup_test_project();
    let file = write_params(
        &tmp,
        "bad.tra.yaml",
        "risk_id: \"R\"\nmethodology: fmea\nfailure_modes:\n  - name: x\n    severity: 12\n    occurrence: 2\n    detection: 3\n",
    );

    tra(tmp.path())
        .args(["run", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("severity"));
}

#[test]
fn test_run_missing_file_fails() {
    let tmp = setup_test_project();
    tra(tmp.path())
        .args(["run", "analyses/nope.tra.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_new_then_run_every_methodology() {
    let tmp = setup_test_project();
    for methodology in [
        "monte_carlo",
        "fmea",
        "bow_tie",
        "scenario",
        "value_at_risk",
        "comprehensive",
    ] {
        tra(tmp.path())
            .args(["new", methodology, "--seed", "11", "-n", "400"])
            .assert()
            .success();
        let file = format!("analyses/risk-001-{}.tra.yaml", methodology);
        let record = run_json(&tmp, &file, &[]);
        assert_eq!(record["methodology"], methodology);
        assert_eq!(record["seed"], 11);
        assert!(record["calculation_results"]
            .as_array()
            .unwrap()
            .iter()
            .all(|o| o["status"] == "completed"));
    }
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_set_and_show() {
    let tmp = setup_test_project();
    tra(tmp.path())
        .args(["config", "set", "author", "Dana Risk"])
        .assert()
        .success();

    tra(tmp.path())
        .args(["config", "show", "author"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dana Risk"));

    tra(tmp.path())
        .args(["config", "unset", "author"])
        .assert()
        .success();
}

#[test]
fn test_config_rejects_unknown_key_and_bad_value() {
    let tmp = setup_test_project();
    tra(tmp.path())
        .args(["config", "set", "editor", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));

    tra(tmp.path())
        .args(["config", "set", "parallel", "sometimes"])
        .assert()
        .failure();
}

#[test]
fn test_config_env_overrides_project() {
    let tmp = setup_test_project();
    tra(tmp.path())
        .args(["config", "set", "seed", "1"])
        .assert()
        .success();

    tra(tmp.path())
        .env("TRA_SEED", "77")
        .args(["config", "show", "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("77"));
}

#[test]
fn test_config_keys_lists_everything() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path())
        .args(["config", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_secs"))
        .stdout(predicate::str::contains("default_format"));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    tra(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tra"));
}
