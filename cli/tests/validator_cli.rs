use std::path::PathBuf;
use std::process::{Command, Output};

fn cli_exe() -> &'static str {
    env!("CARGO_BIN_EXE_mrf-validator")
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("crates")
        .join("core")
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(cli_exe())
        .args(args)
        .output()
        .expect("failed to spawn mrf-validator")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

const USAGE: &str = "Usage: mrf-validator <path to schema> <path to data> [path to output]";

#[test]
fn one_argument_prints_usage_to_stdout() {
    let output = run(&["only-one.xsd"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output).trim(), USAGE);
    assert!(stderr(&output).is_empty());
}

#[test]
fn four_arguments_print_usage_to_stdout() {
    let output = run(&["a", "b", "c", "d"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output).trim(), USAGE);
}

#[test]
fn conforming_data_reports_success_on_stdout() {
    let schema = fixture("reporting-plan.xsd");
    let data = fixture("plan-valid.xml");
    let output = run(&[schema.to_str().unwrap(), data.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "Validation successful.\n");
}

#[test]
fn violating_data_reports_failure_with_position() {
    let schema = fixture("reporting-plan.xsd");
    let data = fixture("plan-invalid.xml");
    let output = run(&[schema.to_str().unwrap(), data.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("Validation failure."));
    let position = lines.next().unwrap_or_default();
    assert!(
        position.starts_with("Line: "),
        "expected a position line, got {position:?}"
    );
    assert!(
        lines.next().is_some_and(|msg| !msg.is_empty()),
        "expected a failure message"
    );
}

#[test]
fn success_result_goes_to_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("result.txt");
    let schema = fixture("reporting-plan.xsd");
    let data = fixture("plan-valid.xml");
    let output = run(&[
        schema.to_str().unwrap(),
        data.to_str().unwrap(),
        out_path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).is_empty());
    assert_eq!(
        std::fs::read_to_string(&out_path).unwrap(),
        "Validation successful.\n"
    );
}

#[test]
fn unwritable_output_path_aborts_before_validation() {
    let schema = fixture("reporting-plan.xsd");
    let data = fixture("plan-valid.xml");
    let output = run(&[
        schema.to_str().unwrap(),
        data.to_str().unwrap(),
        "/no/such/dir/result.txt",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stderr(&output).trim(),
        "Unable to open file /no/such/dir/result.txt for output."
    );
    assert!(stdout(&output).is_empty());
}

#[test]
fn missing_schema_is_reported_on_stderr() {
    let data = fixture("plan-valid.xml");
    let output = run(&["/no/such/schema.xsd", data.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Error opening schema:"));
    assert!(err.contains("/no/such/schema.xsd"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn missing_schema_leaves_requested_output_file_empty() {
    // The output file is created before schema compilation and left behind
    // untouched when compilation fails.
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("result.txt");
    let data = fixture("plan-valid.xml");
    let output = run(&[
        "/no/such/schema.xsd",
        data.to_str().unwrap(),
        out_path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error opening schema:"));
    assert!(out_path.exists());
    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "");
}

#[test]
fn malformed_schema_reports_parse_position() {
    let schema = fixture("malformed.xsd");
    let data = fixture("plan-valid.xml");
    let output = run(&[schema.to_str().unwrap(), data.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Error parsing schema:"));
    let position = err
        .lines()
        .find(|l| l.starts_with("Line: "))
        .expect("expected a position line");
    assert!(position.contains(", Column: "));
}

#[test]
fn missing_data_file_is_reported_on_stderr() {
    let schema = fixture("reporting-plan.xsd");
    let output = run(&[schema.to_str().unwrap(), "/no/such/data.xml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error opening data file:"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn repeated_runs_are_identical() {
    let schema = fixture("reporting-plan.xsd");
    let data = fixture("plan-invalid.xml");
    let first = run(&[schema.to_str().unwrap(), data.to_str().unwrap()]);
    let second = run(&[schema.to_str().unwrap(), data.to_str().unwrap()]);
    assert_eq!(first.status.code(), second.status.code());
    assert_eq!(stdout(&first), stdout(&second));
}
