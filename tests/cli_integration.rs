//! Integration tests that run the CLI binary.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const ENV_KEYS: &[&str] = &[
    "GCP_PROJECT_ID",
    "GCP_LOCATION",
    "DEFAULT_AGENT_ID",
    "DEFAULT_CONVERSATION_ID",
    "CONVERSATION_MODE",
    "ENABLE_CHART_RENDERING",
    "MAX_MESSAGE_HISTORY",
    "RUST_LOG",
];

const TREND_STREAM: &str = r#"{"userMessage": {"text": "monthly revenue trend"}}
{"systemMessage": {"text": {"parts": ["Planning the query"], "textType": "THOUGHT"}}}
{"systemMessage": {"data": {"generatedSql": "SELECT month, revenue FROM sales", "result": {"schema": {"fields": [{"name": "month"}, {"name": "revenue"}]}, "data": [{"month": "Jan", "revenue": 10}, {"month": "Feb", "revenue": 12}, {"month": "Mar", "revenue": 15}]}}}}
{"systemMessage": {"text": {"parts": ["Revenue grew every month."]}}}
"#;

fn bin() -> Command {
    let bin = env!("CARGO_BIN_EXE_datachat");
    let mut cmd = Command::new(bin);
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

/// Run from a temp dir so dotenv() won't load .env from the project root.
fn bin_in(dir: &tempfile::TempDir) -> Command {
    let mut cmd = bin();
    cmd.current_dir(dir.path());
    cmd
}

fn write_fixture(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary not found - run cargo build first");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for binary")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cli_help_succeeds_and_outputs_usage() {
    let output = bin()
        .arg("--help")
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("replay"), "expected subcommands in usage text");
    assert!(stdout.contains("EXAMPLES"));
}

#[test]
fn cli_version_succeeds() {
    let output = bin()
        .arg("--version")
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("datachat"));
}

#[test]
fn replay_prints_table_and_fallback_chart() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let stream = write_fixture(&tmp, "turn.jsonl", TREND_STREAM);

    let output = bin_in(&tmp)
        .arg("replay")
        .arg(&stream)
        .args(["--question", "monthly revenue trend"])
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("> monthly revenue trend"), "{}", stdout);
    assert!(stdout.contains("[thinking]"));
    assert!(stdout.contains("[sql]\n  SELECT month, revenue FROM sales"));
    assert!(stdout.contains("[table] 3 row(s)"));
    assert!(stdout.contains("[chart] line chart, fallback, 3 row(s)"), "{}", stdout);
    assert!(stdout.contains("Revenue grew every month."));
}

#[test]
fn replay_without_chart_rendering_skips_fallback() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let stream = write_fixture(&tmp, "turn.jsonl", TREND_STREAM);

    let output = bin_in(&tmp)
        .env("ENABLE_CHART_RENDERING", "false")
        .arg("replay")
        .arg(&stream)
        .args(["--question", "monthly revenue trend"])
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("[chart]"));
}

#[test]
fn replay_trailing_bad_line_keeps_fallback() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let stream = write_fixture(&tmp, "turn.jsonl", &format!("{}not json\n", TREND_STREAM));

    let output = bin_in(&tmp)
        .arg("replay")
        .arg(&stream)
        .args(["--question", "monthly revenue trend"])
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[error] Invalid JSON in response stream"), "{}", stdout);
    assert!(stdout.contains("[chart] line chart, fallback, 3 row(s)"), "{}", stdout);
    assert!(!stdout.contains("(turn ended with an error)"));
}

#[test]
fn replay_json_from_stdin() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let stream = concat!(
        r#"{"systemMessage": {"text": {"parts": ["Here are results. {\"mark\": \"bar\", \"encoding\": {}}"]}}}"#,
        "\n",
        r#"{"systemMessage": {"chart": {"result": {"vegaConfig": {"mark": "bar", "data": {"values": [{"a": 1}]}, "encoding": {"x": {"field": "a", "type": "nominal", "sort": {}}}}}}}}"#,
        "\n",
    );
    let mut cmd = bin_in(&tmp);
    cmd.args(["replay", "-", "--json", "--question", "compare a"]);
    let output = run_with_stdin(cmd, stream);

    assert_success(&output);
    let turn: serde_json::Value = serde_json::from_slice(&output.stdout).expect("turn JSON");
    assert_eq!(turn["outcome"], "complete");
    let entries = turn["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["type"], "text");
    assert_eq!(entries[0]["content"], "Here are results.");
    assert_eq!(entries[1]["content"]["origin"], "declarative");
    let spec = &entries[1]["content"]["spec"];
    assert_eq!(spec["$schema"], "https://vega.github.io/schema/vega-lite/v5.json");
    assert!(spec["encoding"]["x"].get("sort").is_none());
}

#[test]
fn replay_stops_at_error_and_keeps_going_past_bad_lines() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let stream = write_fixture(
        &tmp,
        "turn.jsonl",
        concat!(
            "{\"systemMessage\": {\"text\": {\"parts\": [\"Starting.\"]}}}\n",
            "this is not json\n",
            "{\"systemMessage\": {\"text\": {\"parts\": [\"Still here.\"]}}}\n",
            "{\"systemMessage\": {\"error\": {\"text\": \"Query exceeded limits\"}}}\n",
            "{\"systemMessage\": {\"text\": {\"parts\": [\"Never shown.\"]}}}\n",
        ),
    );

    let output = bin_in(&tmp)
        .args(["-q", "replay"])
        .arg(&stream)
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[error] Invalid JSON in response stream"), "{}", stdout);
    assert!(stdout.contains("Still here."));
    assert!(stdout.contains("[error] Query exceeded limits"));
    assert!(!stdout.contains("Never shown."));
    assert!(stdout.trim_end().ends_with("(turn ended with an error)"));
}

#[test]
fn replay_missing_file_exits_with_error() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let output = bin_in(&tmp)
        .args(["replay", "missing.jsonl"])
        .output()
        .expect("binary not found - run cargo build first");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Failed to read response stream"), "{}", stderr);
}

#[test]
fn request_without_project_exits_with_error() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let output = bin_in(&tmp)
        .args(["request", "--question", "top 5 products"])
        .output()
        .expect("binary not found - run cargo build first");

    assert!(
        !output.status.success(),
        "expected failure when GCP_PROJECT_ID is not set"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("GCP_PROJECT_ID"),
        "expected project id error message, got: {}",
        stderr
    );
}

#[test]
fn request_stateless_resends_history() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let history = write_fixture(
        &tmp,
        "history.json",
        r#"[{"question": "revenue by month"}, {"question": "only 2024"}]"#,
    );

    let output = bin_in(&tmp)
        .env("GCP_PROJECT_ID", "acme")
        .env("DEFAULT_AGENT_ID", "sales")
        .args(["request", "--question", "as a line chart", "--mode", "stateless", "--history"])
        .arg(&history)
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    let request: serde_json::Value = serde_json::from_slice(&output.stdout).expect("request JSON");
    assert_eq!(request["parent"], "projects/acme/locations/global");
    assert_eq!(
        request["dataAgentContext"]["dataAgent"],
        "projects/acme/locations/global/dataAgents/sales"
    );
    let texts: Vec<&str> = request["messages"]
        .as_array()
        .expect("messages")
        .iter()
        .filter_map(|m| m["userMessage"]["text"].as_str())
        .collect();
    assert_eq!(texts, vec!["revenue by month", "only 2024", "as a line chart"]);
}

#[test]
fn extract_reads_stdin() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let mut cmd = bin_in(&tmp);
    cmd.arg("extract");
    let output = run_with_stdin(
        cmd,
        "Sales by region:\n```json\n{\"mark\": \"bar\", \"encoding\": {}}\n```",
    );

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Sales by region:\n"), "{}", stdout);
    assert!(stdout.contains("--- chart ---"));
    assert!(stdout.contains("\"mark\": \"bar\""));
}

#[test]
fn sanitize_converts_temporal_seconds() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let spec = write_fixture(
        &tmp,
        "chart.json",
        r#"{"mark": "line", "data": {"values": [{"t": 1704067200, "v": 1}]}, "encoding": {"x": {"field": "t", "type": "temporal"}}}"#,
    );

    let output = bin_in(&tmp)
        .arg("sanitize")
        .arg(&spec)
        .output()
        .expect("binary not found - run cargo build first");

    assert_success(&output);
    let sanitized: serde_json::Value = serde_json::from_slice(&output.stdout).expect("spec JSON");
    assert_eq!(sanitized["data"]["values"][0]["t"], 1704067200000i64);
}

#[test]
fn invalid_config_value_exits_with_error() {
    let tmp = tempfile::TempDir::new().expect("temp dir");
    let output = bin_in(&tmp)
        .env("CONVERSATION_MODE", "sometimes")
        .arg("config")
        .output()
        .expect("binary not found - run cargo build first");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CONVERSATION_MODE"), "{}", stderr);
}
