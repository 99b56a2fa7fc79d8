use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::time::Duration;

fn bind_cli() -> Command {
  let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bind-cli");
  cmd.timeout(Duration::from_secs(5));
  cmd
}

fn stdout_json(stdout: &[u8]) -> Value {
  serde_json::from_slice(stdout).expect("stdout should be valid JSON")
}

#[test]
fn parse_describes_the_binding() {
  let assert = bind_cli()
    .args(["parse", "with(f) f(@option(Number) n = 2, xs) as String[]"])
    .assert()
    .success();
  let output = stdout_json(&assert.get_output().stdout);
  assert_eq!(output["imports"], serde_json::json!(["f"]));
  assert_eq!(output["parameters"], serde_json::json!(["n", "xs"]));
  assert_eq!(output["options"][0]["name"], "n");
  assert_eq!(output["options"][0]["type"], "Number");
  assert_eq!(output["options"][0]["default"], 2.0);
  assert_eq!(output["options"][0]["declaration"], "@option(Number) n = 2");
  assert_eq!(output["result_type"], "String[]");
  assert_eq!(output["void"], false);
}

#[test]
fn parse_errors_are_reported_with_code_and_position() {
  bind_cli()
    .args(["parse", "with(a, b) a()"])
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::starts_with("error: PB0021 at 1:"));
}

#[test]
fn eval_prints_json() {
  let assert = bind_cli()
    .args([
      "eval",
      "xs.map(x => x.toUpperCase())",
      "--param",
      r#"xs=["a","b"]"#,
    ])
    .assert()
    .success();
  assert_eq!(stdout_json(&assert.get_output().stdout), serde_json::json!(["A", "B"]));
}

#[test]
fn eval_boundary_controls_sentinels() {
  bind_cli()
    .args(["eval", "obj.missing", "--param", "obj={}"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing"));

  bind_cli()
    .args(["eval", "obj.missing", "--param", "obj={}", "--boundary", "data"])
    .assert()
    .success()
    .stdout("null\n");
}

#[test]
fn eval_rejects_malformed_params() {
  bind_cli()
    .args(["eval", "x", "--param", "x"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("NAME=JSON"));
}
