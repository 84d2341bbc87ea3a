//! Integration tests for `monorail affected`

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_affected_names_in_dependency_order() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.touch_package("d")?;

  let output = run_monorail(&ws.path, &["affected", "--changed", "--ancestors", "--format", "names-only"])?;
  let names: Vec<_> = stdout(&output).lines().map(String::from).collect();

  assert_eq!(names.len(), 5);
  let pos = |n: &str| names.iter().position(|x| x == n).unwrap();
  assert_eq!(pos("d"), 0, "dependencies come first: {:?}", names);
  assert!(pos("b") < pos("a"));
  assert!(pos("c") < pos("e"));
  Ok(())
}

#[test]
fn test_affected_json_output() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.touch_package("b")?;

  let output = run_monorail(&ws.path, &["affected", "--changed", "--ancestors", "--format", "json"])?;
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(json["changed_files"], serde_json::json!(["packages/b/src/index.ts"]));
  let workspaces = json["workspaces"].as_array().unwrap();
  let reasons: Vec<(&str, &str)> = workspaces
    .iter()
    .map(|w| (w["name"].as_str().unwrap(), w["reason"].as_str().unwrap()))
    .collect();
  assert_eq!(reasons, vec![("b", "changed"), ("a", "ancestor")]);
  assert_eq!(json["summary"]["total_count"], 5);
  Ok(())
}

#[test]
fn test_affected_text_without_changes() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path, &["affected", "--changed"])?;
  let out = stdout(&output);

  assert!(out.contains("Changed files: 0"), "stdout: {}", out);
  assert!(out.contains("No workspaces found in selection"));
  Ok(())
}

#[test]
fn test_affected_reports_cycles_once() -> Result<()> {
  let ws = TestWorkspace::new()?;
  // d → a closes the loop a → b → d → a
  ws.add_package("d", &["a"], None)?;
  ws.commit("Introduce a cycle")?;

  let output = run_monorail(&ws.path, &["affected", "d", "--ancestors", "--descendants"])?;

  let err = stderr(&output);
  assert_eq!(err.matches("Dependency cycle detected").count(), 1, "stderr: {}", err);
  assert!(stdout(&output).contains("Selected: 5 workspace(s)"));
  Ok(())
}

#[test]
fn test_affected_rejects_unknown_format() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail_raw(&ws.path, &["affected", "--format", "yaml"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  Ok(())
}
