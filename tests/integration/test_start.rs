//! Integration tests for `monorail start`

use crate::helpers::*;
use anyhow::Result;
use std::time::Duration;

#[test]
fn test_start_app() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path, &["start", "a", "--", "--port", "3001"])?;

  let err = stderr(&output);
  assert!(err.contains("package: a name: a app: true"), "stderr: {}", err);
  // Runs inside the package directory, so the package itself is "."
  assert_eq!(runner_args(&output), vec![".", "--port", "3001"]);
  Ok(())
}

#[test]
fn test_start_view_is_not_an_app_only_for_esm_views() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_package("@scope/Widget", &[], Some("esm-view"))?;

  let output = run_monorail(&ws.path, &["start", "e"])?;
  assert!(stderr(&output).contains("package: e name: e app: true"));

  let output = run_monorail(&ws.path, &["start", "@scope/Widget"])?;
  assert!(
    stderr(&output).contains("package: @scope/Widget name: scope-widget app: false"),
    "stderr: {}",
    stderr(&output)
  );
  Ok(())
}

#[test]
fn test_start_package_is_rejected() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail_raw(&ws.path, &["start", "b"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("The package 'b' can't be started because it has type \"package\""));
  assert!(runner_args(&output).is_empty());

  let output = run_monorail_raw(&ws.path, &["start", "d"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("because it has no type"));
  Ok(())
}

#[test]
fn test_start_unknown_workspace() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail_raw(&ws.path, &["start", "ghost"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("Workspace 'ghost' not found"), "stderr: {}", err);
  Ok(())
}

#[test]
fn test_start_without_target_needs_terminal() -> Result<()> {
  let ws = TestWorkspace::new()?;

  // stdin is not a terminal under Command::output
  let output = run_monorail_raw(&ws.path, &["start"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("stdin is not a terminal"), "stderr: {}", err);
  assert!(err.contains("a, e"), "candidates are the startable workspaces: {}", err);
  Ok(())
}

#[test]
fn test_sigterm_stops_runner_before_exiting() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file(
    "monorail.toml",
    r#"[start]
program = "sh"
args = ["-c", 'echo $$ > runner.pid; exec sleep 30', "server"]
shutdown_grace_ms = 2000
"#,
  )?;

  let mut monorail = spawn_monorail(&ws.path, &["start", "a"])?;
  let runner = wait_for_pid(&ws.path.join("packages/a/runner.pid"), Duration::from_secs(10))?;

  assert!(send_signal(monorail.id(), "TERM")?);
  let status = monorail.wait()?;

  // The runner got SIGTERM from monorail and its status is passed through
  assert_eq!(status.code(), Some(143));
  assert!(!send_signal(runner, "0")?, "runner {} outlived monorail", runner);
  Ok(())
}
