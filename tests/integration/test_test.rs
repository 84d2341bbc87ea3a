//! Integration tests for `monorail test`

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_no_flags_selects_every_workspace() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path, &["test"])?;

  assert_eq!(runner_packages(&output), vec!["a", "b", "c", "d", "e"]);
  assert!(stdout(&output).contains("Testing 5 workspace(s)"));
  Ok(())
}

#[test]
fn test_changed_without_changes_is_empty() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path, &["test", "--changed", "--ancestors"])?;

  assert!(
    stdout(&output).contains("No workspaces found in selection"),
    "stdout: {}",
    stdout(&output)
  );
  assert!(runner_args(&output).is_empty(), "runner must not be spawned");
  Ok(())
}

#[test]
fn test_changed_with_ancestors() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.touch_package("b")?;
  ws.touch_package("c")?;

  let output = run_monorail(&ws.path, &["test", "--changed", "--ancestors"])?;

  // d is a dependency of the changed packages, not a dependent
  assert_eq!(runner_packages(&output), vec!["a", "b", "c", "e"]);
  Ok(())
}

#[test]
fn test_changed_includes_untracked_files() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("packages/d/src/new-file.ts", "export {};\n")?;

  let output = run_monorail(&ws.path, &["test", "--changed"])?;

  assert_eq!(runner_packages(&output), vec!["d"]);
  Ok(())
}

#[test]
fn test_targets_with_descendants() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path, &["test", "b", "c", "--descendants"])?;

  assert_eq!(runner_packages(&output), vec!["b", "c", "d"]);
  Ok(())
}

#[test]
fn test_regex_is_forwarded_without_changing_selection() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(
    &ws.path,
    &["test", "b", "c", "--descendants", "--regex", "a-nested.test.ts"],
  )?;

  assert_eq!(runner_packages(&output), vec!["b", "c", "d"]);
  let args = runner_args(&output);
  assert_eq!(&args[args.len() - 2..], ["--testPathPattern", "a-nested.test.ts"]);
  Ok(())
}

#[test]
fn test_invalid_regex_is_config_error() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail_raw(&ws.path, &["test", "--regex", "(unclosed"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(runner_args(&output).is_empty());
  Ok(())
}

#[test]
fn test_compare_branch_requires_changed() -> Result<()> {
  // Not even a repository: the flag check comes first
  let dir = tempfile::TempDir::new()?;

  let output = run_monorail_raw(dir.path(), &["test", "--compareBranch", "main"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(
    stderr(&output).contains("Option --compareBranch doesn't make sense without option --changed"),
    "stderr: {}",
    stderr(&output)
  );
  Ok(())
}

#[test]
fn test_compare_branch_uses_merge_base() -> Result<()> {
  let ws = TestWorkspace::new()?;
  git(&ws.path, &["checkout", "-b", "feature"])?;
  ws.touch_package("d")?;
  ws.commit("Change d")?;

  let output = run_monorail(&ws.path, &["test", "--changed", "--compare-branch", "main"])?;
  assert_eq!(runner_packages(&output), vec!["d"]);

  let output = run_monorail(
    &ws.path,
    &["test", "--changed", "--compare-branch", "main", "--ancestors"],
  )?;
  assert_eq!(runner_packages(&output), vec!["a", "b", "c", "d", "e"]);
  Ok(())
}

#[test]
fn test_compare_branch_ignores_later_baseline_commits() -> Result<()> {
  let ws = TestWorkspace::new()?;
  git(&ws.path, &["checkout", "-b", "feature"])?;
  ws.touch_package("d")?;
  ws.commit("Change d")?;

  git(&ws.path, &["checkout", "main"])?;
  ws.write_file("packages/e/src/index.ts", "export const value = 3;\n")?;
  ws.commit("Change e on main")?;
  git(&ws.path, &["checkout", "feature"])?;

  let output = run_monorail(&ws.path, &["test", "--changed", "--compare-branch", "main"])?;

  // e differs between main and feature, but only on the baseline side
  assert_eq!(runner_packages(&output), vec!["d"]);
  Ok(())
}

#[test]
fn test_targets_take_precedence_over_changed() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.touch_package("d")?;

  let output = run_monorail(&ws.path, &["test", "b", "--changed"])?;

  assert_eq!(runner_packages(&output), vec!["b"]);
  Ok(())
}

#[test]
fn test_unknown_compare_branch_is_git_error() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail_raw(&ws.path, &["test", "--changed", "--compare-branch", "nope"], &[])?;

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("nope"));
  Ok(())
}

#[test]
fn test_global_file_change_selects_everything() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("yarn.lock", "# lockfile v2\n")?;

  let output = run_monorail(&ws.path, &["test", "--changed"])?;

  assert_eq!(runner_packages(&output), vec!["a", "b", "c", "d", "e"]);
  Ok(())
}

#[test]
fn test_non_existing_target_is_not_fatal() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail_raw(&ws.path, &["test", "non-existing-package"], &[])?;

  assert_eq!(output.status.code(), Some(0));
  assert!(stdout(&output).contains("No workspaces found in selection"));
  assert!(stderr(&output).contains("non-existing-package"));
  Ok(())
}

#[test]
fn test_passthrough_comes_last_in_order() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path, &["test", "a", "--", "--coverage", "-u", "--maxWorkers=2"])?;

  assert_eq!(runner_args(&output), vec!["packages/a", "--coverage", "-u", "--maxWorkers=2"]);
  Ok(())
}

#[test]
fn test_runner_exit_code_is_propagated() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail_raw(&ws.path, &["test", "d"], &[("RUNNER_EXIT", "3")])?;

  assert_eq!(output.status.code(), Some(3));
  Ok(())
}

#[test]
fn test_dry_run_does_not_spawn() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path, &["test", "b", "--dry-run"])?;

  assert!(runner_args(&output).is_empty());
  let out = stdout(&output);
  assert!(out.contains("DRY RUN"));
  assert!(out.contains("packages/b"));
  Ok(())
}

#[test]
fn test_runs_from_package_subdirectory() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_monorail(&ws.path.join("packages/c/src"), &["test", "c"])?;

  assert_eq!(runner_packages(&output), vec!["c"]);
  Ok(())
}

#[test]
fn test_duplicate_package_name_is_fatal() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write_file("packages/b-copy/package.json", r#"{ "name": "b" }"#)?;

  let output = run_monorail_raw(&ws.path, &["test"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("packages/b-copy"), "stderr: {}", err);
  assert!(runner_args(&output).is_empty());
  Ok(())
}
