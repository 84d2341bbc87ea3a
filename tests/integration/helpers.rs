//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Fake test runner: prints every argument it receives to stderr, one per line, and
/// exits with `$RUNNER_EXIT` (default 0).
const TEST_RUNNER: &str = r#"for arg in "$@"; do echo "arg: $arg" 1>&2; done; exit "${RUNNER_EXIT:-0}""#;

/// Fake dev server: prints the environment monorail sets up.
const START_RUNNER: &str = r#"echo "package: $MONORAIL_PACKAGE name: $MONORAIL_PACKAGE_NAME app: $MONORAIL_IS_APP" 1>&2; for arg in "$@"; do echo "arg: $arg" 1>&2; done"#;

/// A JavaScript monorepo with git history
///
/// ```text
/// a (app)  → b → d
/// e (view) → c → d
/// ```
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create the standard five-package workspace, committed on `main`
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    // Initialize git repo with main as default branch
    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;

    let ws = Self { _root: root, path };

    ws.write_file(
      "package.json",
      r#"{
  "name": "fixture-root",
  "private": true,
  "workspaces": ["packages/*"]
}
"#,
    )?;
    ws.write_file(".gitignore", "node_modules/\n")?;
    ws.write_file("yarn.lock", "# lockfile\n")?;
    ws.write_file(
      "monorail.toml",
      &format!(
        r#"[changes]
global_files = ["yarn.lock"]

[test]
program = "sh"
args = ["-c", '{}', "runner"]
workspace_arg = "{{path}}"
filter_flag = "--testPathPattern"

[start]
program = "sh"
args = ["-c", '{}', "server"]
workspace_arg = "{{path}}"
shutdown_grace_ms = 500
"#,
        TEST_RUNNER, START_RUNNER
      ),
    )?;

    ws.add_package("a", &["b"], Some("app"))?;
    ws.add_package("b", &["d"], Some("package"))?;
    ws.add_package("c", &["d"], Some("package"))?;
    ws.add_package("d", &[], None)?;
    ws.add_package("e", &["c"], Some("view"))?;
    ws.write_file("packages/a/src/__tests__/a-nested.test.ts", "test('nested', () => {});\n")?;

    ws.commit("Initial workspace setup")?;
    Ok(ws)
  }

  /// Add a package under packages/ with `workspace:*` dependencies
  ///
  /// `@scope/name` lands in `packages/scope-name`.
  pub fn add_package(&self, name: &str, deps: &[&str], kind: Option<&str>) -> Result<PathBuf> {
    let dependencies: Vec<String> = deps.iter().map(|d| format!(r#""{}": "workspace:*""#, d)).collect();
    let modular = kind
      .map(|k| format!(r#", "modular": {{ "type": "{}" }}"#, k))
      .unwrap_or_default();

    let rel = format!("packages/{}", name.trim_start_matches('@').replace('/', "-"));
    self.write_file(
      &format!("{}/package.json", rel),
      &format!(
        r#"{{ "name": "{}", "version": "1.0.0", "dependencies": {{ {} }}{} }}"#,
        name,
        dependencies.join(", "),
        modular
      ),
    )?;
    self.write_file(&format!("{}/src/index.ts", rel), "export const value = 1;\n")?;

    Ok(self.path.join(rel))
  }

  /// Write a file relative to the workspace root, creating parent directories
  pub fn write_file(&self, rel: &str, content: &str) -> Result<()> {
    let file = self.path.join(rel);
    if let Some(parent) = file.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file, content).with_context(|| format!("Failed to write {}", file.display()))?;
    Ok(())
  }

  /// Modify a source file in a package (left uncommitted)
  pub fn touch_package(&self, name: &str) -> Result<()> {
    self.write_file(
      &format!("packages/{}/src/index.ts", name),
      "export const value = 2;\n",
    )
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;

    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run monorail and fail unless it exits successfully
pub fn run_monorail(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_monorail_raw(cwd, args, &[])?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "monorail command failed: monorail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run monorail with extra environment, whatever its exit status
pub fn run_monorail_raw(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
  let monorail_bin = env!("CARGO_BIN_EXE_monorail");

  Command::new(monorail_bin)
    .current_dir(cwd)
    .args(args)
    .envs(env.iter().copied())
    .env_remove("MONORAIL_LOG")
    .output()
    .context("Failed to run monorail")
}

/// Start monorail in the background with its output discarded
pub fn spawn_monorail(cwd: &Path, args: &[&str]) -> Result<Child> {
  Command::new(env!("CARGO_BIN_EXE_monorail"))
    .current_dir(cwd)
    .args(args)
    .env_remove("MONORAIL_LOG")
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .context("Failed to spawn monorail")
}

/// Wait until a script has written its pid to `file`
pub fn wait_for_pid(file: &Path, timeout: Duration) -> Result<u32> {
  let deadline = Instant::now() + timeout;
  loop {
    if let Ok(pid) = std::fs::read_to_string(file).unwrap_or_default().trim().parse() {
      return Ok(pid);
    }
    if Instant::now() >= deadline {
      anyhow::bail!("Timed out waiting for {}", file.display());
    }
    std::thread::sleep(Duration::from_millis(50));
  }
}

/// Send a signal with kill(1); `sig` is e.g. "TERM", or "0" to probe liveness
pub fn send_signal(pid: u32, sig: &str) -> Result<bool> {
  let status = Command::new("kill")
    .arg(format!("-{}", sig))
    .arg(pid.to_string())
    .stderr(Stdio::null())
    .status()
    .context("Failed to run kill")?;
  Ok(status.success())
}

/// Arguments the fake runner received, in order
pub fn runner_args(output: &Output) -> Vec<String> {
  String::from_utf8_lossy(&output.stderr)
    .lines()
    .filter_map(|line| line.strip_prefix("arg: "))
    .map(String::from)
    .collect()
}

/// Workspace directories the fake runner received
pub fn runner_packages(output: &Output) -> Vec<String> {
  runner_args(output)
    .into_iter()
    .filter_map(|arg| arg.strip_prefix("packages/").map(String::from))
    .collect()
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
