//! System git backend
//!
//! Every call goes through `git_cmd()`, which runs the system `git` binary with an
//! isolated environment. Path listings use `-z` so unusual file names survive intact.

use crate::core::error::{GitError, RailError, RailResult};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Git backend using system git
pub struct SystemGit {
  /// Directory git commands run in
  pub(crate) repo_path: PathBuf,

  /// Working tree root (`git rev-parse --show-toplevel`), canonicalized
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> RailResult<Self> {
    let output = isolated_command(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .map_err(|e| spawn_failed("git rev-parse --show-toplevel", e))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(RailError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(RailError::Git(GitError::CommandFailed {
        command: "git rev-parse --show-toplevel".to_string(),
        stderr: stderr.trim().to_string(),
      }));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = PathBuf::from(stdout.trim());
    let work_tree = work_tree.canonicalize().unwrap_or(work_tree);

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree,
    })
  }

  /// Working tree root. Paths reported by git are relative to it.
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Whether the repository has at least one commit
  pub fn has_head(&self) -> bool {
    self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", "HEAD"])
      .output()
      .map(|out| out.status.success())
      .unwrap_or(false)
  }

  /// Resolve a reference to a commit SHA
  pub fn resolve_commit(&self, reference: &str) -> RailResult<String> {
    let spec = format!("{}^{{commit}}", reference);
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &spec])
      .output()
      .map_err(|e| spawn_failed("git rev-parse --verify", e))?;

    if !output.status.success() {
      return Err(RailError::Git(GitError::RefNotFound {
        reference: reference.to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Best common ancestor of `reference` and HEAD
  pub fn merge_base(&self, reference: &str) -> RailResult<String> {
    let commit = self.resolve_commit(reference)?;
    let stdout = self.run(&["merge-base", &commit, "HEAD"])?;
    let sha = String::from_utf8_lossy(&stdout).trim().to_string();
    debug!(reference, merge_base = %sha, "resolved baseline");
    Ok(sha)
  }

  /// Files changed between `base` and HEAD (committed changes only)
  ///
  /// Renames are reported as a delete plus an add, so both sides show up.
  pub fn changed_files_since(&self, base: &str) -> RailResult<Vec<PathBuf>> {
    let stdout = self.run(&["diff", "--name-only", "--no-renames", "-z", base, "HEAD"])?;
    Ok(split_paths(&stdout))
  }

  /// Uncommitted changes: tracked files differing from HEAD (staged or not) plus
  /// untracked, non-ignored files.
  ///
  /// In a repository without commits every tracked file counts as changed.
  pub fn working_tree_changes(&self) -> RailResult<Vec<PathBuf>> {
    let mut files = if self.has_head() {
      split_paths(&self.run(&["diff", "--name-only", "--no-renames", "-z", "HEAD"])?)
    } else {
      split_paths(&self.run(&["ls-files", "--full-name", "-z"])?)
    };

    files.extend(self.untracked_files()?);
    files.sort();
    files.dedup();
    Ok(files)
  }

  /// Untracked files not excluded by .gitignore, relative to the working tree root
  pub fn untracked_files(&self) -> RailResult<Vec<PathBuf>> {
    let stdout = self.run(&["ls-files", "--others", "--exclude-standard", "--full-name", "-z"])?;
    Ok(split_paths(&stdout))
  }

  /// Run a git command and return its stdout, mapping failure to `GitError::CommandFailed`
  fn run(&self, args: &[&str]) -> RailResult<Vec<u8>> {
    let command = format!("git {}", args.join(" "));
    debug!(%command, "running git");

    let output = self
      .git_cmd()
      .args(args)
      .output()
      .map_err(|e| spawn_failed(&command, e))?;

    if !output.status.success() {
      return Err(RailError::Git(GitError::CommandFailed {
        command,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    Ok(output.stdout)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    isolated_command(&self.repo_path)
  }
}

fn isolated_command(repo_path: &Path) -> Command {
  let mut cmd = Command::new("git");

  cmd.arg("-C").arg(repo_path);

  // Isolated environment (don't trust global config)
  cmd.env_clear();
  if let Ok(path) = std::env::var("PATH") {
    cmd.env("PATH", path);
  }
  if let Ok(home) = std::env::var("HOME") {
    cmd.env("HOME", home);
  }

  cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

  cmd
}

/// git itself could not be run (not installed, not on PATH)
fn spawn_failed(command: &str, err: std::io::Error) -> RailError {
  RailError::Git(GitError::CommandFailed {
    command: command.to_string(),
    stderr: format!("failed to spawn git: {}", err),
  })
}

/// Split NUL-separated git output into paths
fn split_paths(stdout: &[u8]) -> Vec<PathBuf> {
  stdout
    .split(|b| *b == 0)
    .filter(|chunk| !chunk.is_empty())
    .map(|chunk| PathBuf::from(String::from_utf8_lossy(chunk).into_owned()))
    .collect()
}
