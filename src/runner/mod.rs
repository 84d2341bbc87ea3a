//! External runner dispatch
//!
//! A selection becomes exactly one `RunnerInvocation`, which a `Dispatcher` executes.
//! The runner's stdio is inherited and its exit code is returned unchanged.

pub mod cancel;

pub use cancel::CancellationToken;

use crate::core::config::RunnerConfig;
use crate::core::error::{RailError, RailResult};
use crate::workspace::{Registry, Workspace};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exit code reported when the run is cancelled before the runner is spawned
pub const CANCELLED_EXIT_CODE: i32 = 130;

/// One fully-expanded runner call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerInvocation {
  pub program: String,
  /// Final argument list: base args, workspace args, filter, passthrough
  pub args: Vec<String>,
  /// Selected workspace names, in selection order
  pub workspaces: Vec<String>,
  pub filter: Option<String>,
  pub passthrough: Vec<String>,
  pub cwd: PathBuf,
  pub env: BTreeMap<String, String>,
  pub shutdown_grace: Duration,
}

impl RunnerInvocation {
  /// Expand a runner configuration for the given workspaces.
  ///
  /// `{path}` in the workspace template is the workspace directory relative to `cwd`.
  pub fn build<'a, I>(
    config: &RunnerConfig,
    registry: &Registry,
    workspaces: I,
    cwd: &Path,
    filter: Option<&str>,
    passthrough: &[String],
  ) -> Self
  where
    I: IntoIterator<Item = &'a Workspace>,
  {
    let mut args = config.args.clone();
    let mut names = Vec::new();

    for ws in workspaces {
      let absolute = registry.absolute_path(ws);
      let relative = pathdiff::diff_paths(&absolute, cwd).unwrap_or(absolute);
      let path = if relative.as_os_str().is_empty() {
        ".".to_string()
      } else {
        crate::utils::path_to_slash(&relative)
      };

      args.push(config.workspace_arg.replace("{name}", &ws.name).replace("{path}", &path));
      names.push(ws.name.clone());
    }

    if let Some(pattern) = filter {
      if let Some(flag) = &config.filter_flag {
        args.push(flag.clone());
      }
      args.push(pattern.to_string());
    }

    args.extend(passthrough.iter().cloned());

    Self {
      program: config.program.clone(),
      args,
      workspaces: names,
      filter: filter.map(str::to_string),
      passthrough: passthrough.to_vec(),
      cwd: cwd.to_path_buf(),
      env: BTreeMap::new(),
      shutdown_grace: Duration::from_millis(config.shutdown_grace_ms),
    }
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  /// Shell-like rendering for dry runs and logs
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .map(quote)
      .collect::<Vec<_>>()
      .join(" ")
  }
}

fn quote(arg: &str) -> String {
  if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '$' | '\\')) {
    return arg.to_string();
  }
  format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Executes a runner invocation and reports its exit code.
pub trait Dispatcher {
  fn run(&self, invocation: &RunnerInvocation, cancel: &CancellationToken) -> RailResult<i32>;
}

/// Spawns the runner as a child process with inherited stdio.
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
  poll_interval: Duration,
}

impl Default for ProcessDispatcher {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_millis(50),
    }
  }
}

impl ProcessDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Ask the child to stop, wait out the grace period, then kill it.
  fn shutdown(&self, child: &mut Child, grace: Duration) -> RailResult<ExitStatus> {
    request_terminate(child);

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
      if let Some(status) = child.try_wait()? {
        return Ok(status);
      }
      thread::sleep(self.poll_interval);
    }

    warn!(pid = child.id(), "runner did not stop within {}ms, killing it", grace.as_millis());
    // The child may exit between the last poll and the kill
    if let Err(e) = child.kill() {
      debug!(error = %e, "kill failed");
    }
    Ok(child.wait()?)
  }
}

impl Dispatcher for ProcessDispatcher {
  fn run(&self, invocation: &RunnerInvocation, cancel: &CancellationToken) -> RailResult<i32> {
    if invocation.workspaces.is_empty() {
      return Ok(0);
    }
    if cancel.is_cancelled() {
      return Ok(CANCELLED_EXIT_CODE);
    }

    debug!(
      command = %invocation.command_line(),
      cwd = %invocation.cwd.display(),
      filter = ?invocation.filter,
      passthrough = ?invocation.passthrough,
      "spawning runner"
    );

    let mut child = Command::new(&invocation.program)
      .args(&invocation.args)
      .current_dir(&invocation.cwd)
      .envs(&invocation.env)
      .spawn()
      .map_err(|e| {
        RailError::with_help(
          format!("Failed to start runner '{}': {}", invocation.program, e),
          "Check the `program` setting in monorail.toml and that it is on PATH.",
        )
      })?;

    let status = loop {
      if let Some(status) = child.try_wait()? {
        break status;
      }
      if cancel.is_cancelled() {
        debug!(pid = child.id(), "cancellation requested, stopping runner");
        break self.shutdown(&mut child, invocation.shutdown_grace)?;
      }
      thread::sleep(self.poll_interval);
    };

    let code = exit_code_of(status);
    debug!(code, "runner finished");
    Ok(code)
  }
}

#[cfg(unix)]
fn request_terminate(child: &Child) {
  let Ok(pid) = libc::pid_t::try_from(child.id()) else {
    return;
  };
  // SAFETY: kill(2) has no memory-safety preconditions; pid is our own unreaped child.
  let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
  if rc != 0 {
    debug!(pid, error = %std::io::Error::last_os_error(), "SIGTERM failed");
  }
}

#[cfg(not(unix))]
fn request_terminate(_child: &Child) {
  // No graceful stop signal; the grace period elapses and the child is killed.
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
  use std::os::unix::process::ExitStatusExt;
  match (status.code(), status.signal()) {
    (Some(code), _) => code,
    (None, Some(signal)) => 128 + signal,
    (None, None) => 1,
  }
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
  status.code().unwrap_or(1)
}
