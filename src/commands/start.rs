//! `monorail start` - Run the dev server of one app or view
//!
//! The `[start]` runner is spawned in the workspace directory and runs until it exits
//! or monorail is interrupted or terminated.

use crate::core::context::WorkspaceContext;
use crate::core::error::{RailError, RailResult, WorkspaceError};
use crate::graph::TargetChooser;
use crate::runner::{CancellationToken, Dispatcher, RunnerInvocation};
use crate::utils::param_case;
use crate::workspace::{Workspace, WorkspaceKind};

/// Options for `monorail start`
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
  /// Workspace to start; asked for interactively when absent
  pub target: Option<String>,
  pub dry_run: bool,
  pub passthrough: Vec<String>,
}

/// Run the start command, returning the runner's exit code
pub fn run_start(
  ctx: &WorkspaceContext,
  opts: &StartOptions,
  chooser: &dyn TargetChooser,
  dispatcher: &dyn Dispatcher,
  cancel: &CancellationToken,
) -> RailResult<i32> {
  let target = match &opts.target {
    Some(target) => target.clone(),
    None => {
      let candidates: Vec<String> = ctx
        .registry
        .iter()
        .filter(|ws| ws.kind.as_ref().is_some_and(WorkspaceKind::is_startable))
        .map(|ws| ws.name.clone())
        .collect();
      if candidates.is_empty() {
        return Err(RailError::with_help(
          "No startable workspaces found",
          "Only workspaces with \"modular\": { \"type\": \"app\" | \"esm-view\" | \"view\" } can be started.",
        ));
      }
      chooser.choose(&candidates)?
    }
  };

  let ws = startable_workspace(ctx, &target)?;
  let cwd = ctx.registry.absolute_path(ws);
  let is_app = ws.kind != Some(WorkspaceKind::EsmView);

  let invocation = RunnerInvocation::build(
    &ctx.config.start,
    &ctx.registry,
    Some(ws),
    &cwd,
    None,
    &opts.passthrough,
  )
  .with_env("MONORAIL_ROOT", ctx.root.display().to_string())
  .with_env("MONORAIL_PACKAGE", ws.name.clone())
  .with_env("MONORAIL_PACKAGE_NAME", param_case(&ws.name))
  .with_env("MONORAIL_IS_APP", is_app.to_string());

  let kind = ws.kind.as_ref().map(WorkspaceKind::as_str).unwrap_or_default();
  println!("🚀 Starting {} ({})", ws.name, kind);

  if opts.dry_run {
    println!("DRY RUN: Would execute in {}:", invocation.cwd.display());
    for (key, value) in &invocation.env {
      println!("  {}={}", key, value);
    }
    println!("  {}", invocation.command_line());
    return Ok(0);
  }

  dispatcher.run(&invocation, cancel)
}

/// Look up `name` and check that it can be started.
fn startable_workspace<'a>(ctx: &'a WorkspaceContext, name: &str) -> RailResult<&'a Workspace> {
  let ws = ctx.registry.get(name).ok_or_else(|| WorkspaceError::Unknown {
    name: name.to_string(),
    available: ctx.registry.names(),
  })?;

  match &ws.kind {
    Some(kind) if kind.is_startable() => Ok(ws),
    kind => Err(
      WorkspaceError::NotStartable {
        name: ws.name.clone(),
        kind: kind.as_ref().map(|k| k.as_str().to_string()),
      }
      .into(),
    ),
  }
}
