//! `monorail affected` - Show which workspaces a selection covers
//!
//! Same selection flags as `monorail test`, but nothing is run. Useful in CI to decide
//! which jobs to schedule, and to debug why a workspace was (or was not) selected.

use super::selection::{Selection, SelectionOptions};
use crate::core::context::WorkspaceContext;
use crate::core::error::{RailError, RailResult};
use crate::graph::InclusionReason;
use serde_json::json;

/// Output format for affected command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Text,
  Json,
  NamesOnly,
}

impl OutputFormat {
  pub fn parse(s: &str) -> RailResult<Self> {
    match s.to_lowercase().as_str() {
      "text" => Ok(Self::Text),
      "json" => Ok(Self::Json),
      "names" | "names-only" => Ok(Self::NamesOnly),
      _ => Err(RailError::message(format!(
        "Unknown format '{}'. Valid formats: text, json, names-only",
        s
      ))),
    }
  }
}

/// Run the affected command
pub fn run_affected(ctx: &WorkspaceContext, opts: &SelectionOptions, format: OutputFormat) -> RailResult<()> {
  let selection = opts.resolve(ctx)?;
  let ordered = ordered_selection(ctx, &selection);

  match format {
    OutputFormat::Text => display_text(ctx, &selection, &ordered),
    OutputFormat::Json => display_json(ctx, &selection, &ordered)?,
    OutputFormat::NamesOnly => {
      for (name, _) in &ordered {
        println!("{}", name);
      }
    }
  }

  Ok(())
}

/// Selected workspaces, dependencies first. Falls back to name order when the graph
/// has a cycle.
fn ordered_selection<'a>(ctx: &WorkspaceContext, selection: &'a Selection) -> Vec<(&'a str, InclusionReason)> {
  let selected = &selection.result.selected;
  match ctx.graph.topological_order() {
    Ok(order) => order
      .iter()
      .filter_map(|name| selected.get_key_value(name.as_str()))
      .map(|(name, reason)| (name.as_str(), *reason))
      .collect(),
    Err(_) => selected.iter().map(|(name, reason)| (name.as_str(), *reason)).collect(),
  }
}

/// Display results in human-readable text format
fn display_text(ctx: &WorkspaceContext, selection: &Selection, ordered: &[(&str, InclusionReason)]) {
  println!("Affected Analysis");
  println!("=================");
  println!();

  if let Some(changes) = &selection.changes {
    println!("Changed files: {}", changes.files.len());
    if changes.files.len() <= 20 {
      for file in &changes.files {
        println!("  {}", file.display());
      }
    }
    let unowned = changes.unowned_files(&ctx.registry).count();
    if unowned > 0 {
      println!("  ({} file(s) outside any workspace)", unowned);
    }
    if let Some(trigger) = &changes.global_trigger {
      println!("  ⚠️  {} is a global file: every workspace is affected", trigger.display());
    }
    println!();
  }

  if ordered.is_empty() {
    println!("{}", super::test::EMPTY_SELECTION);
    return;
  }

  println!("Selected: {} workspace(s)", ordered.len());
  for (name, reason) in ordered {
    let path = ctx
      .registry
      .get(name)
      .map(|ws| crate::utils::path_to_slash(&ws.path))
      .unwrap_or_default();
    println!("  📦 {:<30} {:<11} {}", name, reason, path);
  }

  if let Some(warning) = ctx.graph.cycle_warning() {
    println!();
    println!("⚠️  {}", warning);
  }
}

/// Display results in JSON format
fn display_json(ctx: &WorkspaceContext, selection: &Selection, ordered: &[(&str, InclusionReason)]) -> RailResult<()> {
  let mut workspaces = Vec::with_capacity(ordered.len());
  for (name, reason) in ordered {
    let ws = ctx.registry.get(name);
    workspaces.push(json!({
      "name": name,
      "path": ws.map(|ws| crate::utils::path_to_slash(&ws.path)),
      "version": ws.and_then(|ws| ws.version.as_deref()),
      "reason": reason,
      "dependencies": ctx.graph.direct_dependencies(name)?,
      "dependents": ctx.graph.direct_dependents(name)?,
    }));
  }

  let changed_files: Option<Vec<String>> = selection
    .changes
    .as_ref()
    .map(|c| c.files.iter().map(|f| crate::utils::path_to_slash(f)).collect());

  let output = json!({
    "changed_files": changed_files,
    "workspaces": workspaces,
    "unknown_targets": selection.result.unknown_targets,
    "cycles": ctx.graph.cycles(),
    "summary": {
      "selected_count": ordered.len(),
      "total_count": ctx.registry.len(),
    }
  });

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
