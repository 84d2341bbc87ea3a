//! Workspace selection
//!
//! Combines explicit targets, the changed set and the expansion flags into the final
//! set of workspaces an operation runs on. Pure: reads the graph, never touches disk.

use super::workspace_graph::WorkspaceGraph;
use crate::core::error::RailResult;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

/// Why a workspace is part of the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InclusionReason {
  Explicit,
  Changed,
  Ancestor,
  Descendant,
  All,
}

impl fmt::Display for InclusionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::Explicit => "explicit",
      Self::Changed => "changed",
      Self::Ancestor => "ancestor",
      Self::Descendant => "descendant",
      Self::All => "all",
    };
    f.pad(label)
  }
}

/// Inputs of one selection
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionRequest<'a> {
  /// Explicit targets; take precedence over change scoping
  pub targets: &'a [String],
  /// `Some` when change-detection mode is active
  pub changed: Option<&'a BTreeSet<String>>,
  /// Add everything that depends on the base set
  pub ancestors: bool,
  /// Add everything the base set depends on
  pub descendants: bool,
}

/// Selected workspaces keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
  pub selected: BTreeMap<String, InclusionReason>,
  /// Explicit targets that name no workspace
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub unknown_targets: Vec<String>,
}

impl SelectionResult {
  pub fn is_empty(&self) -> bool {
    self.selected.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.selected.keys().map(String::as_str)
  }
}

/// Compute the selection.
///
/// 1. base = explicit targets, else the changed set in change mode, else everything
/// 2. ancestors / descendants are both expanded from the base, never from each other
///
/// The result does not depend on target order and selecting twice gives the same set.
pub fn select(graph: &WorkspaceGraph, request: SelectionRequest<'_>) -> RailResult<SelectionResult> {
  let mut unknown_targets = Vec::new();
  let base: BTreeMap<String, InclusionReason> = if !request.targets.is_empty() {
    let mut base = BTreeMap::new();
    for target in request.targets {
      if graph.contains(target) {
        base.insert(target.clone(), InclusionReason::Explicit);
      } else if !unknown_targets.contains(target) {
        unknown_targets.push(target.clone());
      }
    }
    unknown_targets.sort();
    base
  } else if let Some(changed) = request.changed {
    changed
      .iter()
      .filter(|name| graph.contains(name))
      .map(|name| (name.clone(), InclusionReason::Changed))
      .collect()
  } else {
    graph
      .workspace_members()
      .into_iter()
      .map(|name| (name, InclusionReason::All))
      .collect()
  };

  for target in &unknown_targets {
    warn!(target = %target, "no workspace named '{}', skipping", target);
  }

  let seeds: Vec<&str> = base.keys().map(String::as_str).collect();
  let mut selected = base.clone();

  if request.ancestors && !seeds.is_empty() {
    for name in graph.dependents_of_all(seeds.iter().copied())? {
      selected.entry(name).or_insert(InclusionReason::Ancestor);
    }
  }

  if request.descendants && !seeds.is_empty() {
    for name in graph.dependencies_of_all(seeds.iter().copied())? {
      selected.entry(name).or_insert(InclusionReason::Descendant);
    }
  }

  Ok(SelectionResult {
    selected,
    unknown_targets,
  })
}

/// Picks one workspace when a command needs a single target and got none.
///
/// The CLI injects an interactive prompt; tests pass closures.
pub trait TargetChooser {
  fn choose(&self, candidates: &[String]) -> RailResult<String>;
}

impl<F> TargetChooser for F
where
  F: Fn(&[String]) -> RailResult<String>,
{
  fn choose(&self, candidates: &[String]) -> RailResult<String> {
    self(candidates)
  }
}
