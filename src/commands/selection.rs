//! Selection flags shared by `test` and `affected`

use crate::core::context::WorkspaceContext;
use crate::core::error::{ConfigError, RailResult};
use crate::graph::changes::{self, ChangeSet};
use crate::graph::select::{self, SelectionRequest, SelectionResult};

/// Options that decide which workspaces an invocation covers
#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
  pub targets: Vec<String>,
  pub changed: bool,
  pub compare_branch: Option<String>,
  pub ancestors: bool,
  pub descendants: bool,
}

/// A resolved selection, plus the change set it was scoped by (change mode only)
#[derive(Debug, Clone)]
pub struct Selection {
  pub result: SelectionResult,
  pub changes: Option<ChangeSet>,
}

impl SelectionOptions {
  /// Flag combinations that make no sense. Checked before any discovery or git work.
  pub fn validate(&self) -> RailResult<()> {
    if self.compare_branch.is_some() && !self.changed {
      return Err(
        ConfigError::InvalidFlags {
          message: "Option --compareBranch doesn't make sense without option --changed".to_string(),
        }
        .into(),
      );
    }
    Ok(())
  }

  /// Detect changes (if asked to) and compute the selection.
  ///
  /// Explicit targets take precedence over change scoping, so git is not consulted
  /// when any are given.
  pub fn resolve(&self, ctx: &WorkspaceContext) -> RailResult<Selection> {
    self.validate()?;

    let changes = if self.changed && self.targets.is_empty() {
      let git = ctx.git()?;
      Some(changes::detect_changes(
        &git,
        &ctx.registry,
        &ctx.config.changes,
        self.compare_branch.as_deref(),
      )?)
    } else {
      None
    };

    let request = SelectionRequest {
      targets: &self.targets,
      changed: changes.as_ref().map(|c| &c.workspaces),
      ancestors: self.ancestors,
      descendants: self.descendants,
    };
    let result = select::select(&ctx.graph, request)?;

    Ok(Selection { result, changes })
  }
}
