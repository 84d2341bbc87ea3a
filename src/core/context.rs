//! Unified workspace context - build once, pass everywhere
//!
//! # Architecture
//!
//! ```text
//! main.rs:
//!   WorkspaceContext::build() -> &WorkspaceContext
//!   |
//!   v
//! commands/test.rs, start.rs, affected.rs:
//!   fn run_*(ctx: &WorkspaceContext, ...)
//! ```
//!
//! Nothing below `main` looks up the current directory or reads global state; the
//! repository root, registry, graph and configuration all come from here.

use crate::core::config::MonorailConfig;
use crate::core::error::{RailResult, ResultExt};
use crate::core::vcs::SystemGit;
use crate::graph::workspace_graph::WorkspaceGraph;
use crate::workspace::Registry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Unified workspace context containing all shared workspace-level data.
///
/// Uses Arc for efficient sharing of graph data without expensive clones.
#[derive(Clone)]
pub struct WorkspaceContext {
  /// Repository root directory (absolute, canonical)
  pub root: PathBuf,

  /// Every discovered workspace
  pub registry: Arc<Registry>,

  /// Dependency graph (built from the registry, immutable)
  pub graph: Arc<WorkspaceGraph>,

  /// monorail.toml, or the defaults when the file is absent
  pub config: Arc<MonorailConfig>,
}

impl WorkspaceContext {
  /// Build workspace context from a root directory.
  ///
  /// Loads config, discovers workspaces and builds the graph. Any discovery error is
  /// fatal here, before a selection is computed.
  pub fn build(workspace_root: &Path) -> RailResult<Self> {
    let root = workspace_root
      .canonicalize()
      .with_context(|| format!("Failed to resolve repository root {}", workspace_root.display()))?;

    let config = MonorailConfig::load(&root)?;
    let registry = Registry::discover(&root, &config.workspace)?;
    if registry.is_empty() {
      warn!(root = %root.display(), "no workspaces found");
    }
    let graph = WorkspaceGraph::build(&registry);
    debug!(root = %root.display(), workspaces = registry.len(), "workspace context built");

    Ok(Self {
      root,
      registry: Arc::new(registry),
      graph: Arc::new(graph),
      config: Arc::new(config),
    })
  }

  /// Open the git repository holding the workspace root.
  ///
  /// Only change detection needs git, so this is not part of `build`.
  pub fn git(&self) -> RailResult<SystemGit> {
    SystemGit::open(&self.root)
  }
}
