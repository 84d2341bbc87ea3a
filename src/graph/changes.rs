//! Change detection
//!
//! Given a git baseline (or the dirty working tree), determine:
//! - Which files changed, relative to the repository root
//! - Which workspaces own those files (longest path prefix wins)
//! - Whether a global file changed, which marks every workspace

use crate::core::config::ChangesConfig;
use crate::core::error::{ConfigError, RailError, RailResult};
use crate::core::vcs::SystemGit;
use crate::workspace::Registry;
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files changed relative to a baseline, and the workspaces they map to.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
  /// Changed files, repo-relative, sorted
  pub files: Vec<PathBuf>,

  /// Workspaces owning at least one changed file (or all, see `global_trigger`)
  pub workspaces: BTreeSet<String>,

  /// First changed file matching `[changes] global_files`, if any
  pub global_trigger: Option<PathBuf>,
}

impl ChangeSet {
  /// Map changed files onto registry workspaces.
  pub fn from_files(registry: &Registry, files: Vec<PathBuf>, global_files: &[Pattern]) -> Self {
    let mut files = files;
    files.sort();
    files.dedup();

    let global_trigger = files
      .iter()
      .find(|file| matches_any(global_files, file))
      .cloned();

    let workspaces = if let Some(trigger) = &global_trigger {
      debug!(file = %trigger.display(), "global file changed, every workspace is affected");
      registry.names().into_iter().collect()
    } else {
      files
        .iter()
        .filter_map(|file| registry.owner_of(file))
        .map(|ws| ws.name.clone())
        .collect()
    };

    Self {
      files,
      workspaces,
      global_trigger,
    }
  }

  /// Changed files that belong to no workspace (root config, docs, ...)
  pub fn unowned_files<'a>(&'a self, registry: &'a Registry) -> impl Iterator<Item = &'a PathBuf> + 'a {
    self.files.iter().filter(move |file| registry.owner_of(file).is_none())
  }
}

/// Detect changed workspaces.
///
/// With a baseline: files changed between `merge-base(baseline, HEAD)` and HEAD.
/// Without: uncommitted tracked changes plus untracked files.
///
/// Any git failure is fatal.
pub fn detect_changes(
  git: &SystemGit,
  registry: &Registry,
  config: &ChangesConfig,
  baseline: Option<&str>,
) -> RailResult<ChangeSet> {
  let global_files = compile_global_files(&config.global_files)?;

  let raw = match baseline {
    Some(reference) => {
      let base = git.merge_base(reference)?;
      git.changed_files_since(&base)?
    }
    None => git.working_tree_changes()?,
  };

  let files = relative_to_root(raw, git.work_tree(), registry.root());
  debug!(
    baseline = baseline.unwrap_or("working tree"),
    files = files.len(),
    "detected changed files"
  );

  Ok(ChangeSet::from_files(registry, files, &global_files))
}

/// git reports paths relative to its toplevel. Re-base them onto the repository
/// root, dropping files outside it.
fn relative_to_root(files: Vec<PathBuf>, work_tree: &Path, root: &Path) -> Vec<PathBuf> {
  let Ok(prefix) = root.strip_prefix(work_tree) else {
    return files;
  };

  files
    .into_iter()
    .filter_map(|file| file.strip_prefix(prefix).ok().map(Path::to_path_buf))
    .collect()
}

fn compile_global_files(patterns: &[String]) -> RailResult<Vec<Pattern>> {
  patterns
    .iter()
    .map(|p| {
      Pattern::new(p).map_err(|e| {
        RailError::from(ConfigError::InvalidFilter {
          pattern: p.clone(),
          reason: e.to_string(),
        })
      })
    })
    .collect()
}

fn matches_any(patterns: &[Pattern], file: &Path) -> bool {
  let options = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
  };
  patterns.iter().any(|p| p.matches_path_with(file, options))
}
