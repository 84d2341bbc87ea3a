//! Workspace registry
//!
//! Discovers every package of the repository and the intra-repo dependencies each one
//! declares. The registry is an arena: workspaces are addressed by their index, which the
//! dependency graph reuses as its node index.
//!
//! Discovery is fail-fast. A duplicate name, a malformed manifest or a `workspace:`
//! dependency on a package that does not exist aborts the whole run, because a missing
//! workspace would silently drop graph edges.

pub mod manifest;

use crate::core::config::WorkspaceConfig;
use crate::core::error::{DiscoveryError, RailError, RailResult};
use glob::{MatchOptions, Pattern};
use manifest::{DeclaredDependency, MANIFEST_FILE, PackageManifest};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into during discovery
pub const DEFAULT_IGNORES: &[&str] = &[
  "node_modules",
  ".git",
  "dist",
  "build",
  "coverage",
  ".next",
  ".turbo",
  "__snapshots__",
];

/// Workspace kind from `"modular": { "type": ... }`
///
/// Only used to decide which commands apply to a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceKind {
  App,
  EsmView,
  View,
  Package,
  Source,
  Root,
  Other(String),
}

impl WorkspaceKind {
  pub fn parse(kind: &str) -> Self {
    match kind {
      "app" => Self::App,
      "esm-view" => Self::EsmView,
      "view" => Self::View,
      "package" => Self::Package,
      "source" => Self::Source,
      "root" => Self::Root,
      other => Self::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::App => "app",
      Self::EsmView => "esm-view",
      Self::View => "view",
      Self::Package => "package",
      Self::Source => "source",
      Self::Root => "root",
      Self::Other(kind) => kind,
    }
  }

  /// Kinds that have a dev server
  pub fn is_startable(&self) -> bool {
    matches!(self, Self::App | Self::EsmView | Self::View)
  }
}

impl fmt::Display for WorkspaceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One package of the monorepo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
  pub name: String,
  /// Directory of the manifest, relative to the repository root
  pub path: PathBuf,
  pub version: Option<String>,
  pub kind: Option<WorkspaceKind>,
  /// Names of other registry workspaces this one depends on
  pub dependencies: BTreeSet<String>,
}

impl Workspace {
  pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      path: path.into(),
      version: None,
      kind: None,
      dependencies: BTreeSet::new(),
    }
  }

  pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.dependencies.extend(deps.into_iter().map(Into::into));
    self
  }

  pub fn with_kind(mut self, kind: WorkspaceKind) -> Self {
    self.kind = Some(kind);
    self
  }
}

/// Snapshot of every workspace in the repository.
#[derive(Debug, Clone)]
pub struct Registry {
  root: PathBuf,
  workspaces: Vec<Workspace>,
  by_name: HashMap<String, usize>,
  by_path: HashMap<PathBuf, usize>,
}

impl Registry {
  /// Discover all workspaces under `root`.
  ///
  /// The root manifest is the repository itself and is never registered. When it
  /// declares `workspaces`, only manifests in matching directories are registered.
  pub fn discover(root: &Path, config: &WorkspaceConfig) -> RailResult<Self> {
    let root_manifest_path = root.join(MANIFEST_FILE);
    let patterns = if root_manifest_path.is_file() {
      let root_manifest = PackageManifest::load(&root_manifest_path)?;
      root_manifest
        .workspace_patterns()
        .map(|patterns| compile_patterns(patterns, &root_manifest_path))
        .transpose()?
    } else {
      None
    };

    let ignores: Vec<&str> = DEFAULT_IGNORES
      .iter()
      .copied()
      .chain(config.ignore.iter().map(String::as_str))
      .collect();

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
      .follow_links(false)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry, &ignores));

    for entry in walker {
      let entry = entry?;
      if entry.depth() < 2 || !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE {
        continue;
      }

      let manifest_path = entry.path();
      let Some(dir) = manifest_path.parent() else {
        continue;
      };
      let relative = dir.strip_prefix(root)?.to_path_buf();

      if let Some(patterns) = &patterns
        && !matches_any(patterns, &relative)
      {
        debug!(path = %relative.display(), "skipping manifest outside workspace patterns");
        continue;
      }

      let manifest = PackageManifest::load(manifest_path)?;
      found.push((relative, manifest, manifest_path.to_path_buf()));
    }

    Self::from_manifests(root, found)
  }

  /// Build a registry from parsed manifests (directory, manifest, manifest path).
  fn from_manifests(root: &Path, manifests: Vec<(PathBuf, PackageManifest, PathBuf)>) -> RailResult<Self> {
    let mut workspaces = Vec::with_capacity(manifests.len());
    let mut declared: Vec<Vec<DeclaredDependency>> = Vec::with_capacity(manifests.len());

    for (relative, manifest, manifest_path) in manifests {
      let name = match manifest.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
          return Err(
            DiscoveryError::ManifestParse {
              path: manifest_path,
              reason: "missing \"name\" field".to_string(),
            }
            .into(),
          );
        }
      };

      declared.push(manifest.declared_dependencies());
      let mut ws = Workspace::new(name, relative);
      ws.version = manifest.version.clone();
      if let Some(kind) = manifest.kind() {
        ws = ws.with_kind(WorkspaceKind::parse(kind));
      }
      workspaces.push(ws);
    }

    let names: HashMap<&str, usize> = {
      let mut names = HashMap::new();
      for (idx, ws) in workspaces.iter().enumerate() {
        if let Some(&first) = names.get(ws.name.as_str()) {
          let first: &Workspace = &workspaces[first];
          return Err(
            DiscoveryError::DuplicateWorkspace {
              name: ws.name.clone(),
              first: first.path.clone(),
              second: ws.path.clone(),
            }
            .into(),
          );
        }
        names.insert(ws.name.as_str(), idx);
      }
      names
    };

    let mut resolved = Vec::with_capacity(workspaces.len());
    for (ws, deps) in workspaces.iter().zip(&declared) {
      let mut internal = BTreeSet::new();
      for dep in deps {
        if names.contains_key(dep.name.as_str()) {
          internal.insert(dep.name.clone());
        } else if dep.is_workspace_protocol() {
          return Err(
            DiscoveryError::DanglingDependency {
              workspace: ws.name.clone(),
              dependency: dep.name.clone(),
            }
            .into(),
          );
        }
      }
      resolved.push(internal);
    }

    let workspaces = workspaces
      .into_iter()
      .zip(resolved)
      .map(|(ws, deps)| ws.with_dependencies(deps))
      .collect();

    Self::from_workspaces(root, workspaces)
  }

  /// Build a registry from already-resolved workspaces.
  ///
  /// Dependencies naming packages outside the registry are external and dropped.
  pub fn from_workspaces(root: &Path, mut workspaces: Vec<Workspace>) -> RailResult<Self> {
    workspaces.sort_by(|a, b| a.name.cmp(&b.name));

    let mut by_name = HashMap::with_capacity(workspaces.len());
    let mut by_path = HashMap::with_capacity(workspaces.len());
    for (idx, ws) in workspaces.iter().enumerate() {
      if let Some(prev) = by_name.insert(ws.name.clone(), idx) {
        return Err(
          DiscoveryError::DuplicateWorkspace {
            name: ws.name.clone(),
            first: workspaces[prev].path.clone(),
            second: ws.path.clone(),
          }
          .into(),
        );
      }
      by_path.insert(ws.path.clone(), idx);
    }

    for ws in &mut workspaces {
      ws.dependencies.retain(|dep| by_name.contains_key(dep) && *dep != ws.name);
    }

    debug!(count = workspaces.len(), root = %root.display(), "workspace registry built");

    Ok(Self {
      root: root.to_path_buf(),
      workspaces,
      by_name,
      by_path,
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn len(&self) -> usize {
    self.workspaces.len()
  }

  pub fn is_empty(&self) -> bool {
    self.workspaces.is_empty()
  }

  /// Workspaces in index (name) order
  pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
    self.workspaces.iter()
  }

  pub fn names(&self) -> Vec<String> {
    self.workspaces.iter().map(|ws| ws.name.clone()).collect()
  }

  pub fn get(&self, name: &str) -> Option<&Workspace> {
    self.index_of(name).map(|idx| &self.workspaces[idx])
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.by_name.get(name).copied()
  }

  /// Absolute directory of a workspace
  pub fn absolute_path(&self, ws: &Workspace) -> PathBuf {
    self.root.join(&ws.path)
  }

  /// Map a repo-relative file path to its owning workspace.
  ///
  /// Walks up from the file, so the deepest (longest-prefix) workspace wins when
  /// workspaces are nested.
  pub fn owner_of(&self, file: &Path) -> Option<&Workspace> {
    file
      .ancestors()
      .skip(1)
      .filter(|dir| !dir.as_os_str().is_empty())
      .find_map(|dir| self.by_path.get(dir))
      .map(|&idx| &self.workspaces[idx])
  }
}

fn is_ignored(entry: &DirEntry, ignores: &[&str]) -> bool {
  entry.file_type().is_dir() && entry.file_name().to_str().is_some_and(|name| ignores.contains(&name))
}

fn compile_patterns(patterns: &[String], manifest_path: &Path) -> RailResult<Vec<Pattern>> {
  patterns
    .iter()
    .map(|p| {
      let trimmed = p.trim_start_matches("./").trim_end_matches('/');
      Pattern::new(trimmed).map_err(|e| {
        RailError::from(DiscoveryError::ManifestParse {
          path: manifest_path.to_path_buf(),
          reason: format!("invalid workspaces pattern '{}': {}", p, e),
        })
      })
    })
    .collect()
}

fn matches_any(patterns: &[Pattern], relative: &Path) -> bool {
  let options = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
  };
  let relative = crate::utils::path_to_slash(relative);
  patterns.iter().any(|p| p.matches_with(&relative, options))
}
