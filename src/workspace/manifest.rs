//! package.json reading
//!
//! Only the fields the selection engine needs are deserialized; everything else in the
//! manifest is ignored.

use crate::core::error::{DiscoveryError, RailError, RailResult, ResultExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const MANIFEST_FILE: &str = "package.json";

/// package.json structure (minimal fields we care about)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub version: Option<String>,
  #[serde(default)]
  pub workspaces: Option<WorkspaceSpec>,
  #[serde(default)]
  pub modular: Option<ModularField>,
  #[serde(default)]
  pub dependencies: BTreeMap<String, String>,
  #[serde(default, rename = "devDependencies")]
  pub dev_dependencies: BTreeMap<String, String>,
  #[serde(default, rename = "peerDependencies")]
  pub peer_dependencies: BTreeMap<String, String>,
  #[serde(default, rename = "optionalDependencies")]
  pub optional_dependencies: BTreeMap<String, String>,
}

/// `"modular": { "type": "app" }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModularField {
  #[serde(default, rename = "type")]
  pub kind: Option<String>,
}

/// `workspaces` in the root manifest: either an array or `{ "packages": [...] }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkspaceSpec {
  Array(Vec<String>),
  Object {
    #[serde(default)]
    packages: Vec<String>,
  },
}

impl WorkspaceSpec {
  pub fn patterns(&self) -> &[String] {
    match self {
      WorkspaceSpec::Array(patterns) => patterns,
      WorkspaceSpec::Object { packages } => packages,
    }
  }
}

/// One entry from any of the dependency tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
  pub name: String,
  pub spec: String,
}

impl DeclaredDependency {
  /// `workspace:*`, `workspace:^1.0.0`, ... must resolve inside the repository
  pub fn is_workspace_protocol(&self) -> bool {
    self.spec.starts_with("workspace:")
  }
}

impl PackageManifest {
  /// Read and parse a manifest. Malformed JSON is a discovery error.
  pub fn load(manifest_path: &Path) -> RailResult<Self> {
    let content = std::fs::read_to_string(manifest_path)
      .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
    Self::parse(&content, manifest_path)
  }

  pub fn parse(content: &str, manifest_path: &Path) -> RailResult<Self> {
    serde_json::from_str(content).map_err(|e| {
      RailError::from(DiscoveryError::ManifestParse {
        path: manifest_path.to_path_buf(),
        reason: e.to_string(),
      })
    })
  }

  /// Workspace glob patterns declared by a root manifest
  pub fn workspace_patterns(&self) -> Option<&[String]> {
    self.workspaces.as_ref().map(WorkspaceSpec::patterns)
  }

  pub fn kind(&self) -> Option<&str> {
    self.modular.as_ref().and_then(|m| m.kind.as_deref())
  }

  /// All dependency tables merged. A name listed in several tables appears once,
  /// keeping the first spec in table order.
  pub fn declared_dependencies(&self) -> Vec<DeclaredDependency> {
    let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
    for table in [
      &self.dependencies,
      &self.dev_dependencies,
      &self.peer_dependencies,
      &self.optional_dependencies,
    ] {
      for (name, spec) in table {
        merged.entry(name.as_str()).or_insert(spec.as_str());
      }
    }

    merged
      .into_iter()
      .map(|(name, spec)| DeclaredDependency {
        name: name.to_string(),
        spec: spec.to_string(),
      })
      .collect()
  }
}
