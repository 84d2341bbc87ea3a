use crate::core::error::{ConfigError, RailError, RailResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for monorail
/// Searched in order: monorail.toml, .monorail.toml, .config/monorail.toml
///
/// Every section is optional; a repository without a config file gets the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonorailConfig {
  #[serde(default)]
  pub workspace: WorkspaceConfig,
  #[serde(default)]
  pub changes: ChangesConfig,
  #[serde(default = "RunnerConfig::default_test")]
  pub test: RunnerConfig,
  #[serde(default = "RunnerConfig::default_start")]
  pub start: RunnerConfig,
}

/// Workspace discovery settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
  /// Directory names never descended into, on top of the built-in list
  #[serde(default)]
  pub ignore: Vec<String>,
}

/// Change detection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangesConfig {
  /// Repo-relative glob patterns. A change to any matching file marks every
  /// workspace as changed (e.g. the root package.json or the lockfile).
  #[serde(default)]
  pub global_files: Vec<String>,
}

/// External runner settings for one command
///
/// # Example
///
/// ```toml
/// [test]
/// program = "jest"
/// args = ["--passWithNoTests"]
/// workspace_arg = "{path}"
/// filter_flag = "--testPathPattern"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
  /// Executable to spawn
  pub program: String,

  /// Arguments always passed before the selection
  #[serde(default)]
  pub args: Vec<String>,

  /// Template for the per-workspace scoping argument.
  /// `{name}` expands to the package name, `{path}` to its directory
  /// relative to the runner's working directory.
  #[serde(default = "default_workspace_arg")]
  pub workspace_arg: String,

  /// Flag preceding the file filter. The filter is passed positionally when unset.
  #[serde(default)]
  pub filter_flag: Option<String>,

  /// How long to wait after asking the runner to stop before killing it
  #[serde(default = "default_shutdown_grace_ms")]
  pub shutdown_grace_ms: u64,
}

fn default_workspace_arg() -> String {
  "{path}".to_string()
}

fn default_shutdown_grace_ms() -> u64 {
  5000
}

impl RunnerConfig {
  fn default_test() -> Self {
    Self {
      program: "jest".to_string(),
      args: Vec::new(),
      workspace_arg: default_workspace_arg(),
      filter_flag: None,
      shutdown_grace_ms: default_shutdown_grace_ms(),
    }
  }

  fn default_start() -> Self {
    Self {
      program: "node".to_string(),
      args: Vec::new(),
      workspace_arg: default_workspace_arg(),
      filter_flag: None,
      shutdown_grace_ms: default_shutdown_grace_ms(),
    }
  }

  /// Validate runner configuration
  pub fn validate(&self, section: &str) -> Result<(), String> {
    if self.program.trim().is_empty() {
      return Err(format!("[{}] program must not be empty", section));
    }
    if !self.workspace_arg.contains("{name}") && !self.workspace_arg.contains("{path}") {
      return Err(format!(
        "[{}] workspace_arg '{}' must contain {{name}} or {{path}}",
        section, self.workspace_arg
      ));
    }
    Ok(())
  }
}

impl Default for MonorailConfig {
  fn default() -> Self {
    Self {
      workspace: WorkspaceConfig::default(),
      changes: ChangesConfig::default(),
      test: RunnerConfig::default_test(),
      start: RunnerConfig::default_start(),
    }
  }
}

impl MonorailConfig {
  /// Find config file in search order: monorail.toml, .monorail.toml, .config/monorail.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("monorail.toml"),
      path.join(".monorail.toml"),
      path.join(".config").join("monorail.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config for a repository root, falling back to defaults when no file exists
  pub fn load(path: &Path) -> RailResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

    Self::parse(&content, &config_path)
  }

  /// Parse and validate config file contents
  pub fn parse(content: &str, config_path: &Path) -> RailResult<Self> {
    let invalid = |reason: String| {
      RailError::Config(ConfigError::InvalidFile {
        path: config_path.to_path_buf(),
        reason,
      })
    };

    let config: MonorailConfig = toml_edit::de::from_str(content).map_err(|e| invalid(e.to_string()))?;

    config.test.validate("test").map_err(invalid)?;
    config.start.validate("start").map_err(invalid)?;
    for pattern in &config.changes.global_files {
      glob::Pattern::new(pattern).map_err(|e| invalid(format!("global_files pattern '{}': {}", pattern, e)))?;
    }

    Ok(config)
  }
}
