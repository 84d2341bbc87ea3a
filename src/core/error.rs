//! Error types for monorail with contextual messages and exit codes
//!
//! Every fatal condition of a run maps to one `RailError` variant. Each category
//! carries an optional help message that `print_error` shows under the error.
//! Non-fatal conditions (dependency cycles, an empty selection) are not errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for monorail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (invalid flags, config, manifests, unknown targets)
  User = 1,
  /// System error (git, I/O)
  System = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for monorail
#[derive(Debug)]
pub enum RailError {
  /// Invalid flag combinations or configuration file
  Config(ConfigError),

  /// Workspace discovery failed
  Discovery(DiscoveryError),

  /// Git operation errors
  Git(GitError),

  /// Workspace lookup errors
  Workspace(WorkspaceError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RailError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RailError::Message { message, context, help } => RailError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      RailError::Io(err) => RailError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RailError::Config(_) => ExitCode::User,
      RailError::Discovery(_) => ExitCode::User,
      RailError::Workspace(_) => ExitCode::User,
      RailError::Git(_) => ExitCode::System,
      RailError::Io(_) => ExitCode::System,
      RailError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RailError::Config(e) => e.help_message(),
      RailError::Discovery(e) => e.help_message(),
      RailError::Git(e) => e.help_message(),
      RailError::Workspace(e) => e.help_message(),
      RailError::Message { help, .. } => help.clone(),
      RailError::Io(_) => None,
    }
  }
}

impl fmt::Display for RailError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RailError::Config(e) => write!(f, "{}", e),
      RailError::Discovery(e) => write!(f, "{}", e),
      RailError::Git(e) => write!(f, "{}", e),
      RailError::Workspace(e) => write!(f, "{}", e),
      RailError::Io(e) => write!(f, "I/O error: {}", e),
      RailError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RailError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RailError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RailError {
  fn from(err: io::Error) -> Self {
    RailError::Io(err)
  }
}

impl From<String> for RailError {
  fn from(msg: String) -> Self {
    RailError::message(msg)
  }
}

impl From<&str> for RailError {
  fn from(msg: &str) -> Self {
    RailError::message(msg)
  }
}

impl From<ConfigError> for RailError {
  fn from(err: ConfigError) -> Self {
    RailError::Config(err)
  }
}

impl From<DiscoveryError> for RailError {
  fn from(err: DiscoveryError) -> Self {
    RailError::Discovery(err)
  }
}

impl From<GitError> for RailError {
  fn from(err: GitError) -> Self {
    RailError::Git(err)
  }
}

impl From<WorkspaceError> for RailError {
  fn from(err: WorkspaceError) -> Self {
    RailError::Workspace(err)
  }
}

impl From<serde_json::Error> for RailError {
  fn from(err: serde_json::Error) -> Self {
    RailError::message(format!("JSON error: {}", err))
  }
}

impl From<walkdir::Error> for RailError {
  fn from(err: walkdir::Error) -> Self {
    RailError::message(format!("Failed to walk directory: {}", err))
  }
}

impl From<std::path::StripPrefixError> for RailError {
  fn from(err: std::path::StripPrefixError) -> Self {
    RailError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
///
/// Raised before discovery, git or subprocess work starts.
#[derive(Debug)]
pub enum ConfigError {
  /// Two CLI options that cannot be combined (or one that requires another)
  InvalidFlags { message: String },

  /// monorail.toml could not be parsed or failed validation
  InvalidFile { path: PathBuf, reason: String },

  /// `--regex` (or a configured glob) does not compile
  InvalidFilter { pattern: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::InvalidFlags { .. } => Some("Run `monorail help` to see how options combine.".to_string()),
      ConfigError::InvalidFile { .. } => {
        Some("See the [test] and [start] sections in monorail.toml; `program` must be set.".to_string())
      }
      ConfigError::InvalidFilter { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::InvalidFlags { message } => write!(f, "{}", message),
      ConfigError::InvalidFile { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::InvalidFilter { pattern, reason } => {
        write!(f, "Invalid pattern '{}': {}", pattern, reason)
      }
    }
  }
}

/// Workspace discovery errors
///
/// All of these abort discovery: a missing workspace would corrupt the graph.
#[derive(Debug)]
pub enum DiscoveryError {
  /// Two manifests declare the same package name
  DuplicateWorkspace {
    name: String,
    first: PathBuf,
    second: PathBuf,
  },

  /// A manifest is not valid JSON or lacks required fields
  ManifestParse { path: PathBuf, reason: String },

  /// A `workspace:` dependency names a package that is not in the repository
  DanglingDependency { workspace: String, dependency: String },
}

impl DiscoveryError {
  fn help_message(&self) -> Option<String> {
    match self {
      DiscoveryError::DuplicateWorkspace { .. } => {
        Some("Package names must be unique across the repository. Rename one of the packages.".to_string())
      }
      DiscoveryError::ManifestParse { .. } => {
        Some("Fix the manifest, or add its directory to [workspace] ignore in monorail.toml.".to_string())
      }
      DiscoveryError::DanglingDependency { dependency, .. } => Some(format!(
        "Add a package named '{}' to the repository or stop using the workspace: protocol for it.",
        dependency
      )),
    }
  }
}

impl fmt::Display for DiscoveryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DiscoveryError::DuplicateWorkspace { name, first, second } => write!(
        f,
        "Duplicate workspace '{}' declared in {} and {}",
        name,
        first.display(),
        second.display()
      ),
      DiscoveryError::ManifestParse { path, reason } => {
        write!(f, "Failed to parse {}: {}", path.display(), reason)
      }
      DiscoveryError::DanglingDependency { workspace, dependency } => write!(
        f,
        "Workspace '{}' depends on '{}' via the workspace: protocol, but no such workspace exists",
        workspace, dependency
      ),
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed (or could not be spawned)
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Reference could not be resolved
  RefNotFound { reference: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Change detection needs a git repository. Run `git init` or check the path: {}",
        path.display()
      )),
      GitError::RefNotFound { reference } => Some(format!(
        "Fetch '{}' first (e.g. `git fetch origin`) or pass an existing branch to --compare-branch.",
        reference
      )),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::RefNotFound { reference } => {
        write!(f, "Git reference not found: {}", reference)
      }
    }
  }
}

/// Workspace lookup errors
#[derive(Debug)]
pub enum WorkspaceError {
  /// Name is not a registered workspace
  Unknown { name: String, available: Vec<String> },

  /// Workspace kind cannot be started
  NotStartable { name: String, kind: Option<String> },
}

impl WorkspaceError {
  fn help_message(&self) -> Option<String> {
    match self {
      WorkspaceError::Unknown { available, .. } if !available.is_empty() => {
        Some(format!("Available workspaces: {}", available.join(", ")))
      }
      WorkspaceError::Unknown { .. } => None,
      WorkspaceError::NotStartable { .. } => Some(
        "Only workspaces with \"modular\": { \"type\": \"app\" | \"esm-view\" | \"view\" } can be started.".to_string(),
      ),
    }
  }
}

impl fmt::Display for WorkspaceError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkspaceError::Unknown { name, .. } => write!(f, "Workspace '{}' not found", name),
      WorkspaceError::NotStartable { name, kind } => match kind {
        Some(kind) => write!(f, "The package '{}' can't be started because it has type \"{}\"", name, kind),
        None => write!(f, "The package '{}' can't be started because it has no type", name),
      },
    }
  }
}

/// Result type alias for monorail
pub type RailResult<T> = Result<T, RailError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RailError>,
{
  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RailError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
