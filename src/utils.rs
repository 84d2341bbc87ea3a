//! Utility functions for cross-platform path handling and naming

use std::path::{Path, PathBuf};

/// Convert a path to forward-slash form
///
/// Git prints and expects paths with forward slashes, even on Windows, and the
/// workspace globs in package.json are written the same way.
pub fn path_to_slash(path: &Path) -> String {
  // On Windows, convert backslashes to forward slashes
  // On Unix, this is a no-op since paths already use forward slashes
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Find the monorepo root by walking up from `start`.
///
/// The root is the nearest directory holding a monorail config file or a package.json
/// with a `workspaces` field. Falls back to `start` itself.
pub fn find_repo_root(start: &Path) -> PathBuf {
  for dir in start.ancestors() {
    if crate::core::config::MonorailConfig::find_config_path(dir).is_some() {
      return dir.to_path_buf();
    }

    let manifest = dir.join("package.json");
    if let Ok(content) = std::fs::read_to_string(&manifest)
      && let Ok(value) = serde_json::from_str::<serde_json::Value>(&content)
      && value.get("workspaces").is_some()
    {
      return dir.to_path_buf();
    }
  }

  start.to_path_buf()
}

/// Lower-case, hyphen-separated form of a package name
///
/// `@scope/MyApp` → `scope-my-app`, `HTTPServer` → `http-server`
pub fn param_case(name: &str) -> String {
  let chars: Vec<char> = name.chars().collect();
  let mut out = String::with_capacity(name.len() + 4);
  let mut prev: Option<char> = None;

  for (i, &ch) in chars.iter().enumerate() {
    if !ch.is_ascii_alphanumeric() {
      if !out.is_empty() && !out.ends_with('-') {
        out.push('-');
      }
      prev = None;
      continue;
    }

    if ch.is_ascii_uppercase()
      && let Some(p) = prev
    {
      let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
      // aB starts a word, and so does the last capital of an acronym: HTTPServer
      if p.is_ascii_lowercase() || p.is_ascii_digit() || (p.is_ascii_uppercase() && next_lower) {
        out.push('-');
      }
    }
    out.push(ch.to_ascii_lowercase());
    prev = Some(ch);
  }

  while out.ends_with('-') {
    out.pop();
  }
  out
}
