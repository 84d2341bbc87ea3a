//! Core engine for monorail operations
//!
//! - **config**: monorail.toml parsing and validation
//! - **context**: Unified workspace context built once in main
//! - **error**: Error types with contextual help messages
//! - **vcs**: Git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
