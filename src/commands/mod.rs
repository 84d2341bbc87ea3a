//! CLI commands for monorail
//!
//! - **test**: Run the test runner for the selected workspaces
//! - **start**: Start the dev server of one app or view
//! - **affected**: Print the selection without running anything
//!
//! All commands accept `&WorkspaceContext` to avoid redundant workspace loads.

pub mod affected;
pub mod selection;
pub mod start;

pub use affected::{OutputFormat, run_affected};
pub use selection::SelectionOptions;
pub use start::{StartOptions, run_start};
pub use test::{TestOptions, run_test};
