//! Graph-aware workspace analysis
//!
//! Built on the workspace registry + petgraph. Selection is computed fresh for every
//! invocation from an immutable graph.

pub mod changes;
pub mod select;
pub mod workspace_graph;

pub use select::{InclusionReason, TargetChooser};
