//! Workspace dependency graph built from the registry + petgraph
//!
//! ## Graph Structure
//!
//! - **Directed Graph**: `A → B` means "A depends on B"
//! - **Nodes**: Workspaces, at the same index they have in the registry arena
//! - **Traversal state**: petgraph visit maps (fixed-size bitsets), one per walk
//! - **Cycles**: allowed. Every walk is bounded by its visited set; the first walk that
//!   touches a cycle records a single `CycleWarning` for the whole run.
//!
//! The graph is immutable after construction, so queries need no locking. The one-shot
//! warning lives in a `OnceLock`, which keeps the graph `Send + Sync` for `Arc` sharing.

use crate::core::error::{RailResult, WorkspaceError};
use crate::workspace::Registry;
use petgraph::Direction;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{VisitMap, Visitable};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Non-fatal notice that the dependency graph contains a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleWarning {
  /// Workspaces forming the cycle, sorted by name
  pub members: Vec<String>,
}

impl fmt::Display for CycleWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Dependency cycle detected between workspaces: {}", self.members.join(" ↔ "))
  }
}

/// Workspace dependency graph.
#[derive(Debug)]
pub struct WorkspaceGraph {
  /// Node weight: workspace name. Edge A → B: A depends on B.
  graph: DiGraph<String, ()>,

  /// Index: workspace name → node index
  name_to_node: HashMap<String, NodeIndex>,

  /// Strongly connected components that form cycles
  cycles: Vec<Vec<NodeIndex>>,

  /// Node index → position in `cycles`, if the node sits on a cycle
  cycle_of: Vec<Option<usize>>,

  /// Recorded the first time a traversal touches a cycle
  cycle_warning: OnceLock<CycleWarning>,
}

impl WorkspaceGraph {
  /// Build the graph from a registry snapshot.
  ///
  /// Node indices equal registry indices.
  pub fn build(registry: &Registry) -> Self {
    let mut graph = DiGraph::with_capacity(registry.len(), 0);
    let mut name_to_node = HashMap::with_capacity(registry.len());

    for ws in registry.iter() {
      let idx = graph.add_node(ws.name.clone());
      name_to_node.insert(ws.name.clone(), idx);
    }

    for ws in registry.iter() {
      let from = name_to_node[&ws.name];
      for dep in &ws.dependencies {
        // The registry only keeps dependencies that are registry workspaces
        if let Some(&to) = name_to_node.get(dep) {
          graph.update_edge(from, to, ());
        }
      }
    }

    let mut cycles: Vec<Vec<NodeIndex>> = algo::tarjan_scc(&graph)
      .into_iter()
      .filter(|component| component.len() > 1 || graph.contains_edge(component[0], component[0]))
      .collect();
    for component in &mut cycles {
      component.sort_by(|a, b| graph[*a].cmp(&graph[*b]));
    }

    let mut cycle_of = vec![None; graph.node_count()];
    for (i, component) in cycles.iter().enumerate() {
      for node in component {
        cycle_of[node.index()] = Some(i);
      }
    }

    Self {
      graph,
      name_to_node,
      cycles,
      cycle_of,
      cycle_warning: OnceLock::new(),
    }
  }

  /// All workspace names, sorted.
  pub fn workspace_members(&self) -> Vec<String> {
    let mut members: Vec<_> = self.graph.node_weights().cloned().collect();
    members.sort();
    members
  }

  pub fn contains(&self, name: &str) -> bool {
    self.name_to_node.contains_key(name)
  }

  /// Get direct dependencies of a workspace (what it uses).
  pub fn direct_dependencies(&self, name: &str) -> RailResult<BTreeSet<String>> {
    let node = self.find_node(name)?;
    Ok(self.neighbor_names(node, Direction::Outgoing))
  }

  /// Get direct dependents of a workspace (what uses it).
  pub fn direct_dependents(&self, name: &str) -> RailResult<BTreeSet<String>> {
    let node = self.find_node(name)?;
    Ok(self.neighbor_names(node, Direction::Incoming))
  }

  /// Ancestors: every workspace that depends on `name`, directly or transitively.
  ///
  /// Single-seed form of `dependents_of_all`.
  ///
  /// `name` itself is never part of the result, even when it sits on a cycle.
  ///
  /// # Performance
  /// O(V + E)
  #[allow(dead_code)]
  pub fn transitive_dependents(&self, name: &str) -> RailResult<BTreeSet<String>> {
    let start = self.find_node(name)?;
    Ok(self.names_of(self.walk(&[start], Direction::Incoming)))
  }

  /// Descendants: every workspace `name` depends on, directly or transitively.
  #[allow(dead_code)]
  pub fn transitive_dependencies(&self, name: &str) -> RailResult<BTreeSet<String>> {
    let start = self.find_node(name)?;
    Ok(self.names_of(self.walk(&[start], Direction::Outgoing)))
  }

  /// Union of the ancestors of every seed, in one traversal.
  ///
  /// Seeds share a single visited set, so seeds never appear in the result.
  pub fn dependents_of_all<'a, I>(&self, names: I) -> RailResult<BTreeSet<String>>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let seeds = self.find_nodes(names)?;
    Ok(self.names_of(self.walk(&seeds, Direction::Incoming)))
  }

  /// Union of the descendants of every seed, in one traversal. Seeds are excluded.
  pub fn dependencies_of_all<'a, I>(&self, names: I) -> RailResult<BTreeSet<String>>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let seeds = self.find_nodes(names)?;
    Ok(self.names_of(self.walk(&seeds, Direction::Outgoing)))
  }

  /// Dependency cycles (strongly connected components), each sorted by name.
  pub fn cycles(&self) -> Vec<Vec<String>> {
    self
      .cycles
      .iter()
      .map(|component| component.iter().map(|idx| self.graph[*idx].clone()).collect())
      .collect()
  }

  /// The cycle warning recorded during this run, if any traversal touched a cycle.
  pub fn cycle_warning(&self) -> Option<&CycleWarning> {
    self.cycle_warning.get()
  }

  /// Get topological order of workspaces: dependencies before their dependents.
  ///
  /// # Errors
  /// Returns error if the dependency graph contains cycles.
  pub fn topological_order(&self) -> RailResult<Vec<String>> {
    let topo = algo::toposort(&self.graph, None).map_err(|cycle| {
      crate::core::error::RailError::message(format!(
        "Dependency cycle detected involving workspace '{}'",
        self.graph[cycle.node_id()]
      ))
    })?;

    // toposort puts A before B for A → B; dependencies must come first
    Ok(topo.into_iter().rev().map(|idx| self.graph[idx].clone()).collect())
  }

  /// Depth-first walk from `seeds` along `direction`.
  ///
  /// Returns every node reached through at least one edge, excluding the seeds.
  fn walk(&self, seeds: &[NodeIndex], direction: Direction) -> Vec<NodeIndex> {
    let mut visited = self.graph.visit_map();
    let mut stack = Vec::with_capacity(seeds.len());
    for &seed in seeds {
      if visited.visit(seed) {
        stack.push(seed);
      }
    }

    let mut reached = Vec::new();
    while let Some(node) = stack.pop() {
      if let Some(cycle) = self.cycle_of[node.index()] {
        self.report_cycle(cycle);
      }

      for next in self.graph.neighbors_directed(node, direction) {
        if visited.visit(next) {
          reached.push(next);
          stack.push(next);
        }
      }
    }

    reached
  }

  /// Record the cycle warning once per graph (and so once per run).
  fn report_cycle(&self, cycle: usize) {
    let mut first = false;
    let warning = self.cycle_warning.get_or_init(|| {
      first = true;
      CycleWarning {
        members: self.cycles[cycle].iter().map(|idx| self.graph[*idx].clone()).collect(),
      }
    });

    if first {
      warn!(members = ?warning.members, "{}", warning);
    }
  }

  fn neighbor_names(&self, node: NodeIndex, direction: Direction) -> BTreeSet<String> {
    self
      .graph
      .neighbors_directed(node, direction)
      .map(|idx| self.graph[idx].clone())
      .collect()
  }

  fn names_of(&self, nodes: Vec<NodeIndex>) -> BTreeSet<String> {
    nodes.into_iter().map(|idx| self.graph[idx].clone()).collect()
  }

  fn find_nodes<'a, I>(&self, names: I) -> RailResult<Vec<NodeIndex>>
  where
    I: IntoIterator<Item = &'a str>,
  {
    names.into_iter().map(|name| self.find_node(name)).collect()
  }

  /// Find node index by workspace name.
  fn find_node(&self, name: &str) -> RailResult<NodeIndex> {
    self.name_to_node.get(name).copied().ok_or_else(|| {
      WorkspaceError::Unknown {
        name: name.to_string(),
        available: self.workspace_members(),
      }
      .into()
    })
  }
}
