//! Action graph with ordering and notification edges.
//!
//! Two edge kinds connect actions:
//!
//! - `Before`: the source runs (or is skipped) before the target.
//! - `Notify`: `Before`, plus a successful change at the source triggers
//!   the target.
//!
//! Execution order is a topological walk that breaks ties by insertion
//! order, so equal graphs always produce equal traces.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::action::Action;
use super::PlanError;

/// Kind of edge between two actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
  Before,
  Notify,
}

/// Directed graph of the actions in one pass.
#[derive(Debug, Default)]
pub struct ActionGraph {
  graph: DiGraph<Action, Edge>,
}

impl ActionGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, action: Action) -> NodeIndex {
    self.graph.add_node(action)
  }

  /// Order `first` before `then`.
  pub fn before(&mut self, first: NodeIndex, then: NodeIndex) {
    self.graph.update_edge(first, then, Edge::Before);
  }

  /// Order `source` before `target` and trigger `target` when `source` changes.
  pub fn notify(&mut self, source: NodeIndex, target: NodeIndex) {
    // An existing ordering edge is upgraded.
    self.graph.update_edge(source, target, Edge::Notify);
  }

  pub fn action(&self, idx: NodeIndex) -> &Action {
    &self.graph[idx]
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Actions that `idx` triggers on change.
  pub fn notify_targets(&self, idx: NodeIndex) -> Vec<NodeIndex> {
    self
      .graph
      .edges_directed(idx, Direction::Outgoing)
      .filter(|e| *e.weight() == Edge::Notify)
      .map(|e| e.target())
      .collect()
  }

  /// Actions that must come before `idx`.
  pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
    self.graph.neighbors_directed(idx, Direction::Incoming).collect()
  }

  /// Deterministic topological order.
  pub fn execution_order(&self) -> Result<Vec<NodeIndex>, PlanError> {
    let mut in_degree: Vec<usize> = self
      .graph
      .node_indices()
      .map(|idx| self.graph.neighbors_directed(idx, Direction::Incoming).count())
      .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
      .iter()
      .enumerate()
      .filter(|(_, degree)| **degree == 0)
      .map(|(i, _)| Reverse(i))
      .collect();

    let mut order = Vec::with_capacity(self.graph.node_count());
    while let Some(Reverse(i)) = ready.pop() {
      let idx = NodeIndex::new(i);
      order.push(idx);
      for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
        let degree = &mut in_degree[next.index()];
        *degree -= 1;
        if *degree == 0 {
          ready.push(Reverse(next.index()));
        }
      }
    }

    if order.len() != self.graph.node_count() {
      return Err(PlanError::CycleDetected);
    }
    Ok(order)
  }
}
