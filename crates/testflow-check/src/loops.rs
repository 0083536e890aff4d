//! Dependency loop detection.
//!
//! Walks every flow's "depends on" edges depth-first. Each recursive step
//! receives its own copy of the path so far; meeting a flow that is already
//! on the path closes a loop. Self-dependencies are not edges here: whether
//! they point the right way is the chronology check's concern.

use std::collections::HashSet;
use std::sync::Arc;

use testflow_core::{Flow, FlowGraph, FlowId};

use crate::diagnostics::Violation;

/// Every distinct dependency loop in `graph`, each reported once whichever
/// flow the walk started from.
pub fn find_loops(graph: &FlowGraph) -> Vec<Violation> {
    let mut walk = Walk {
        graph,
        explored: HashSet::new(),
        reported: HashSet::new(),
        violations: Vec::new(),
    };
    for flow in graph.flows() {
        walk.visit(flow, Vec::new());
        walk.explored.insert(flow.id());
    }
    walk.violations
}

struct Walk<'g> {
    graph: &'g FlowGraph,
    /// Start points already walked in full. Any loop through them is known.
    explored: HashSet<FlowId>,
    reported: HashSet<Vec<FlowId>>,
    violations: Vec<Violation>,
}

impl Walk<'_> {
    fn visit(&mut self, flow: &Arc<Flow>, mut path: Vec<FlowId>) {
        if self.explored.contains(&flow.id()) {
            return;
        }
        if let Some(start) = path.iter().position(|id| *id == flow.id()) {
            self.report(&path[start..]);
            return;
        }
        path.push(flow.id());
        let graph = self.graph;
        for next in graph.depends_on(flow.id()) {
            self.visit(next, path.clone());
        }
    }

    fn report(&mut self, cycle: &[FlowId]) {
        let cycle = normalize(cycle);
        if !self.reported.insert(cycle.clone()) {
            return;
        }
        let flows: Vec<String> = cycle
            .iter()
            .filter_map(|id| self.graph.flow(*id))
            .map(|f| f.identity())
            .collect();
        tracing::debug!(flows = ?flows, "found dependency loop");
        self.violations.push(Violation::Loop { flows });
    }
}

/// Rotates `cycle` so it starts at its smallest flow ID.
fn normalize(cycle: &[FlowId]) -> Vec<FlowId> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map_or(0, |(i, _)| i);
    cycle[start..].iter().chain(&cycle[..start]).copied().collect()
}
