//! FlowGraph: the flow dependency graph.
//!
//! Nodes are built flows; an edge `a -> b` means some dependency makes `b`
//! run no earlier than `a`. Self-dependencies add no edge. Dependencies that
//! name a flow outside the graph by ID only (an unbuilt forward reference
//! that was never supplied) add no edge either.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::address::FlowRef;
use crate::error::CoreError;
use crate::flow::Flow;
use crate::id::FlowId;

#[derive(Debug, Clone)]
pub struct FlowGraph {
    graph: DiGraph<Arc<Flow>, (), u32>,
    index: HashMap<FlowId, NodeIndex<u32>>,
}

impl FlowGraph {
    /// Builds the graph over `flows` plus every built flow they reach through
    /// dependency sources. Node order follows first appearance.
    pub fn new<'a>(flows: impl IntoIterator<Item = &'a Arc<Flow>>) -> Self {
        let mut graph = DiGraph::default();
        let mut index = HashMap::new();
        let mut pending: Vec<Arc<Flow>> = flows.into_iter().cloned().collect();
        pending.reverse();

        while let Some(flow) = pending.pop() {
            if index.contains_key(&flow.id()) {
                continue;
            }
            let reached: Vec<Arc<Flow>> = flow
                .dependencies()
                .iter()
                .filter_map(|d| d.source().flow_ref().and_then(FlowRef::flow))
                .cloned()
                .collect();
            index.insert(flow.id(), graph.add_node(flow));
            pending.extend(reached.into_iter().rev());
        }

        let mut edges = Vec::new();
        for sink in graph.node_weights() {
            for dependency in sink.dependencies() {
                if dependency.is_self_dependency() {
                    continue;
                }
                let from = dependency.source_flow().and_then(|id| index.get(&id));
                let to = index.get(&dependency.sink_flow().unwrap_or(sink.id()));
                if let (Some(&from), Some(&to)) = (from, to) {
                    edges.push((from, to));
                }
            }
        }
        for (from, to) in edges {
            graph.update_edge(from, to, ());
        }

        FlowGraph { graph, index }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Every flow, in first-appearance order.
    pub fn flows(&self) -> impl Iterator<Item = &Arc<Flow>> {
        self.graph.node_weights()
    }

    pub fn flow(&self, id: FlowId) -> Option<&Arc<Flow>> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    /// Flows that `id` must run after, directly, in first-appearance order.
    pub fn depends_on(&self, id: FlowId) -> Vec<&Arc<Flow>> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Flows that must run after `id`, directly, in first-appearance order.
    pub fn dependents(&self, id: FlowId) -> Vec<&Arc<Flow>> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: FlowId, direction: Direction) -> Vec<&Arc<Flow>> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex<u32>> =
            self.graph.neighbors_directed(idx, direction).collect();
        found.sort();
        found.into_iter().map(|n| &self.graph[n]).collect()
    }

    /// An execution order in which every flow comes after the flows it
    /// depends on. Unconstrained flows keep their first-appearance order.
    ///
    /// Kahn's algorithm, always releasing the earliest ready flow.
    pub fn schedule(&self) -> Result<Vec<Arc<Flow>>, CoreError> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<NodeIndex<u32>> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(next) = ready.pop_first() {
            order.push(Arc::clone(&self.graph[next]));
            for target in self.graph.neighbors_directed(next, Direction::Outgoing) {
                let degree = &mut in_degree[target.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(target);
                }
            }
        }

        if order.len() != self.len() {
            return Err(CoreError::Cycle {
                flows: self.first_cycle(),
            });
        }
        tracing::debug!(flows = order.len(), "scheduled flows");
        Ok(order)
    }

    /// Identities of the flows in one strongly connected component with more
    /// than one member, in first-appearance order.
    fn first_cycle(&self) -> Vec<String> {
        let mut component = tarjan_scc(&self.graph)
            .into_iter()
            .find(|c| c.len() > 1)
            .unwrap_or_default();
        component.sort();
        component
            .into_iter()
            .map(|n| self.graph[n].identity())
            .collect()
    }
}
