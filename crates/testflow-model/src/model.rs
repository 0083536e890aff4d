//! The `Model` trait: a named, queryable, composable collection of flows.

use std::collections::HashSet;
use std::sync::Arc;

use testflow_core::{Flow, FlowGraph, FlowId};

use crate::error::ModelError;
use crate::tags::{TagFilter, TagSummary};

pub trait Model: Send + Sync {
    fn title(&self) -> &str;

    /// Declared summary of every flow reachable from this model.
    fn tags(&self) -> &TagSummary;

    /// Reachable flows matching `filter`: the model's own flows first, then
    /// each submodel's, without repeats.
    fn flows(&self, filter: &TagFilter) -> Result<Vec<Arc<Flow>>, ModelError>;

    /// Submodels that currently exist. A lazy model reports only the ones it
    /// has built so far.
    fn subs(&self) -> Vec<Arc<dyn Model>>;
}

/// Appends `more` to `flows`, skipping flows already present.
pub(crate) fn extend_unique(
    flows: &mut Vec<Arc<Flow>>,
    seen: &mut HashSet<FlowId>,
    more: impl IntoIterator<Item = Arc<Flow>>,
) {
    for flow in more {
        if seen.insert(flow.id()) {
            flows.push(flow);
        }
    }
}

/// Flows of every submodel whose declared summary admits `filter`.
pub(crate) fn sub_flows<'a>(
    subs: impl IntoIterator<Item = &'a Arc<dyn Model>>,
    filter: &TagFilter,
    flows: &mut Vec<Arc<Flow>>,
    seen: &mut HashSet<FlowId>,
) -> Result<(), ModelError> {
    for sub in subs {
        if sub.tags().compatible(filter) {
            extend_unique(flows, seen, sub.flows(filter)?);
        }
    }
    Ok(())
}

/// The flows of `model` matching `filter`, in an order where every flow
/// comes after the flows it depends on.
pub fn schedule(model: &dyn Model, filter: &TagFilter) -> Result<Vec<Arc<Flow>>, ModelError> {
    let flows = model.flows(filter)?;
    let order = FlowGraph::new(&flows).schedule()?;
    let selected: HashSet<FlowId> = flows.iter().map(|f| f.id()).collect();
    Ok(order
        .into_iter()
        .filter(|f| selected.contains(&f.id()))
        .collect())
}
