//! Causality check for dependencies within a single flow.
//!
//! A flow's messages are transmitted in a fixed order: a request, then every
//! nested call in full, then the matching response. A self-dependency must
//! read from a message that is transmitted strictly before the one it writes.

use testflow_core::{Dependency, Flow, InteractionId, MessageSide};

use crate::diagnostics::Violation;

pub fn check_chronology(flow: &Flow) -> Vec<Violation> {
    let order = flow.interactions().chronology();
    let position = |id, side| order.iter().position(|&entry| entry == (id, side));

    let mut violations = Vec::new();
    for dependency in flow.dependencies() {
        if !dependency.is_self_dependency() {
            continue;
        }
        let Some(ends) = Endpoints::of(flow, dependency) else {
            continue;
        };
        let (Some(source_index), Some(sink_index)) = (
            position(ends.source_id, ends.source_side),
            position(ends.sink_id, ends.sink_side),
        ) else {
            continue;
        };
        if source_index < sink_index {
            continue;
        }
        let content = |id, side| {
            flow.interactions()
                .get(id)
                .map(|ntr| ntr.message(side).content())
                .unwrap_or_default()
        };
        violations.push(Violation::Chronology {
            flow: flow.identity(),
            trace: flow.meta().trace.to_string(),
            field: dependency.source().field_path().unwrap_or_default().to_string(),
            source_side: ends.source_side,
            source_index,
            sink_side: ends.sink_side,
            sink_index,
            source_content: content(ends.source_id, ends.source_side),
            sink_content: content(ends.sink_id, ends.sink_side),
        });
    }
    violations
}

/// The two messages a self-dependency connects.
struct Endpoints {
    source_id: InteractionId,
    source_side: MessageSide,
    sink_id: InteractionId,
    sink_side: MessageSide,
}

impl Endpoints {
    fn of(flow: &Flow, dependency: &Dependency) -> Option<Self> {
        let tree = flow.interactions();
        let (source, sink) = (dependency.source(), dependency.sink());
        Some(Endpoints {
            source_id: source.selector()?.select(tree)?.id(),
            source_side: source.side()?,
            sink_id: sink.selector()?.select(tree)?.id(),
            sink_side: sink.side()?,
        })
    }
}
