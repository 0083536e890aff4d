//! Core error types for testflow-core.
//!
//! Uses `thiserror` for structured, matchable variants. Every variant is a
//! deterministic authoring defect, so nothing here is ever retried; each
//! carries the flow identity, trace, field path or rendered structure needed
//! to find the offending builder call.

use thiserror::Error;

use crate::address::MessageSide;
use crate::id::FlowId;

/// Errors produced while staging and building flows.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A traversal step handed back a different call than it was given,
    /// which would silently discard the mutations made on the original.
    #[error("failed to return to origin: traversal step at {location} returned a different call")]
    FailedToReturnToOrigin { location: String },

    /// A required part of a flow was never supplied, directly or by a basis.
    #[error("incomplete flow {flow} (created at {trace}): missing {what}")]
    Incomplete {
        flow: FlowId,
        trace: String,
        what: &'static str,
    },

    /// A dependency's source field or message could not be found.
    #[error(
        "failed to resolve source '{field}' for flow '{sink}' at {trace}: not found in\n{source_structure}"
    )]
    SourceUnresolved {
        sink: String,
        trace: String,
        field: String,
        source_structure: String,
    },

    /// A dependency's sink message could not be found in the flow being built.
    #[error(
        "failed to find sink {side} for field '{field}' in flow '{sink}' at {trace}:\n{sink_structure}"
    )]
    SinkUnresolved {
        sink: String,
        trace: String,
        side: MessageSide,
        field: String,
        sink_structure: String,
    },

    /// An interaction-selecting mutation matched nothing.
    #[error("no interaction matches in flow {flow} (created at {trace})")]
    NoSuchInteraction { flow: FlowId, trace: String },

    /// The flow dependency graph contains a cycle, so no execution order
    /// exists.
    #[error("dependency cycle among flows: {path}", path = .flows.join(" -> "))]
    Cycle { flows: Vec<String> },
}
