//! Builds flows by deriving from a basis.

use std::sync::Arc;

use crate::error::CoreError;
use crate::flow::Flow;
use crate::id::FlowId;
use crate::metadata::{Chain, Trace};
use crate::mutable::MutableFlow;

/// Stages a flow that starts out as a copy of `basis`.
///
/// Execution-chain tags are dropped from the copy unless
/// [`keep_chain`](Self::keep_chain) is set: a variation of a chain member is
/// not itself a member. Dependencies are never copied; use
/// [`MutableFlow::inherit_dependencies`] for that.
#[derive(Debug)]
pub struct Deriver<'b> {
    basis: &'b Arc<Flow>,
    id: Option<FlowId>,
    keep_chain: bool,
}

impl<'b> Deriver<'b> {
    pub fn on(basis: &'b Arc<Flow>) -> Self {
        Deriver {
            basis,
            id: None,
            keep_chain: false,
        }
    }

    /// Builds the derived flow under a reserved ID.
    pub fn with_id(mut self, id: FlowId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn keep_chain(mut self) -> Self {
        self.keep_chain = true;
        self
    }

    #[track_caller]
    pub fn derive(self, define: impl FnOnce(&mut MutableFlow)) -> Result<Arc<Flow>, CoreError> {
        let id = self.id.unwrap_or_else(FlowId::reserve);
        let mut flow = MutableFlow::derive(id, Trace::here(), self.basis);
        if !self.keep_chain {
            let chain: Vec<String> = flow
                .tags()
                .into_iter()
                .filter(|t| Chain::is_chain_tag(t))
                .collect();
            if !chain.is_empty() {
                flow.remove_tags(chain);
            }
        }
        define(&mut flow);
        flow.build()
    }

    /// Shorthand for `Deriver::on(basis).derive(define)`.
    #[track_caller]
    pub fn build(
        basis: &'b Arc<Flow>,
        define: impl FnOnce(&mut MutableFlow),
    ) -> Result<Arc<Flow>, CoreError> {
        Self::on(basis).derive(define)
    }
}
