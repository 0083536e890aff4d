//! Builds flows from scratch.

use std::sync::Arc;

use crate::error::CoreError;
use crate::flow::Flow;
use crate::id::FlowId;
use crate::metadata::Trace;
use crate::mutable::MutableFlow;

/// Entry point for flows with no basis.
///
/// ```ignore
/// let flow = Creator::build(|f| {
///     f.set_description("lookup").call(|c| {
///         c.from(&user).to(&shop).request(req).response(res)
///     });
/// })?;
/// ```
pub struct Creator;

impl Creator {
    /// Stages a blank flow, lets `define` fill it in, and builds it.
    #[track_caller]
    pub fn build(define: impl FnOnce(&mut MutableFlow)) -> Result<Arc<Flow>, CoreError> {
        Self::build_as(FlowId::reserve(), define)
    }

    /// Like [`build`](Self::build), with an ID obtained earlier from
    /// [`FlowId::reserve`]. Other flows may already refer to that ID.
    #[track_caller]
    pub fn build_as(
        id: FlowId,
        define: impl FnOnce(&mut MutableFlow),
    ) -> Result<Arc<Flow>, CoreError> {
        let mut flow = MutableFlow::new(id, Trace::here());
        define(&mut flow);
        flow.build()
    }
}
