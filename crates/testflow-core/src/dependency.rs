//! Dependencies between flows.
//!
//! A [`Dependency`] says "copy this (transformed) value from the source field
//! to the sink field". It also orders execution: the sink's flow runs no
//! earlier than the source's, even when no field is named at all.
//!
//! The value copy happens once, when the owning flow is built. It is a
//! snapshot, never a live binding.

use std::fmt;
use std::sync::Arc;

use crate::address::{FieldAddress, FlowRef};
use crate::flow::Flow;
use crate::id::FlowId;
use crate::message::Value;

/// Value transform applied between source and sink.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct Dependency {
    source: FieldAddress,
    sink: FieldAddress,
    transform: Transform,
}

impl Dependency {
    /// Copies the source value unchanged.
    pub fn new(source: FieldAddress, sink: FieldAddress) -> Self {
        Dependency {
            source,
            sink,
            transform: Arc::new(|v| v),
        }
    }

    /// A pure ordering constraint on `flow`: no fields are copied.
    pub fn prerequisite(flow: impl Into<FlowRef>) -> Self {
        Self::new(FieldAddress::new().in_flow(flow), FieldAddress::new())
    }

    pub fn transform(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Arc::new(f);
        self
    }

    pub fn source(&self) -> &FieldAddress {
        &self.source
    }

    pub fn sink(&self) -> &FieldAddress {
        &self.sink
    }

    pub fn apply(&self, value: Value) -> Value {
        (self.transform)(value)
    }

    pub fn source_flow(&self) -> Option<FlowId> {
        self.source.flow_id()
    }

    pub fn sink_flow(&self) -> Option<FlowId> {
        self.sink.flow_id()
    }

    /// True when the source lies in the same flow as the sink: either the
    /// source names no flow, or it names the sink's flow.
    pub fn is_self_dependency(&self) -> bool {
        match self.source.flow_id() {
            None => true,
            Some(source) => self.sink.flow_id() == Some(source),
        }
    }

    /// Pins the sink to the flow this dependency is attached to.
    pub(crate) fn attach(mut self, owner: FlowId) -> Self {
        if self.sink.flow_ref().is_none() {
            self.sink = self.sink.retarget(Some(FlowRef::Declared(owner)));
        }
        self
    }

    /// Same addresses and transform, with both endpoints moved: the source
    /// to `source`, the sink to whichever flow it is attached to next.
    pub(crate) fn retarget(&self, source: &Arc<Flow>) -> Self {
        Dependency {
            source: self.source.clone().retarget(Some(FlowRef::from(source))),
            sink: self.sink.clone().retarget(None),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("source", &self.source)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.source, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_transform_by_default() {
        let dep = Dependency::new(FieldAddress::new(), FieldAddress::new());
        assert_eq!(dep.apply(json!("x")), json!("x"));
    }

    #[test]
    fn custom_transform() {
        let dep = Dependency::new(FieldAddress::new(), FieldAddress::new())
            .transform(|v| json!(format!("{}!", v.as_str().unwrap_or_default())));
        assert_eq!(dep.apply(json!("hi")), json!("hi!"));
    }

    #[test]
    fn prerequisite_has_no_field() {
        let id = FlowId::reserve();
        let dep = Dependency::prerequisite(id);
        assert_eq!(dep.source_flow(), Some(id));
        assert!(!dep.source().is_complete());
        assert!(dep.sink().flow_ref().is_none());
    }

    #[test]
    fn self_dependency_detection() {
        let owner = FlowId::reserve();
        let other = FlowId::reserve();

        let local = Dependency::new(FieldAddress::new(), FieldAddress::new()).attach(owner);
        assert!(local.is_self_dependency());
        assert_eq!(local.sink_flow(), Some(owner));

        let named_self = Dependency::prerequisite(owner).attach(owner);
        assert!(named_self.is_self_dependency());

        let cross = Dependency::prerequisite(other).attach(owner);
        assert!(!cross.is_self_dependency());
    }

    #[test]
    fn attach_keeps_explicit_sink() {
        let owner = FlowId::reserve();
        let elsewhere = FlowId::reserve();
        let dep = Dependency::new(FieldAddress::new(), FieldAddress::new().in_flow(elsewhere))
            .attach(owner);
        assert_eq!(dep.sink_flow(), Some(elsewhere));
    }
}
