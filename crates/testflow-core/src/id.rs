//! Stable ID newtypes for flows and interactions.
//!
//! Both IDs are distinct newtype wrappers, so a `FlowId` cannot be used where
//! an `InteractionId` is expected.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_FLOW_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique flow identity.
///
/// Allocated when a flow is staged. A flow can be referenced before it is
/// built by reserving its ID up front and building it later with that ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub u64);

impl FlowId {
    /// Reserves a fresh flow ID.
    pub fn reserve() -> Self {
        FlowId(NEXT_FLOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Position of an interaction inside its flow's call tree. The root is
/// always `InteractionId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteractionId(pub u32);

impl InteractionId {
    pub const ROOT: InteractionId = InteractionId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_flow_ids_are_distinct() {
        let a = FlowId::reserve();
        let b = FlowId::reserve();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn flow_id_display() {
        assert_eq!(format!("{}", FlowId(7)), "7");
    }

    #[test]
    fn interaction_root_is_zero() {
        assert_eq!(InteractionId::ROOT, InteractionId(0));
        assert_eq!(InteractionId::ROOT.index(), 0);
    }

    #[test]
    fn serde_roundtrip() {
        let id = FlowId(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: FlowId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
