//! Flow and interaction data model for describing system behaviour as
//! request/response scenarios.
//!
//! Flows are staged through [`mutable::MutableFlow`] by a [`Creator`] or a
//! [`Deriver`], then built into immutable, shareable [`Flow`] snapshots.

pub mod actor;
pub mod address;
pub mod builder;
pub mod context;
pub mod dependency;
pub mod error;
pub mod flow;
pub mod graph;
pub mod id;
pub mod interaction;
pub mod message;
pub mod metadata;
pub mod mutable;

// Re-export commonly used types
pub use actor::Actor;
pub use address::{FieldAddress, FlowRef, InteractionSelector, MessageSide};
pub use builder::{Call, Creator, Deriver};
pub use context::{Context, Residue};
pub use dependency::{Dependency, Transform};
pub use error::CoreError;
pub use flow::Flow;
pub use graph::FlowGraph;
pub use id::{FlowId, InteractionId};
pub use interaction::{Interaction, InteractionTree};
pub use message::{Message, Text, Value};
pub use metadata::{Chain, Metadata, Trace, CHAIN_TAG_PREFIX};
pub use mutable::{MutableFlow, MutableInteraction};
