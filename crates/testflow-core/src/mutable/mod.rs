//! Mutable staging layer.
//!
//! Staging types hold an optional basis plus per-field overrides. Reads fall
//! through to the basis until a field is overridden, so deriving a flow costs
//! nothing until something is changed.

mod flow;
mod interaction;

pub use flow::MutableFlow;
pub use interaction::MutableInteraction;
