//! Context and residue boundaries.
//!
//! A [`Context`] describes an environmental precondition of a flow, a
//! [`Residue`] a post-condition. Both are keyed by [`name`](Context::name):
//! a flow holds at most one of each name, and a derived flow inherits its
//! basis's entries through [`child`](Context::child) copies.

use std::any::Any;
use std::fmt;

/// Environmental precondition of a flow.
pub trait Context: fmt::Debug + Send + Sync + 'static {
    /// Kind discriminator; at most one context per name is stored.
    fn name(&self) -> &str;

    /// An independent copy, used when a derived flow inherits this context.
    fn child(&self) -> Box<dyn Context>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Post-condition left in the system after a flow has run.
pub trait Residue: fmt::Debug + Send + Sync + 'static {
    /// Kind discriminator; at most one residue per name is stored.
    fn name(&self) -> &str;

    /// An independent copy, used when a derived flow inherits this residue.
    fn child(&self) -> Box<dyn Residue>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
