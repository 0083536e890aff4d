//! Flow builders.
//!
//! [`Creator`] stages a blank flow, [`Deriver`] stages one from a built
//! basis. Both hand a [`MutableFlow`](crate::mutable::MutableFlow) to a
//! definition closure and build it when the closure returns. Interaction
//! trees are described with the [`Call`] traversal.

mod call;
mod creator;
mod deriver;

pub use call::Call;
pub use creator::Creator;
pub use deriver::Deriver;
