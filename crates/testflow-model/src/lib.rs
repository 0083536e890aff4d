//! Model assembly: named, queryable, composable collections of flows.
//!
//! - [`EagerModel`] is populated once, by its constructor.
//! - [`LazyModel`] builds registered [`ModelType`]s only when a tag query
//!   could need them, at most once each.
//! - [`CombineModel`] is a flat union of existing models.

pub mod combine;
pub mod eager;
pub mod error;
pub mod lazy;
pub mod listener;
pub mod model;
pub mod tags;

pub use combine::CombineModel;
pub use eager::EagerModel;
pub use error::ModelError;
pub use lazy::{Deps, LazyModel, ModelDescriptor, ModelKey, ModelType};
pub use listener::{ModelListener, TracingListener};
pub use model::{schedule, Model};
pub use tags::{TagFilter, TagSummary};
