//! Construction-progress listeners.

use crate::lazy::ModelDescriptor;
use crate::model::Model;

/// Receives progress events while a lazy model builds submodels.
///
/// Events fire only for fresh builds; cache hits are silent.
pub trait ModelListener: Send + Sync {
    /// A build of `descriptor`'s type is about to start.
    fn started(&self, descriptor: &ModelDescriptor);

    /// `model` has been built.
    fn ended(&self, model: &dyn Model);

    /// Membership of a freshly built model.
    fn count(&self, model: &dyn Model, submodels: usize, flows: usize);
}

/// Logs construction progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ModelListener for TracingListener {
    fn started(&self, descriptor: &ModelDescriptor) {
        tracing::info!(model = descriptor.name(), "building model");
    }

    fn ended(&self, model: &dyn Model) {
        tracing::info!(model = model.title(), "built model");
    }

    fn count(&self, model: &dyn Model, submodels: usize, flows: usize) {
        tracing::debug!(model = model.title(), submodels, flows, "model membership");
    }
}
