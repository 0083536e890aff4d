//! Error types for model assembly.
//!
//! Every variant is a usage error made while wiring models together. They are
//! deterministic, so nothing is retried.

use thiserror::Error;

use testflow_core::CoreError;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A model was queried before its members were populated.
    #[error("model '{model}' was queried before it was populated")]
    NotPopulated { model: String },

    /// A model's members were populated a second time.
    #[error("model '{model}' is already populated")]
    AlreadyPopulated { model: String },

    /// A registered type needs a type that was not registered before it.
    #[error("cannot register '{model}': its dependency '{dependency}' is not registered")]
    UnregisteredDependency {
        model: &'static str,
        dependency: &'static str,
    },

    #[error("model type '{model}' is already registered")]
    DuplicateRegistration { model: &'static str },

    /// A model type was requested from a registry that does not know it.
    #[error("model type '{model}' is not registered")]
    NotRegistered { model: &'static str },

    /// A constructor asked for an instance it did not declare as a
    /// dependency.
    #[error("'{model}' did not declare a dependency on '{dependency}'")]
    MissingDependency {
        model: &'static str,
        dependency: &'static str,
    },

    /// A constructor panicked while holding the build lock for its type.
    #[error("build lock for model type '{model}' is poisoned")]
    Poisoned { model: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}
