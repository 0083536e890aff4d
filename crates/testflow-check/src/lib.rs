//! Consistency checks over assembled models.
//!
//! Checks run after a model is built and report every problem they find as
//! a [`Violation`], rather than stopping at the first.

pub mod chronology;
pub mod config;
pub mod diagnostics;
pub mod identity;
pub mod loops;
pub mod tagging;

use testflow_core::FlowGraph;
use testflow_model::{Model, ModelError, TagFilter};

pub use chronology::check_chronology;
pub use config::CheckConfig;
pub use diagnostics::Violation;
pub use identity::check_identities;
pub use loops::find_loops;
pub use tagging::check_tagging;

/// Runs the checks enabled in `config` over every flow of `model`.
///
/// Querying the model builds any lazy submodels, so the tagging check sees
/// all of them. Errors come only from model assembly itself.
pub fn validate_model(model: &dyn Model, config: &CheckConfig) -> Result<Vec<Violation>, ModelError> {
    let flows = model.flows(&TagFilter::all())?;
    let mut violations = Vec::new();

    if config.loops {
        violations.extend(find_loops(&FlowGraph::new(&flows)));
    }
    if config.chronology {
        for flow in &flows {
            violations.extend(check_chronology(flow));
        }
    }
    if config.tagging {
        violations.extend(check_tagging(model)?);
    }
    if config.identity {
        violations.extend(check_identities(model)?);
    }

    tracing::debug!(
        model = model.title(),
        flows = flows.len(),
        violations = violations.len(),
        "validated model"
    );
    Ok(violations)
}
