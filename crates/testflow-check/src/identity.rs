//! Flow identities must be unique within a model.

use indexmap::IndexMap;

use testflow_model::{Model, ModelError, TagFilter};

use crate::diagnostics::Violation;

pub fn check_identities(model: &dyn Model) -> Result<Vec<Violation>, ModelError> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for flow in model.flows(&TagFilter::all())? {
        *counts.entry(flow.identity()).or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(identity, count)| Violation::DuplicateIdentity {
            model: model.title().to_string(),
            identity,
            count,
        })
        .collect())
}
