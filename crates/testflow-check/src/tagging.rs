//! Declared tag summaries versus the tags flows actually carry.

use std::collections::HashSet;
use std::sync::Arc;

use testflow_model::{Model, ModelError, TagFilter, TagSummary};

use crate::diagnostics::Violation;

/// Compares the declared summary of `model` and of every submodel below it
/// with the true union and intersection of their flows' tags.
///
/// Lazy submodels are only seen once built, so query the model first if
/// everything should be covered.
pub fn check_tagging(model: &dyn Model) -> Result<Vec<Violation>, ModelError> {
    let mut violations = Vec::new();
    check_one(model, &mut violations)?;

    let mut seen = HashSet::new();
    let mut pending: Vec<Arc<dyn Model>> = model.subs();
    while let Some(sub) = pending.pop() {
        if !seen.insert(Arc::as_ptr(&sub) as *const () as usize) {
            continue;
        }
        check_one(sub.as_ref(), &mut violations)?;
        pending.extend(sub.subs());
    }
    Ok(violations)
}

fn check_one(model: &dyn Model, violations: &mut Vec<Violation>) -> Result<(), ModelError> {
    let flows = model.flows(&TagFilter::all())?;
    let actual = TagSummary::of_flows(flows.iter().map(|f| f.as_ref()));
    if &actual != model.tags() {
        violations.push(Violation::TagSummary {
            model: model.title().to_string(),
            declared: model.tags().clone(),
            actual,
        });
    }
    Ok(())
}
