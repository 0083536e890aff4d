//! Models whose membership is fixed when they are constructed.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use testflow_core::Flow;

use crate::error::ModelError;
use crate::lazy::ModelType;
use crate::model::{extend_unique, sub_flows, Model};
use crate::tags::{TagFilter, TagSummary};

#[derive(Default)]
struct Members {
    flows: Vec<Arc<Flow>>,
    subs: Vec<Arc<dyn Model>>,
}

/// A model populated exactly once, by its own constructor.
///
/// The declared tag summary is supplied up front, before any flow exists.
/// The tagging check compares it against the flows actually populated.
pub struct EagerModel {
    title: String,
    tags: TagSummary,
    members: OnceLock<Members>,
}

impl EagerModel {
    pub fn new(title: impl Into<String>, tags: TagSummary) -> Self {
        EagerModel {
            title: title.into(),
            tags,
            members: OnceLock::new(),
        }
    }

    /// An unpopulated model carrying `T`'s declared title and tags.
    pub fn of<T: ModelType>() -> Self {
        Self::new(T::title(), T::tags())
    }

    /// Sets the model's flows and submodels. Fails if already populated.
    pub fn populate(
        &self,
        flows: impl IntoIterator<Item = Arc<Flow>>,
        subs: impl IntoIterator<Item = Arc<dyn Model>>,
    ) -> Result<(), ModelError> {
        let members = Members {
            flows: flows.into_iter().collect(),
            subs: subs.into_iter().collect(),
        };
        self.members
            .set(members)
            .map_err(|_| ModelError::AlreadyPopulated {
                model: self.title.clone(),
            })
    }

    pub fn is_populated(&self) -> bool {
        self.members.get().is_some()
    }

    fn members(&self) -> Result<&Members, ModelError> {
        self.members.get().ok_or_else(|| ModelError::NotPopulated {
            model: self.title.clone(),
        })
    }
}

impl Model for EagerModel {
    fn title(&self) -> &str {
        &self.title
    }

    fn tags(&self) -> &TagSummary {
        &self.tags
    }

    fn flows(&self, filter: &TagFilter) -> Result<Vec<Arc<Flow>>, ModelError> {
        let members = self.members()?;
        let mut flows = Vec::new();
        let mut seen = HashSet::new();
        extend_unique(
            &mut flows,
            &mut seen,
            members
                .flows
                .iter()
                .filter(|f| filter.matches_flow(f))
                .cloned(),
        );
        sub_flows(&members.subs, filter, &mut flows, &mut seen)?;
        Ok(flows)
    }

    fn subs(&self) -> Vec<Arc<dyn Model>> {
        self.members
            .get()
            .map(|m| m.subs.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testflow_core::{Actor, Creator, Text};

    fn flow(name: &str, tags: &[&str]) -> Arc<Flow> {
        let actor = Actor::new("ACT");
        Creator::build(|f| {
            f.set_description(name).set_tags(tags.iter().copied()).call(|c| {
                c.from(&actor)
                    .to(&actor)
                    .request(Text::new())
                    .response(Text::new())
            });
        })
        .unwrap()
    }

    #[test]
    fn query_before_populate_fails() {
        let model = EagerModel::new("empty", TagSummary::vacant());
        assert!(matches!(
            model.flows(&TagFilter::all()),
            Err(ModelError::NotPopulated { .. })
        ));
        assert!(model.subs().is_empty());
    }

    #[test]
    fn populate_twice_fails() {
        let model = EagerModel::new("twice", TagSummary::uniform(["a"]));
        model.populate([flow("one", &["a"])], []).unwrap();
        let err = model.populate([flow("two", &["a"])], []).unwrap_err();
        assert_eq!(err.to_string(), "model 'twice' is already populated");
        assert_eq!(model.flows(&TagFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn flows_include_submodels_once() {
        let shared = flow("shared", &["a", "b"]);
        let sub: Arc<dyn Model> = {
            let sub = EagerModel::new("sub", TagSummary::uniform(["a", "b"]));
            sub.populate([Arc::clone(&shared)], []).unwrap();
            Arc::new(sub)
        };
        let top = EagerModel::new("top", TagSummary::new(["a", "b"], ["a"]));
        top.populate([flow("own", &["a"]), shared], [sub]).unwrap();

        let all: Vec<String> = top
            .flows(&TagFilter::all())
            .unwrap()
            .iter()
            .map(|f| f.description().to_string())
            .collect();
        assert_eq!(all, ["own", "shared"]);

        let only_b = top.flows(&TagFilter::all().include(["b"])).unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(top.subs().len(), 1);
    }
}
