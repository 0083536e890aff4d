//! Flat unions of already-built models.

use std::collections::HashSet;
use std::sync::Arc;

use testflow_core::Flow;

use crate::error::ModelError;
use crate::model::{sub_flows, Model};
use crate::tags::{TagFilter, TagSummary};

/// Union of existing models. Its summary is recomputed whenever a member is
/// added or removed.
pub struct CombineModel {
    title: String,
    members: Vec<Arc<dyn Model>>,
    tags: TagSummary,
}

impl CombineModel {
    pub fn new(title: impl Into<String>) -> Self {
        CombineModel {
            title: title.into(),
            members: Vec::new(),
            tags: TagSummary::vacant(),
        }
    }

    pub fn with(mut self, model: Arc<dyn Model>) -> Self {
        self.add(model);
        self
    }

    pub fn add(&mut self, model: Arc<dyn Model>) -> &mut Self {
        self.members.push(model);
        self.recompute();
        self
    }

    /// Removes every member whose title is `title`.
    pub fn remove(&mut self, title: &str) -> &mut Self {
        self.members.retain(|m| m.title() != title);
        self.recompute();
        self
    }

    pub fn members(&self) -> &[Arc<dyn Model>] {
        &self.members
    }

    fn recompute(&mut self) {
        self.tags = TagSummary::combine(self.members.iter().map(|m| m.tags()));
    }
}

impl Model for CombineModel {
    fn title(&self) -> &str {
        &self.title
    }

    fn tags(&self) -> &TagSummary {
        &self.tags
    }

    fn flows(&self, filter: &TagFilter) -> Result<Vec<Arc<Flow>>, ModelError> {
        let mut flows = Vec::new();
        sub_flows(&self.members, filter, &mut flows, &mut HashSet::new())?;
        Ok(flows)
    }

    fn subs(&self) -> Vec<Arc<dyn Model>> {
        self.members.clone()
    }
}
