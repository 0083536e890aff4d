//! Tag summaries and tag filters.
//!
//! A [`TagSummary`] describes which tags a model's flows may carry (the
//! union) and which they always carry (the intersection). Because it is known
//! before the model is built, a [`TagFilter`] query can skip models that
//! cannot possibly contribute.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use testflow_core::Flow;

static NO_TAGS: BTreeSet<String> = BTreeSet::new();

/// Union and intersection of the tags of a set of flows.
///
/// A summary of no flows at all is *vacant*. It differs from a summary of
/// untagged flows: it is neutral when summaries are combined, whereas
/// untagged flows empty the combined intersection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    union: BTreeSet<String>,
    intersection: Option<BTreeSet<String>>,
}

impl TagSummary {
    pub fn new<U, I, S>(union: U, intersection: I) -> Self
    where
        U: IntoIterator<Item = S>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let union: BTreeSet<String> = union.into_iter().map(Into::into).collect();
        let mut intersection: BTreeSet<String> = intersection.into_iter().map(Into::into).collect();
        intersection.retain(|t| union.contains(t));
        TagSummary {
            union,
            intersection: Some(intersection),
        }
    }

    /// Flows that all carry exactly `tags`.
    pub fn uniform<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        TagSummary {
            union: tags.clone(),
            intersection: Some(tags),
        }
    }

    /// The summary of no flows.
    pub fn vacant() -> Self {
        Self::default()
    }

    /// The true summary of `flows`.
    pub fn of_flows<'a>(flows: impl IntoIterator<Item = &'a Flow>) -> Self {
        flows
            .into_iter()
            .fold(Self::vacant(), |acc, flow| acc.merge(&Self::uniform(flow.tags().iter().cloned())))
    }

    /// The summary of every flow summarized by any of `summaries`.
    pub fn combine<'a>(summaries: impl IntoIterator<Item = &'a TagSummary>) -> Self {
        summaries
            .into_iter()
            .fold(Self::vacant(), |acc, summary| acc.merge(summary))
    }

    fn merge(mut self, other: &TagSummary) -> Self {
        self.union.extend(other.union.iter().cloned());
        self.intersection = match (self.intersection, &other.intersection) {
            (None, other) => other.clone(),
            (mine, None) => mine,
            (Some(mine), Some(theirs)) => Some(mine.intersection(theirs).cloned().collect()),
        };
        self
    }

    pub fn union(&self) -> &BTreeSet<String> {
        &self.union
    }

    pub fn intersection(&self) -> &BTreeSet<String> {
        self.intersection.as_ref().unwrap_or(&NO_TAGS)
    }

    pub fn is_vacant(&self) -> bool {
        self.intersection.is_none()
    }

    /// Whether any flow described by this summary could match `filter`.
    ///
    /// Every included tag must be possible and no excluded tag may be
    /// certain. A vacant summary is compatible with nothing.
    pub fn compatible(&self, filter: &TagFilter) -> bool {
        !self.is_vacant()
            && filter.include.is_subset(&self.union)
            && filter.exclude.is_disjoint(self.intersection())
    }
}

/// Include/exclude tag query. The default filter matches every flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    #[serde(default)]
    pub include: BTreeSet<String>,
    #[serde(default)]
    pub exclude: BTreeSet<String>,
}

impl TagFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        self.include.is_subset(tags) && self.exclude.is_disjoint(tags)
    }

    pub fn matches_flow(&self, flow: &Flow) -> bool {
        self.matches(flow.tags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn combine_keeps_vacant_neutral() {
        let a = TagSummary::new(["x", "y"], ["x"]);
        let b = TagSummary::uniform(["x", "z"]);
        let combined = TagSummary::combine([&a, &TagSummary::vacant(), &b]);
        assert_eq!(combined.union(), &set(&["x", "y", "z"]));
        assert_eq!(combined.intersection(), &set(&["x"]));

        let untagged = TagSummary::uniform(Vec::<String>::new());
        let emptied = TagSummary::combine([&a, &untagged]);
        assert!(emptied.intersection().is_empty());
        assert!(!emptied.is_vacant());
    }

    #[test]
    fn intersection_is_clamped_to_union() {
        let s = TagSummary::new(["a"], ["a", "b"]);
        assert_eq!(s.intersection(), &set(&["a"]));
    }

    #[test]
    fn compatibility() {
        let s = TagSummary::new(["cheese", "supply", "rejected"], ["cheese"]);
        assert!(s.compatible(&TagFilter::all()));
        assert!(s.compatible(&TagFilter::all().include(["supply"])));
        assert!(s.compatible(&TagFilter::all().exclude(["rejected"])));
        assert!(!s.compatible(&TagFilter::all().include(["wine"])));
        assert!(!s.compatible(&TagFilter::all().exclude(["cheese"])));
        assert!(!TagSummary::vacant().compatible(&TagFilter::all()));
    }

    #[test]
    fn filter_matching() {
        let filter = TagFilter::all().include(["cheese"]).exclude(["rejected"]);
        assert!(filter.matches(&set(&["cheese", "supply"])));
        assert!(!filter.matches(&set(&["cheese", "rejected"])));
        assert!(!filter.matches(&set(&["supply"])));
    }

    #[test]
    fn filter_deserializes_with_defaults() {
        let filter: TagFilter = serde_json::from_str(r#"{"include":["a"]}"#).unwrap();
        assert_eq!(filter, TagFilter::all().include(["a"]));
    }
}
