//! Flow metadata: description, tags, motivation and creation trace.
//!
//! [`Metadata::identity`] is the flow's human-facing identity. It must be
//! unique within any model that contains the flow; the duplicate-identity
//! check enforces that after assembly.

use std::collections::BTreeSet;
use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Tags beginning with this prefix mark execution-chain membership.
pub const CHAIN_TAG_PREFIX: &str = "chain:";

/// Source location where a flow was authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Trace {
    /// Captures the caller's location. Propagates through `#[track_caller]`
    /// functions, so builder entry points report the authoring site.
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Trace {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Descriptive data attached to every flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub description: String,
    pub tags: BTreeSet<String>,
    pub motivation: String,
    pub trace: Trace,
}

impl Metadata {
    /// Description plus sorted tags, e.g. `supplied [cheese, supply]`.
    pub fn identity(&self) -> String {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        format!("{} [{}]", self.description, tags.join(", "))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Groups flows that must execute in sequence against shared system state.
///
/// Membership is recorded as a tag, so chain members can be selected with an
/// ordinary tag query. Derived flows drop chain tags unless told to keep them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chain {
    name: String,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Chain { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag carried by members of this chain.
    pub fn tag(&self) -> String {
        format!("{CHAIN_TAG_PREFIX}{}", self.name)
    }

    pub fn is_chain_tag(tag: &str) -> bool {
        tag.starts_with(CHAIN_TAG_PREFIX)
    }
}
