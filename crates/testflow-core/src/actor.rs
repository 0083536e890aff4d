//! System actors: the parties exchanging messages in an interaction.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// A named participant in the system under test.
///
/// Actors are cheap-to-clone handles. Equality and hashing use reference
/// identity, not the name: two actors created separately with the same name
/// are different actors.
#[derive(Clone)]
pub struct Actor(Arc<str>);

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Actor(Arc::from(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Actor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Actor {}

impl Hash for Actor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const u8 as usize).hash(state);
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor({})", self.name())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Actor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
