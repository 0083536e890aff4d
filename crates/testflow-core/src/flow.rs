//! Immutable flow snapshots.
//!
//! A [`Flow`] is produced once by [`MutableFlow::build`](crate::mutable::MutableFlow::build)
//! and never changes afterwards. Flows are shared through `Arc`: as a basis
//! for derived flows, as dependency sources, and across threads.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::actor::Actor;
use crate::context::{Context, Residue};
use crate::dependency::Dependency;
use crate::id::FlowId;
use crate::interaction::{Interaction, InteractionTree};
use crate::metadata::Metadata;

/// A documented request/response scenario.
pub struct Flow {
    pub(crate) id: FlowId,
    pub(crate) meta: Metadata,
    pub(crate) basis: Option<Arc<Flow>>,
    pub(crate) interactions: InteractionTree,
    pub(crate) implicit: Vec<Actor>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) contexts: IndexMap<String, Arc<dyn Context>>,
    pub(crate) residues: IndexMap<String, Arc<dyn Residue>>,
}

impl Flow {
    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn description(&self) -> &str {
        &self.meta.description
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.meta.tags
    }

    pub fn identity(&self) -> String {
        self.meta.identity()
    }

    /// The flow this one was derived from.
    pub fn basis(&self) -> Option<&Arc<Flow>> {
        self.basis.as_ref()
    }

    pub fn root(&self) -> Interaction<'_> {
        self.interactions.root()
    }

    pub fn interactions(&self) -> &InteractionTree {
        &self.interactions
    }

    /// Actors involved in the flow without appearing in its call tree.
    pub fn implicit(&self) -> &[Actor] {
        &self.implicit
    }

    /// Every actor in the call tree plus the implicit ones, without repeats,
    /// in order of first appearance.
    pub fn actors(&self) -> Vec<Actor> {
        let mut actors: Vec<Actor> = Vec::new();
        let mut push = |actor: &Actor| {
            if !actors.contains(actor) {
                actors.push(actor.clone());
            }
        };
        for ntr in self.interactions.preorder() {
            push(ntr.requester());
            push(ntr.responder());
        }
        for actor in &self.implicit {
            push(actor);
        }
        actors
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Arc<dyn Context>> {
        self.contexts.values()
    }

    pub fn context(&self, name: &str) -> Option<&dyn Context> {
        self.contexts.get(name).map(|c| c.as_ref())
    }

    /// The context of concrete type `C`, if present.
    pub fn context_as<C: Context>(&self) -> Option<&C> {
        self.contexts
            .values()
            .find_map(|c| c.as_any().downcast_ref::<C>())
    }

    pub fn residues(&self) -> impl Iterator<Item = &Arc<dyn Residue>> {
        self.residues.values()
    }

    pub fn residue(&self, name: &str) -> Option<&dyn Residue> {
        self.residues.get(name).map(|r| r.as_ref())
    }

    /// The residue of concrete type `R`, if present.
    pub fn residue_as<R: Residue>(&self) -> Option<&R> {
        self.residues
            .values()
            .find_map(|r| r.as_any().downcast_ref::<R>())
    }

    /// Identity line followed by the indented call tree. Used in
    /// diagnostics so authoring mistakes can be located without a debugger.
    pub fn structure(&self) -> String {
        format!("{}\n{}", self.identity(), self.interactions.render())
    }
}

impl PartialEq for Flow {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Flow {}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("id", &self.id)
            .field("identity", &self.identity())
            .field("basis", &self.basis.as_ref().map(|b| b.id))
            .field("interactions", &self.interactions.len())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}
