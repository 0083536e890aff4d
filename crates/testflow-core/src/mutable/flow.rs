//! Mutable staging counterpart of a flow.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::actor::Actor;
use crate::address::FlowRef;
use crate::builder::Call;
use crate::context::{Context, Residue};
use crate::dependency::Dependency;
use crate::error::CoreError;
use crate::flow::Flow;
use crate::id::{FlowId, InteractionId};
use crate::interaction::InteractionTree;
use crate::message::Message;
use crate::metadata::{Metadata, Trace};
use crate::mutable::MutableInteraction;

/// A flow under construction.
///
/// Scalar fields delegate to the basis until overridden. The interaction
/// tree, contexts and residues are materialized from the basis up front so
/// they can be edited in place. Dependencies are never inherited implicitly;
/// see [`inherit_dependencies`](Self::inherit_dependencies).
///
/// Mutators that cannot fail immediately record their error, and
/// [`build`](Self::build) reports the first one.
#[derive(Debug)]
pub struct MutableFlow {
    id: FlowId,
    trace: Trace,
    basis: Option<Arc<Flow>>,
    description: Option<String>,
    motivation: Option<String>,
    tags: Option<BTreeSet<String>>,
    root: Option<MutableInteraction>,
    implicit: Option<Vec<Actor>>,
    dependencies: Vec<Dependency>,
    contexts: IndexMap<String, Arc<dyn Context>>,
    residues: IndexMap<String, Arc<dyn Residue>>,
    errors: Vec<CoreError>,
}

impl MutableFlow {
    /// A blank flow.
    pub fn new(id: FlowId, trace: Trace) -> Self {
        MutableFlow {
            id,
            trace,
            basis: None,
            description: None,
            motivation: None,
            tags: None,
            root: None,
            implicit: None,
            dependencies: Vec::new(),
            contexts: IndexMap::new(),
            residues: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    /// A flow that inherits everything but its dependencies from `basis`.
    pub fn derive(id: FlowId, trace: Trace, basis: &Arc<Flow>) -> Self {
        let contexts = basis
            .contexts
            .iter()
            .map(|(name, c)| (name.clone(), Arc::from(c.child())))
            .collect();
        let residues = basis
            .residues
            .iter()
            .map(|(name, r)| (name.clone(), Arc::from(r.child())))
            .collect();
        MutableFlow {
            basis: Some(Arc::clone(basis)),
            root: Some(MutableInteraction::derive(basis, InteractionId::ROOT)),
            contexts,
            residues,
            ..Self::new(id, trace)
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn basis(&self) -> Option<&Arc<Flow>> {
        self.basis.as_ref()
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn description(&self) -> &str {
        self.description
            .as_deref()
            .or_else(|| self.basis.as_ref().map(|b| b.meta().description.as_str()))
            .unwrap_or_default()
    }

    pub fn motivation(&self) -> &str {
        self.motivation
            .as_deref()
            .or_else(|| self.basis.as_ref().map(|b| b.meta().motivation.as_str()))
            .unwrap_or_default()
    }

    pub fn tags(&self) -> BTreeSet<String> {
        match (&self.tags, &self.basis) {
            (Some(tags), _) => tags.clone(),
            (None, Some(basis)) => basis.tags().clone(),
            (None, None) => BTreeSet::new(),
        }
    }

    pub fn root(&self) -> Option<&MutableInteraction> {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> Option<&mut MutableInteraction> {
        self.root.as_mut()
    }

    pub fn implicit(&self) -> Vec<Actor> {
        match (&self.implicit, &self.basis) {
            (Some(actors), _) => actors.clone(),
            (None, Some(basis)) => basis.implicit().to_vec(),
            (None, None) => Vec::new(),
        }
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn context(&self, name: &str) -> Option<&dyn Context> {
        self.contexts.get(name).map(|c| c.as_ref())
    }

    pub fn residue(&self, name: &str) -> Option<&dyn Residue> {
        self.residues.get(name).map(|r| r.as_ref())
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_motivation(&mut self, motivation: impl Into<String>) -> &mut Self {
        self.motivation = Some(motivation.into());
        self
    }

    pub fn set_trace(&mut self, trace: Trace) -> &mut Self {
        self.trace = trace;
        self
    }

    pub fn set_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn add_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut current = self.tags();
        current.extend(tags.into_iter().map(Into::into));
        self.tags = Some(current);
        self
    }

    pub fn remove_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self.tags();
        for tag in tags {
            current.remove(tag.as_ref());
        }
        self.tags = Some(current);
        self
    }

    // -----------------------------------------------------------------------
    // Interactions
    // -----------------------------------------------------------------------

    /// Replaces the root interaction with one built by `step`.
    #[track_caller]
    pub fn call(&mut self, step: impl FnOnce(Call) -> Call) -> &mut Self {
        match Call::traverse(Call::new(), step) {
            Ok(root) => self.root = Some(root),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Applies `edit` to every interaction matching `pred`, visiting them in
    /// pre-order regardless of nesting depth.
    pub fn update(
        &mut self,
        pred: impl Fn(&MutableInteraction) -> bool,
        mut edit: impl FnMut(&mut MutableInteraction),
    ) -> &mut Self {
        if let Some(root) = self.root.as_mut() {
            for path in root.matching_paths(&pred) {
                if let Some(ntr) = root.at_path_mut(&path) {
                    edit(ntr);
                }
            }
        }
        self
    }

    /// Adds a child call, built by `step`, under every interaction matching
    /// `pred`.
    #[track_caller]
    pub fn add_call(
        &mut self,
        pred: impl Fn(&MutableInteraction) -> bool,
        step: impl Fn(Call) -> Call,
    ) -> &mut Self {
        let Some(root) = self.root.as_mut() else {
            return self;
        };
        for path in root.matching_paths(&pred) {
            let Some(parent) = root.at_path_mut(&path) else {
                continue;
            };
            match Call::traverse(Call::under(parent.responder()), &step) {
                Ok(child) => {
                    parent.add_child(child);
                }
                Err(e) => self.errors.push(e),
            }
        }
        self
    }

    /// Removes every non-root interaction matching `pred`, along with its
    /// own children.
    pub fn remove_call(&mut self, pred: impl Fn(&MutableInteraction) -> bool) -> &mut Self {
        if let Some(root) = self.root.as_mut() {
            let paths = root.matching_paths(&pred);
            // Deepest-last order: removing from the back keeps earlier paths valid.
            for path in paths.iter().rev() {
                let Some((&index, parent)) = path.split_last() else {
                    continue;
                };
                if let Some(parent) = root.at_path_mut(parent) {
                    if index < parent.children().len() {
                        parent.children_mut().remove(index);
                    }
                }
            }
        }
        self
    }

    /// Discards everything outside the first interaction matching `pred`.
    ///
    /// A synthetic root from `requester` to the chosen interaction's
    /// requester is substituted, with the chosen interaction as its only
    /// child.
    pub fn reroot(
        &mut self,
        pred: impl Fn(&MutableInteraction) -> bool,
        requester: &Actor,
        request: impl Message + 'static,
        response: impl Message + 'static,
    ) -> &mut Self {
        let chosen = self.root.as_ref().and_then(|root| {
            let path = root.matching_paths(&pred).into_iter().next()?;
            root.at_path(&path).cloned()
        });
        let Some(chosen) = chosen else {
            self.errors.push(CoreError::NoSuchInteraction {
                flow: self.id,
                trace: self.trace.to_string(),
            });
            return self;
        };
        self.root = Some(synthetic_root(chosen, requester, request, response));
        self
    }

    /// Makes the current root the only child of a new root from `requester`.
    pub fn wrap(
        &mut self,
        requester: &Actor,
        request: impl Message + 'static,
        response: impl Message + 'static,
    ) -> &mut Self {
        match self.root.take() {
            Some(root) => self.root = Some(synthetic_root(root, requester, request, response)),
            None => self.errors.push(CoreError::NoSuchInteraction {
                flow: self.id,
                trace: self.trace.to_string(),
            }),
        }
        self
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    pub fn add_implicit<'a>(&mut self, actors: impl IntoIterator<Item = &'a Actor>) -> &mut Self {
        let mut current = self.implicit();
        for actor in actors {
            if !current.contains(actor) {
                current.push(actor.clone());
            }
        }
        self.implicit = Some(current);
        self
    }

    pub fn remove_implicit<'a>(&mut self, actors: impl IntoIterator<Item = &'a Actor>) -> &mut Self {
        let mut current = self.implicit();
        for actor in actors {
            current.retain(|a| a != actor);
        }
        self.implicit = Some(current);
        self
    }

    // -----------------------------------------------------------------------
    // Dependencies
    // -----------------------------------------------------------------------

    /// Attaches `dependency`, pinning its sink to this flow.
    ///
    /// If both endpoints are addressable right now, the source value is read,
    /// transformed and written into a copy of the sink message immediately.
    /// Later edits to either message do not re-run the copy. A missing source
    /// field or sink message is reported by [`build`](Self::build).
    pub fn dependency(&mut self, dependency: Dependency) -> &mut Self {
        let dependency = dependency.attach(self.id);
        if let Err(e) = self.resolve(&dependency) {
            self.errors.push(e);
        }
        self.dependencies.push(dependency);
        self
    }

    /// This flow runs no earlier than `flow`.
    pub fn prerequisite(&mut self, flow: impl Into<FlowRef>) -> &mut Self {
        self.dependency(Dependency::prerequisite(flow))
    }

    pub fn remove_dependencies(&mut self, pred: impl Fn(&Dependency) -> bool) -> &mut Self {
        self.dependencies.retain(|d| !pred(d));
        self
    }

    /// For each basis dependency matching `pred`, attaches a copy whose
    /// source reads from `source` and whose sink writes into this flow.
    pub fn inherit_dependencies(
        &mut self,
        pred: impl Fn(&Dependency) -> bool,
        source: &Arc<Flow>,
    ) -> &mut Self {
        let inherited: Vec<Dependency> = self
            .basis
            .iter()
            .flat_map(|basis| basis.dependencies())
            .filter(|d| pred(d))
            .map(|d| d.retarget(source))
            .collect();
        for dependency in inherited {
            self.dependency(dependency);
        }
        self
    }

    // -----------------------------------------------------------------------
    // Contexts and residues
    // -----------------------------------------------------------------------

    /// Adds `context`, replacing any existing context of the same name.
    pub fn add_context(&mut self, context: impl Context) -> &mut Self {
        let context: Arc<dyn Context> = Arc::new(context);
        self.contexts.insert(context.name().to_string(), context);
        self
    }

    /// Edits a copy of the context of type `C`. No-op if there is none.
    pub fn update_context<C: Context>(&mut self, edit: impl FnOnce(&mut C)) -> &mut Self {
        let found = self
            .contexts
            .iter()
            .find(|(_, c)| c.as_any().is::<C>())
            .map(|(name, c)| (name.clone(), c.child()));
        if let Some((name, mut copy)) = found {
            if let Some(typed) = copy.as_any_mut().downcast_mut::<C>() {
                edit(typed);
            }
            self.contexts.insert(name, Arc::from(copy));
        }
        self
    }

    pub fn remove_context(&mut self, name: &str) -> &mut Self {
        self.contexts.shift_remove(name);
        self
    }

    /// Adds `residue`, replacing any existing residue of the same name.
    pub fn add_residue(&mut self, residue: impl Residue) -> &mut Self {
        let residue: Arc<dyn Residue> = Arc::new(residue);
        self.residues.insert(residue.name().to_string(), residue);
        self
    }

    /// Edits a copy of the residue of type `R`. No-op if there is none.
    pub fn update_residue<R: Residue>(&mut self, edit: impl FnOnce(&mut R)) -> &mut Self {
        let found = self
            .residues
            .iter()
            .find(|(_, r)| r.as_any().is::<R>())
            .map(|(name, r)| (name.clone(), r.child()));
        if let Some((name, mut copy)) = found {
            if let Some(typed) = copy.as_any_mut().downcast_mut::<R>() {
                edit(typed);
            }
            self.residues.insert(name, Arc::from(copy));
        }
        self
    }

    pub fn remove_residue(&mut self, name: &str) -> &mut Self {
        self.residues.shift_remove(name);
        self
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Materializes the immutable flow.
    pub fn build(mut self) -> Result<Arc<Flow>, CoreError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        let trace = self.trace.to_string();
        let incomplete = |what| CoreError::Incomplete {
            flow: self.id,
            trace: trace.clone(),
            what,
        };

        let root = self.root.as_ref().ok_or_else(|| incomplete("root interaction"))?;
        let interactions = root.build().map_err(incomplete)?;

        let meta = self.meta();
        let identity = meta.identity();
        let implicit = self.implicit();
        tracing::debug!(
            flow = %identity,
            interactions = interactions.len(),
            dependencies = self.dependencies.len(),
            derived = self.basis.is_some(),
            "built flow"
        );
        Ok(Arc::new(Flow {
            id: self.id,
            meta,
            basis: self.basis,
            interactions,
            implicit,
            dependencies: self.dependencies,
            contexts: self.contexts,
            residues: self.residues,
        }))
    }

    fn meta(&self) -> Metadata {
        Metadata {
            description: self.description().to_string(),
            tags: self.tags(),
            motivation: self.motivation().to_string(),
            trace: self.trace.clone(),
        }
    }

    /// Current interactions, assembled into a throwaway tree for selection.
    /// Node IDs match the pre-order position of the staged interactions.
    fn staged_tree(&self) -> Option<InteractionTree> {
        self.root.as_ref()?.build().ok()
    }

    fn staged_structure(&self, identity: &str) -> String {
        match self.staged_tree() {
            Some(tree) => format!("{identity}\n{}", tree.render()),
            None => format!("{identity}\n(incomplete interactions)"),
        }
    }

    /// One-shot value copy for a dependency just attached to this flow.
    fn resolve(&mut self, dependency: &Dependency) -> Result<(), CoreError> {
        let (source, sink) = (dependency.source(), dependency.sink());
        if sink.flow_id() != Some(self.id) || !sink.is_complete() || source.selector().is_none() {
            return Ok(());
        }
        let (Some(source_side), Some(source_field)) = (source.side(), source.field_path()) else {
            return Ok(());
        };
        let (Some(sink_side), Some(sink_field)) = (sink.side(), sink.field_path()) else {
            return Ok(());
        };

        let identity = self.meta().identity();
        let trace = self.trace.to_string();
        let unresolved = |source_structure: String| CoreError::SourceUnresolved {
            sink: identity.clone(),
            trace: trace.clone(),
            field: source_field.to_string(),
            source_structure,
        };
        let value = match source.flow_ref() {
            Some(FlowRef::Built(flow)) if flow.id() != self.id => source
                .value()
                .ok_or_else(|| unresolved(flow.structure()))?,
            // Forward reference to a flow that is not built yet: ordering only.
            Some(FlowRef::Declared(id)) if *id != self.id => return Ok(()),
            _ => self
                .staged_tree()
                .and_then(|tree| source.select_in(&tree)?.message(source_side).get(source_field))
                .ok_or_else(|| unresolved(self.staged_structure(&identity)))?,
        };
        let value = dependency.apply(value);

        let target = self.staged_tree().and_then(|tree| {
            let id = sink.select_in(&tree)?.id();
            let paths = self.root.as_ref()?.matching_paths(&|_: &MutableInteraction| true);
            paths.into_iter().nth(id.index())
        });
        let ntr = target.and_then(|path| self.root.as_mut()?.at_path_mut(&path));
        let Some(ntr) = ntr else {
            return Err(CoreError::SinkUnresolved {
                sink: identity.clone(),
                trace: trace.clone(),
                side: sink_side,
                field: sink_field.to_string(),
                sink_structure: self.staged_structure(&identity),
            });
        };
        ntr.set_field(sink_side, sink_field, value);
        tracing::debug!(flow = %identity, field = sink_field, "resolved dependency");
        Ok(())
    }
}

fn synthetic_root(
    child: MutableInteraction,
    requester: &Actor,
    request: impl Message + 'static,
    response: impl Message + 'static,
) -> MutableInteraction {
    let mut root = MutableInteraction::new();
    root.set_requester(requester)
        .set_request(request)
        .set_response(response);
    if let Some(responder) = child.requester().cloned() {
        root.set_responder(&responder);
    }
    root.add_child(child);
    root
}
