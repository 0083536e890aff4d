//! Mutable staging counterpart of an interaction.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::actor::Actor;
use crate::address::MessageSide;
use crate::flow::Flow;
use crate::id::InteractionId;
use crate::interaction::{Interaction, InteractionTree};
use crate::message::{Message, Value};

/// An interaction under construction.
///
/// Either blank, or seeded from an interaction of a built basis flow. Each
/// scalar accessor returns the override if one was set, else the basis
/// value, else nothing. Children are always materialized so they can be
/// edited individually.
#[derive(Debug, Clone, Default)]
pub struct MutableInteraction {
    basis: Option<(Arc<Flow>, InteractionId)>,
    requester: Option<Actor>,
    responder: Option<Actor>,
    request: Option<Arc<dyn Message>>,
    response: Option<Arc<dyn Message>>,
    tags: Option<BTreeSet<String>>,
    children: Vec<MutableInteraction>,
}

impl MutableInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds from interaction `id` of `flow`, recursively seeding children.
    pub fn derive(flow: &Arc<Flow>, id: InteractionId) -> Self {
        let children = flow
            .interactions()
            .get(id)
            .map(|ntr| ntr.children().map(|c| Self::derive(flow, c.id())).collect())
            .unwrap_or_default();
        MutableInteraction {
            basis: Some((Arc::clone(flow), id)),
            children,
            ..Self::default()
        }
    }

    fn basis(&self) -> Option<Interaction<'_>> {
        self.basis
            .as_ref()
            .and_then(|(flow, id)| flow.interactions().get(*id))
    }

    pub fn requester(&self) -> Option<&Actor> {
        self.requester
            .as_ref()
            .or_else(|| self.basis().map(|b| b.requester()))
    }

    pub fn responder(&self) -> Option<&Actor> {
        self.responder
            .as_ref()
            .or_else(|| self.basis().map(|b| b.responder()))
    }

    pub fn request(&self) -> Option<&dyn Message> {
        self.shared(MessageSide::Request).map(|m| m.as_ref())
    }

    pub fn response(&self) -> Option<&dyn Message> {
        self.shared(MessageSide::Response).map(|m| m.as_ref())
    }

    fn shared(&self, side: MessageSide) -> Option<&Arc<dyn Message>> {
        let own = match side {
            MessageSide::Request => self.request.as_ref(),
            MessageSide::Response => self.response.as_ref(),
        };
        own.or_else(|| self.basis().map(|b| b.shared_message(side)))
    }

    pub fn tags(&self) -> BTreeSet<String> {
        match (&self.tags, self.basis()) {
            (Some(tags), _) => tags.clone(),
            (None, Some(basis)) => basis.tags().clone(),
            (None, None) => BTreeSet::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(tag)
    }

    pub fn children(&self) -> &[MutableInteraction] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<MutableInteraction> {
        &mut self.children
    }

    pub fn set_requester(&mut self, actor: &Actor) -> &mut Self {
        self.requester = Some(actor.clone());
        self
    }

    /// Also becomes the requester of every child call.
    pub fn set_responder(&mut self, actor: &Actor) -> &mut Self {
        self.responder = Some(actor.clone());
        for child in &mut self.children {
            child.requester = Some(actor.clone());
        }
        self
    }

    pub fn set_request(&mut self, message: impl Message + 'static) -> &mut Self {
        let message: Arc<dyn Message> = Arc::new(message);
        self.request = Some(message);
        self
    }

    pub fn set_response(&mut self, message: impl Message + 'static) -> &mut Self {
        let message: Arc<dyn Message> = Arc::new(message);
        self.response = Some(message);
        self
    }

    /// Edits a copy of the current request. No-op if there is none.
    pub fn update_request(&mut self, edit: impl FnOnce(&mut dyn Message)) -> &mut Self {
        self.update_message(MessageSide::Request, edit)
    }

    /// Edits a copy of the current response. No-op if there is none.
    pub fn update_response(&mut self, edit: impl FnOnce(&mut dyn Message)) -> &mut Self {
        self.update_message(MessageSide::Response, edit)
    }

    fn update_message(&mut self, side: MessageSide, edit: impl FnOnce(&mut dyn Message)) -> &mut Self {
        let copy = self.shared(side).map(|m| m.child());
        if let Some(mut copy) = copy {
            edit(copy.as_mut());
            let copy: Arc<dyn Message> = Arc::from(copy);
            match side {
                MessageSide::Request => self.request = Some(copy),
                MessageSide::Response => self.response = Some(copy),
            }
        }
        self
    }

    pub(crate) fn set_field(&mut self, side: MessageSide, field: &str, value: Value) {
        self.update_message(side, |m| m.set(field, value));
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

    /// Appends a child call. Its requester becomes this interaction's
    /// responder.
    pub fn add_child(&mut self, mut child: MutableInteraction) -> &mut Self {
        child.requester = self.responder().cloned();
        self.children.push(child);
        self
    }

    /// Child-index paths of every interaction matching `pred`, in pre-order.
    /// The empty path is this interaction.
    pub(crate) fn matching_paths(&self, pred: &dyn Fn(&MutableInteraction) -> bool) -> Vec<Vec<usize>> {
        fn walk(
            ntr: &MutableInteraction,
            pred: &dyn Fn(&MutableInteraction) -> bool,
            path: &mut Vec<usize>,
            out: &mut Vec<Vec<usize>>,
        ) {
            if pred(ntr) {
                out.push(path.clone());
            }
            for (index, child) in ntr.children.iter().enumerate() {
                path.push(index);
                walk(child, pred, path, out);
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(self, pred, &mut Vec::new(), &mut out);
        out
    }

    pub(crate) fn at_path(&self, path: &[usize]) -> Option<&MutableInteraction> {
        path.iter()
            .try_fold(self, |ntr, &index| ntr.children.get(index))
    }

    pub(crate) fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut MutableInteraction> {
        path.iter()
            .try_fold(self, |ntr, &index| ntr.children.get_mut(index))
    }

    /// Materializes this interaction as the root of a new tree. On failure,
    /// names the part that was never supplied.
    pub(crate) fn build(&self) -> Result<InteractionTree, &'static str> {
        let requester = self.requester().ok_or("root requester")?.clone();
        let mut tree = InteractionTree::new(requester);
        self.push_into(&mut tree, None)?;
        Ok(tree)
    }

    fn push_into(
        &self,
        tree: &mut InteractionTree,
        parent: Option<InteractionId>,
    ) -> Result<(), &'static str> {
        let responder = self.responder().ok_or("responder")?.clone();
        let request = self.shared(MessageSide::Request).ok_or("request")?;
        let response = self.shared(MessageSide::Response).ok_or("response")?;
        let id = tree.push(
            parent,
            responder,
            Arc::clone(request),
            Arc::clone(response),
            self.tags(),
        );
        for child in &self.children {
            child.push_into(tree, Some(id))?;
        }
        Ok(())
    }
}
