//! Field addresses: where a dependency reads or writes a value.
//!
//! A [`FieldAddress`] chains four stages: flow, interaction, message, field.
//! Each stage is an explicit descriptor rather than a closure, so an address
//! can be inspected and printed before the graph it points into is finished.
//! Dereferencing walks the stages with `Option` short-circuiting: any absent
//! stage yields `None`, never an error.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::flow::Flow;
use crate::id::FlowId;
use crate::interaction::{Interaction, InteractionTree};
use crate::message::{Message, Value};

/// Reference to a flow from a field address.
///
/// `Declared` holds only an identity, which allows references to flows that
/// are not built yet (forward references). Only `Built` references can be
/// dereferenced.
#[derive(Clone)]
pub enum FlowRef {
    Declared(FlowId),
    Built(Arc<Flow>),
}

impl FlowRef {
    pub fn id(&self) -> FlowId {
        match self {
            FlowRef::Declared(id) => *id,
            FlowRef::Built(flow) => flow.id(),
        }
    }

    pub fn flow(&self) -> Option<&Arc<Flow>> {
        match self {
            FlowRef::Declared(_) => None,
            FlowRef::Built(flow) => Some(flow),
        }
    }
}

impl From<&Arc<Flow>> for FlowRef {
    fn from(flow: &Arc<Flow>) -> Self {
        FlowRef::Built(Arc::clone(flow))
    }
}

impl From<FlowId> for FlowRef {
    fn from(id: FlowId) -> Self {
        FlowRef::Declared(id)
    }
}

impl fmt::Debug for FlowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowRef::Declared(id) => write!(f, "Declared({id})"),
            FlowRef::Built(flow) => write!(f, "Built({})", flow.id()),
        }
    }
}

/// Which message of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageSide {
    Request,
    Response,
}

impl fmt::Display for MessageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSide::Request => f.write_str("request"),
            MessageSide::Response => f.write_str("response"),
        }
    }
}

/// Picks one interaction out of a flow's call tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InteractionSelector {
    /// The root interaction.
    Root,
    /// Follows child indices down from the root.
    Path(Vec<usize>),
    /// The `occurrence`-th interaction, in pre-order, between the given
    /// actors. `None` matches any actor.
    Between {
        requester: Option<Actor>,
        responder: Option<Actor>,
        occurrence: usize,
    },
    /// The `occurrence`-th interaction, in pre-order, carrying `tag`.
    Tagged { tag: String, occurrence: usize },
}

impl InteractionSelector {
    /// First interaction from `requester` to `responder`.
    pub fn between(requester: &Actor, responder: &Actor) -> Self {
        InteractionSelector::Between {
            requester: Some(requester.clone()),
            responder: Some(responder.clone()),
            occurrence: 0,
        }
    }

    /// First interaction handled by `responder`.
    pub fn to(responder: &Actor) -> Self {
        InteractionSelector::Between {
            requester: None,
            responder: Some(responder.clone()),
            occurrence: 0,
        }
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        InteractionSelector::Tagged {
            tag: tag.into(),
            occurrence: 0,
        }
    }

    pub fn select<'t>(&self, tree: &'t InteractionTree) -> Option<Interaction<'t>> {
        if tree.is_empty() {
            return None;
        }
        match self {
            InteractionSelector::Root => Some(tree.root()),
            InteractionSelector::Path(path) => path
                .iter()
                .try_fold(tree.root(), |ntr, &index| ntr.children().nth(index)),
            InteractionSelector::Between {
                requester,
                responder,
                occurrence,
            } => tree
                .preorder()
                .into_iter()
                .filter(|ntr| requester.as_ref().map_or(true, |a| ntr.requester() == a))
                .filter(|ntr| responder.as_ref().map_or(true, |a| ntr.responder() == a))
                .nth(*occurrence),
            InteractionSelector::Tagged { tag, occurrence } => tree
                .preorder()
                .into_iter()
                .filter(|ntr| ntr.tags().contains(tag))
                .nth(*occurrence),
        }
    }
}

/// Locates one field inside one message inside one interaction of one flow.
///
/// An absent flow stage means "the flow this address's dependency is
/// attached to". The address is *complete* only when all four stages are
/// present.
#[derive(Debug, Clone, Default)]
pub struct FieldAddress {
    flow: Option<FlowRef>,
    interaction: Option<InteractionSelector>,
    message: Option<MessageSide>,
    field: Option<String>,
}

impl FieldAddress {
    /// An empty address. Its flow stage defaults to the owning flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// An address into a built flow.
    pub fn of(flow: &Arc<Flow>) -> Self {
        Self::new().in_flow(FlowRef::from(flow))
    }

    pub fn in_flow(mut self, flow: impl Into<FlowRef>) -> Self {
        self.flow = Some(flow.into());
        self
    }

    pub fn at(mut self, selector: InteractionSelector) -> Self {
        self.interaction = Some(selector);
        self
    }

    pub fn root(self) -> Self {
        self.at(InteractionSelector::Root)
    }

    pub fn request(mut self) -> Self {
        self.message = Some(MessageSide::Request);
        self
    }

    pub fn response(mut self) -> Self {
        self.message = Some(MessageSide::Response);
        self
    }

    pub fn field(mut self, path: impl Into<String>) -> Self {
        self.field = Some(path.into());
        self
    }

    pub(crate) fn retarget(mut self, flow: Option<FlowRef>) -> Self {
        self.flow = flow;
        self
    }

    pub fn flow_ref(&self) -> Option<&FlowRef> {
        self.flow.as_ref()
    }

    pub fn flow_id(&self) -> Option<FlowId> {
        self.flow.as_ref().map(FlowRef::id)
    }

    pub fn selector(&self) -> Option<&InteractionSelector> {
        self.interaction.as_ref()
    }

    pub fn side(&self) -> Option<MessageSide> {
        self.message
    }

    pub fn field_path(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.flow.is_some()
            && self.interaction.is_some()
            && self.message.is_some()
            && self.field.is_some()
    }

    /// The addressed interaction, if the flow is built and the selector
    /// matches.
    pub fn interaction(&self) -> Option<Interaction<'_>> {
        let flow = self.flow.as_ref()?.flow()?;
        self.interaction.as_ref()?.select(flow.interactions())
    }

    pub fn message(&self) -> Option<&dyn Message> {
        Some(self.interaction()?.message(self.message?))
    }

    pub fn value(&self) -> Option<Value> {
        self.message()?.get(self.field.as_deref()?)
    }

    /// Applies the interaction and message stages to `tree`, ignoring the
    /// flow stage.
    pub(crate) fn select_in<'t>(&self, tree: &'t InteractionTree) -> Option<Interaction<'t>> {
        self.interaction.as_ref()?.select(tree)
    }
}

impl fmt::Display for FieldAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.flow {
            Some(flow) => write!(f, "flow {}", flow.id())?,
            None => f.write_str("this flow")?,
        }
        match &self.interaction {
            Some(selector) => write!(f, " / {selector:?}")?,
            None => f.write_str(" / ?")?,
        }
        match self.message {
            Some(side) => write!(f, " / {side}")?,
            None => f.write_str(" / ?")?,
        }
        match &self.field {
            Some(field) => write!(f, " / {field}"),
            None => f.write_str(" / ?"),
        }
    }
}
