//! Immutable interaction call trees.
//!
//! An [`InteractionTree`] stores a flow's interactions in a flat arena indexed
//! by [`InteractionId`]; [`Interaction`] is a borrowed view of one node.
//!
//! Only the root stores its requester. Every other node's requester is its
//! parent's responder, so the call-tree invariant holds by construction.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::actor::Actor;
use crate::address::MessageSide;
use crate::id::InteractionId;
use crate::message::Message;

#[derive(Debug, Clone)]
pub(crate) struct InteractionNode {
    responder: Actor,
    request: Arc<dyn Message>,
    response: Arc<dyn Message>,
    tags: BTreeSet<String>,
    parent: Option<InteractionId>,
    children: SmallVec<[InteractionId; 4]>,
}

/// A flow's call tree. Never empty once built; the root is `InteractionId(0)`.
#[derive(Debug, Clone)]
pub struct InteractionTree {
    requester: Actor,
    nodes: Vec<InteractionNode>,
}

impl InteractionTree {
    pub(crate) fn new(requester: Actor) -> Self {
        InteractionTree {
            requester,
            nodes: Vec::new(),
        }
    }

    /// Appends a node under `parent` (or as the root when `parent` is `None`).
    pub(crate) fn push(
        &mut self,
        parent: Option<InteractionId>,
        responder: Actor,
        request: Arc<dyn Message>,
        response: Arc<dyn Message>,
        tags: BTreeSet<String>,
    ) -> InteractionId {
        let id = InteractionId(self.nodes.len() as u32);
        self.nodes.push(InteractionNode {
            responder,
            request,
            response,
            tags,
            parent,
            children: SmallVec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    pub fn root(&self) -> Interaction<'_> {
        Interaction {
            tree: self,
            id: InteractionId::ROOT,
        }
    }

    pub fn get(&self, id: InteractionId) -> Option<Interaction<'_>> {
        (id.index() < self.nodes.len()).then_some(Interaction { tree: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every interaction, depth-first, parents before children.
    pub fn preorder(&self) -> Vec<Interaction<'_>> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if !self.nodes.is_empty() {
            self.root().collect_preorder(&mut out);
        }
        out
    }

    /// Messages in the order they would be transmitted: a request, then each
    /// child call in full, then the matching response.
    pub fn chronology(&self) -> Vec<(InteractionId, MessageSide)> {
        fn walk(ntr: Interaction<'_>, out: &mut Vec<(InteractionId, MessageSide)>) {
            out.push((ntr.id, MessageSide::Request));
            for child in ntr.children() {
                walk(child, out);
            }
            out.push((ntr.id, MessageSide::Response));
        }

        let mut out = Vec::with_capacity(self.nodes.len() * 2);
        if !self.nodes.is_empty() {
            walk(self.root(), &mut out);
        }
        out
    }

    /// Indented `requester -> responder` lines, one per interaction.
    pub fn render(&self) -> String {
        self.preorder()
            .iter()
            .map(|ntr| {
                let indent = "  ".repeat(ntr.depth());
                if ntr.tags().is_empty() {
                    format!("{indent}{ntr:?}")
                } else {
                    let tags: Vec<&str> = ntr.tags().iter().map(String::as_str).collect();
                    format!("{indent}{ntr:?} [{}]", tags.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Borrowed view of one node in an [`InteractionTree`].
#[derive(Clone, Copy)]
pub struct Interaction<'f> {
    tree: &'f InteractionTree,
    id: InteractionId,
}

impl<'f> Interaction<'f> {
    fn node(&self) -> &'f InteractionNode {
        &self.tree.nodes[self.id.index()]
    }

    pub fn id(&self) -> InteractionId {
        self.id
    }

    pub fn requester(&self) -> &'f Actor {
        match self.node().parent {
            Some(parent) => &self.tree.nodes[parent.index()].responder,
            None => &self.tree.requester,
        }
    }

    pub fn responder(&self) -> &'f Actor {
        &self.node().responder
    }

    pub fn request(&self) -> &'f dyn Message {
        self.node().request.as_ref()
    }

    pub fn response(&self) -> &'f dyn Message {
        self.node().response.as_ref()
    }

    pub fn message(&self, side: MessageSide) -> &'f dyn Message {
        match side {
            MessageSide::Request => self.request(),
            MessageSide::Response => self.response(),
        }
    }

    pub(crate) fn shared_message(&self, side: MessageSide) -> &'f Arc<dyn Message> {
        match side {
            MessageSide::Request => &self.node().request,
            MessageSide::Response => &self.node().response,
        }
    }

    pub fn tags(&self) -> &'f BTreeSet<String> {
        &self.node().tags
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    pub fn parent(&self) -> Option<Interaction<'f>> {
        let tree = self.tree;
        self.node().parent.map(|id| Interaction { tree, id })
    }

    pub fn children(&self) -> impl Iterator<Item = Interaction<'f>> + 'f {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&id| Interaction { tree, id })
    }

    /// Number of ancestors; zero for the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent();
        while let Some(parent) = cursor {
            depth += 1;
            cursor = parent.parent();
        }
        depth
    }

    fn collect_preorder(self, out: &mut Vec<Interaction<'f>>) {
        out.push(self);
        for child in self.children() {
            child.collect_preorder(out);
        }
    }
}

impl fmt::Debug for Interaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.requester(), self.responder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Text;

    fn msg(text: &str) -> Arc<dyn Message> {
        Arc::new(Text::new().with("text", text))
    }

    /// AVA -> BEN, with BEN -> CHE and BEN -> DAN nested underneath.
    fn tree() -> (InteractionTree, [Actor; 4]) {
        let actors = [
            Actor::new("AVA"),
            Actor::new("BEN"),
            Actor::new("CHE"),
            Actor::new("DAN"),
        ];
        let mut tree = InteractionTree::new(actors[0].clone());
        let root = tree.push(None, actors[1].clone(), msg("a"), msg("b"), BTreeSet::new());
        tree.push(
            Some(root),
            actors[2].clone(),
            msg("c"),
            msg("d"),
            ["cheese".to_string()].into(),
        );
        tree.push(Some(root), actors[3].clone(), msg("e"), msg("f"), BTreeSet::new());
        (tree, actors)
    }

    #[test]
    fn child_requester_is_parent_responder() {
        let (tree, actors) = tree();
        let root = tree.root();
        assert_eq!(root.requester(), &actors[0]);
        for child in root.children() {
            assert_eq!(child.requester(), &actors[1]);
            assert_eq!(child.parent().unwrap().id(), root.id());
        }
    }

    #[test]
    fn chronology_nests_children_between_request_and_response() {
        let (tree, _) = tree();
        let order: Vec<String> = tree
            .chronology()
            .into_iter()
            .map(|(id, side)| {
                let text = tree.get(id).unwrap().message(side).get("text").unwrap();
                text.as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(order, ["a", "c", "d", "e", "f", "b"]);
    }

    #[test]
    fn preorder_and_depth() {
        let (tree, _) = tree();
        let depths: Vec<usize> = tree.preorder().iter().map(|i| i.depth()).collect();
        assert_eq!(depths, [0, 1, 1]);
        assert!(tree.get(InteractionId(3)).is_none());
    }

    proptest::proptest! {
        #[test]
        fn chronology_brackets_every_subtree(
            parents in proptest::collection::vec(0usize..16, 0..16)
        ) {
            let actor = Actor::new("ACT");
            let mut tree = InteractionTree::new(actor.clone());
            tree.push(None, actor.clone(), msg("q"), msg("r"), BTreeSet::new());
            for (i, parent) in parents.iter().enumerate() {
                // Node i + 1 hangs under some earlier node.
                let parent = InteractionId((parent % (i + 1)) as u32);
                tree.push(Some(parent), actor.clone(), msg("q"), msg("r"), BTreeSet::new());
            }

            let order = tree.chronology();
            proptest::prop_assert_eq!(order.len(), tree.len() * 2);
            let at = |id, side| order.iter().position(|&e| e == (id, side)).unwrap();
            for ntr in tree.preorder() {
                let (open, close) = (at(ntr.id(), MessageSide::Request), at(ntr.id(), MessageSide::Response));
                proptest::prop_assert!(open < close);
                if let Some(parent) = ntr.parent() {
                    proptest::prop_assert!(at(parent.id(), MessageSide::Request) < open);
                    proptest::prop_assert!(close < at(parent.id(), MessageSide::Response));
                }
            }
        }
    }

    #[test]
    fn render_indents_children() {
        let (tree, _) = tree();
        assert_eq!(
            tree.render(),
            "AVA -> BEN\n  BEN -> CHE [cheese]\n  BEN -> DAN"
        );
    }
}
