//! The call traversal used to describe interaction trees.
//!
//! A [`Call`] is a cursor over one interaction being described. Nested calls
//! are described by a step closure that receives a fresh `Call` and must
//! hand that same `Call` back. Each `Call` carries an origin token, so a step
//! that returns some other `Call` is caught instead of silently dropping
//! whatever was set on the one it was given.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::actor::Actor;
use crate::error::CoreError;
use crate::message::Message;
use crate::metadata::Trace;
use crate::mutable::MutableInteraction;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct Call {
    token: u64,
    node: MutableInteraction,
    error: Option<CoreError>,
}

impl Default for Call {
    fn default() -> Self {
        Call {
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            node: MutableInteraction::new(),
            error: None,
        }
    }
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    /// A call whose requester is already fixed to the parent's responder.
    pub(crate) fn under(requester: Option<&Actor>) -> Self {
        let mut call = Self::new();
        if let Some(requester) = requester {
            call.node.set_requester(requester);
        }
        call
    }

    /// Sets the requester. Only meaningful on a root call; nested calls
    /// always originate from their parent's responder.
    pub fn from(mut self, requester: &Actor) -> Self {
        self.node.set_requester(requester);
        self
    }

    pub fn to(mut self, responder: &Actor) -> Self {
        self.node.set_responder(responder);
        self
    }

    pub fn request(mut self, message: impl Message + 'static) -> Self {
        self.node.set_request(message);
        self
    }

    pub fn response(mut self, message: impl Message + 'static) -> Self {
        self.node.set_response(message);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node.add_tags(tags);
        self
    }

    /// Describes a nested call from this call's responder. Errors inside the
    /// step are carried along and reported when the flow is built.
    #[track_caller]
    pub fn call(mut self, step: impl FnOnce(Call) -> Call) -> Self {
        let child = Call::under(self.node.responder());
        match Self::traverse(child, step) {
            Ok(child) => {
                self.node.add_child(child);
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Runs `step` on `origin` and checks that the same call came back.
    #[track_caller]
    pub(crate) fn traverse(
        origin: Call,
        step: impl FnOnce(Call) -> Call,
    ) -> Result<MutableInteraction, CoreError> {
        let token = origin.token;
        let location = Trace::here();
        let returned = step(origin);
        if returned.token != token {
            return Err(CoreError::FailedToReturnToOrigin {
                location: location.to_string(),
            });
        }
        match returned.error {
            Some(e) => Err(e),
            None => Ok(returned.node),
        }
    }
}
