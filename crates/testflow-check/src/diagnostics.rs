//! Graph-consistency violations.
//!
//! [`Violation`] describes one defect found after assembly. Violations are
//! returned as data, never raised: a model that contains them can still be
//! built, inspected and reported on.

use serde::{Deserialize, Serialize};

use testflow_core::MessageSide;
use testflow_model::TagSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Violation {
    /// Flows that transitively depend on themselves. Each flow depends on
    /// the next; the last depends on the first.
    #[error("dependency loop: {path}", path = render_loop(.flows))]
    Loop {
        /// Identities of the flows forming the loop.
        flows: Vec<String>,
    },

    /// A dependency within one flow copies a value from a message that is
    /// transmitted no earlier than the message it writes to.
    #[error(
        "causality violation in '{flow}' at {trace}: {source_side} {source_index} ('{field}') \
         does not precede {sink_side} {sink_index}\n--- source ---\n{source_content}\n--- sink ---\n{sink_content}"
    )]
    Chronology {
        flow: String,
        trace: String,
        field: String,
        source_side: MessageSide,
        /// Position of the source message in the flow's transmission order.
        source_index: usize,
        sink_side: MessageSide,
        sink_index: usize,
        source_content: String,
        sink_content: String,
    },

    /// A model's declared tag summary differs from its flows' real tags.
    #[error("tag summary of model '{model}' is {declared:?}, but its flows carry {actual:?}")]
    TagSummary {
        model: String,
        declared: TagSummary,
        actual: TagSummary,
    },

    /// Several flows in one model share an identity.
    #[error("{count} flows in model '{model}' share the identity '{identity}'")]
    DuplicateIdentity {
        model: String,
        identity: String,
        count: usize,
    },
}

fn render_loop(flows: &[String]) -> String {
    let mut path = flows.to_vec();
    if let Some(first) = flows.first() {
        path.push(first.clone());
    }
    path.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_message_closes_the_cycle() {
        let v = Violation::Loop {
            flows: vec!["a []".into(), "b []".into()],
        };
        assert_eq!(v.to_string(), "dependency loop: a [] -> b [] -> a []");
    }

    #[test]
    fn violations_serialize() {
        let v = Violation::DuplicateIdentity {
            model: "shop".into(),
            identity: "order [cheese]".into(),
            count: 2,
        };
        let json = serde_json::to_string(&v).unwrap();
        let back: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(json.contains("DuplicateIdentity"));
    }
}
