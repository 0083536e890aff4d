//! The message boundary.
//!
//! Message encodings live outside this crate. The core only needs to read and
//! write opaque field paths, copy a message, and render it for diagnostics.
//! [`Text`] is a small key/value implementation for authoring and tests.

use std::fmt;

use indexmap::IndexMap;

/// Field values moved between messages by dependencies.
pub type Value = serde_json::Value;

/// A request or response payload.
///
/// Field-path syntax is owned entirely by the implementation; the core treats
/// paths as opaque strings.
pub trait Message: fmt::Debug + Send + Sync {
    /// Reads the value at `field`, or `None` if the path does not exist.
    fn get(&self, field: &str) -> Option<Value>;

    /// Writes `value` at `field`.
    fn set(&mut self, field: &str, value: Value);

    /// An independent mutable copy of this message.
    fn child(&self) -> Box<dyn Message>;

    /// Human-readable rendering, used in diagnostics.
    fn content(&self) -> String;
}

/// Insertion-ordered key/value message. Each field path is a plain key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
    fields: IndexMap<String, Value>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Message for Text {
    fn get(&self, field: &str) -> Option<Value> {
        self.fields.get(field).cloned()
    }

    fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    fn child(&self) -> Box<dyn Message> {
        Box::new(self.clone())
    }

    fn content(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}: {s}"),
                other => format!("{k}: {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_and_set() {
        let mut msg = Text::new().with("text", "hello");
        assert_eq!(msg.get("text"), Some(json!("hello")));
        assert_eq!(msg.get("missing"), None);

        msg.set("count", json!(3));
        assert_eq!(msg.get("count"), Some(json!(3)));
        assert_eq!(msg.len(), 2);
    }

    #[test]
    fn child_is_independent() {
        let original = Text::new().with("text", "hello");
        let mut copy = original.child();
        copy.set("text", json!("changed"));

        assert_eq!(original.get("text"), Some(json!("hello")));
        assert_eq!(copy.get("text"), Some(json!("changed")));
    }

    #[test]
    fn content_renders_fields_in_order() {
        let msg = Text::new().with("b", "two").with("a", 1);
        assert_eq!(msg.content(), "b: two\na: 1");
    }
}
