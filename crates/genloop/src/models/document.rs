use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::part::Part;
use super::Metadata;

/// An auxiliary document supplied as grounding context for a generation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub content: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Document {
    pub fn from_text<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![Part::text(text)],
            metadata: None,
        }
    }

    pub fn with_metadata<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value);
        self
    }

    /// Concatenate all text parts
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .concat()
    }

    /// The key a citation should use, from `ref` or `id` metadata
    pub fn citation_key(&self) -> Option<String> {
        let metadata = self.metadata.as_ref()?;
        ["ref", "id"].iter().find_map(|key| match metadata.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}
