use std::sync::Arc;

use serde_json::{json, Value};

use super::{
    extract_items, schema_text, schema_type, FormatConfig, FormatDef, FormatError, Formatter,
};
use crate::models::message::Message;
use crate::prompt_template::load_prompt_file;
use crate::streaming::GenerateResponseChunk;

/// A JSON array whose items can be consumed as they complete
pub struct ArrayFormat {
    config: FormatConfig,
}

impl Default for ArrayFormat {
    fn default() -> Self {
        Self {
            config: FormatConfig {
                format: Some("array".to_string()),
                content_type: Some("application/json".to_string()),
                constrained: Some(true),
                default_instructions: None,
            },
        }
    }
}

impl FormatDef for ArrayFormat {
    fn name(&self) -> &str {
        "array"
    }

    fn config(&self) -> &FormatConfig {
        &self.config
    }

    fn create(&self, schema: Option<&Value>) -> Result<Arc<dyn Formatter>, FormatError> {
        if let Some(schema) = schema {
            if schema_type(schema) != Some("array") {
                return Err(FormatError::InvalidSchema {
                    format: self.name().to_string(),
                    reason: "schema type must be 'array'".to_string(),
                });
            }
        }
        let instructions = schema
            .map(|schema| load_prompt_file("array.md", &json!({"schema": schema_text(schema)})))
            .transpose()?;
        Ok(Arc::new(ArrayFormatter { instructions }))
    }
}

#[derive(Debug)]
pub struct ArrayFormatter {
    instructions: Option<String>,
}

impl Formatter for ArrayFormatter {
    fn instructions(&self) -> Option<String> {
        self.instructions.clone()
    }

    fn parse_message(&self, message: &Message) -> Result<Value, FormatError> {
        let text = message.text();
        if !text.contains('[') {
            return Err(FormatError::NoJson);
        }
        Ok(Value::Array(extract_items(&text)))
    }

    fn parse_chunk(&self, chunk: &GenerateResponseChunk) -> Option<Value> {
        let text = chunk.accumulated_text();
        text.contains('[')
            .then(|| Value::Array(extract_items(&text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::response::ResponseChunk;

    #[test]
    fn test_rejects_non_array_schema() {
        let result = ArrayFormat::default().create(Some(&json!({"type": "object"})));
        assert!(matches!(result, Err(FormatError::InvalidSchema { .. })));
    }

    #[test]
    fn test_parse_message_and_chunk() {
        let formatter = ArrayFormat::default()
            .create(Some(&json!({"type": "array", "items": {"type": "string"}})))
            .unwrap();
        assert!(formatter.instructions().unwrap().contains("JSON array"));

        let message = Message::model().with_text("[\"a\", \"b\"]");
        assert_eq!(formatter.parse_message(&message).unwrap(), json!(["a", "b"]));

        let chunk = GenerateResponseChunk::new(
            ResponseChunk::text("\"b\", \"c"),
            vec![ResponseChunk::text("[\"a\", ")],
            None,
        );
        assert_eq!(formatter.parse_chunk(&chunk), Some(json!(["a", "b"])));
    }
}
