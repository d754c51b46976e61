use std::sync::Arc;

use serde_json::{json, Value};

use super::{schema_text, schema_type, FormatConfig, FormatDef, FormatError, Formatter};
use crate::models::message::Message;
use crate::prompt_template::load_prompt_file;
use crate::streaming::GenerateResponseChunk;

/// Newline-delimited JSON objects
pub struct JsonlFormat {
    config: FormatConfig,
}

impl Default for JsonlFormat {
    fn default() -> Self {
        Self {
            config: FormatConfig {
                format: Some("jsonl".to_string()),
                content_type: Some("application/jsonl".to_string()),
                ..Default::default()
            },
        }
    }
}

impl FormatDef for JsonlFormat {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn config(&self) -> &FormatConfig {
        &self.config
    }

    fn create(&self, schema: Option<&Value>) -> Result<Arc<dyn Formatter>, FormatError> {
        let Some(schema) = schema else {
            return Ok(Arc::new(JsonlFormatter { instructions: None }));
        };

        let items = schema.get("items");
        if schema_type(schema) != Some("array") || items.and_then(schema_type) != Some("object") {
            return Err(FormatError::InvalidSchema {
                format: self.name().to_string(),
                reason: "schema must be an 'array' of 'object' items".to_string(),
            });
        }

        let item_schema = items.cloned().unwrap_or(Value::Null);
        let instructions =
            load_prompt_file("jsonl.md", &json!({"schema": schema_text(&item_schema)}))?;
        Ok(Arc::new(JsonlFormatter {
            instructions: Some(instructions),
        }))
    }
}

#[derive(Debug)]
pub struct JsonlFormatter {
    instructions: Option<String>,
}

fn object_lines<'a>(lines: impl Iterator<Item = &'a str>) -> impl Iterator<Item = &'a str> {
    lines.map(str::trim).filter(|line| line.starts_with('{'))
}

impl Formatter for JsonlFormatter {
    fn instructions(&self) -> Option<String> {
        self.instructions.clone()
    }

    fn parse_message(&self, message: &Message) -> Result<Value, FormatError> {
        let text = message.text();
        object_lines(text.lines())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| FormatError::InvalidOutput(e.to_string()))
            })
            .collect::<Result<Vec<Value>, _>>()
            .map(Value::Array)
    }

    fn parse_chunk(&self, chunk: &GenerateResponseChunk) -> Option<Value> {
        let text = chunk.accumulated_text();
        // Only lines terminated by a newline are complete
        let complete = match text.rfind('\n') {
            Some(end) => &text[..end],
            None => return None,
        };
        let items: Vec<Value> = object_lines(complete.lines())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        Some(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::response::ResponseChunk;
    use indoc::indoc;

    fn schema() -> Value {
        json!({
            "type": "array",
            "items": {"type": "object", "properties": {"id": {"type": "number"}}}
        })
    }

    #[test]
    fn test_requires_array_of_objects() {
        let strings = json!({"type": "array", "items": {"type": "string"}});
        let result = JsonlFormat::default().create(Some(&strings));
        assert!(matches!(result, Err(FormatError::InvalidSchema { .. })));
        let formatter = JsonlFormat::default().create(Some(&schema())).unwrap();
        assert!(formatter.instructions().unwrap().contains("JSONL format"));
    }

    #[test]
    fn test_parse_message_skips_non_object_lines() {
        let formatter = JsonlFormat::default().create(Some(&schema())).unwrap();
        let message = Message::model().with_text(indoc! {r#"
            Here are the rows:
            {"id": 1}
            {"id": 2}
        "#});
        assert_eq!(
            formatter.parse_message(&message).unwrap(),
            json!([{"id": 1}, {"id": 2}])
        );
    }

    #[test]
    fn test_parse_chunk_ignores_unterminated_line() {
        let formatter = JsonlFormat::default().create(None).unwrap();
        let chunk = GenerateResponseChunk::new(
            ResponseChunk::text("{\"id\": 2}\n{\"id\""),
            vec![ResponseChunk::text("{\"id\": 1}\n")],
            None,
        );
        assert_eq!(formatter.parse_chunk(&chunk), Some(json!([{"id": 1}, {"id": 2}])));
    }
}
