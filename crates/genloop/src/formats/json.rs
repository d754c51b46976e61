use std::sync::Arc;

use serde_json::{json, Value};

use super::{extract_json, schema_text, FormatConfig, FormatDef, FormatError, Formatter};
use crate::models::message::Message;
use crate::prompt_template::load_prompt_file;
use crate::streaming::GenerateResponseChunk;

/// A single JSON value, optionally conforming to a schema
pub struct JsonFormat {
    config: FormatConfig,
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self {
            config: FormatConfig {
                format: Some("json".to_string()),
                content_type: Some("application/json".to_string()),
                constrained: Some(true),
                default_instructions: Some(false),
            },
        }
    }
}

impl FormatDef for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn config(&self) -> &FormatConfig {
        &self.config
    }

    fn create(&self, schema: Option<&Value>) -> Result<Arc<dyn Formatter>, FormatError> {
        let instructions = schema
            .map(|schema| load_prompt_file("json.md", &json!({"schema": schema_text(schema)})))
            .transpose()?;
        Ok(Arc::new(JsonFormatter { instructions }))
    }
}

#[derive(Debug)]
pub struct JsonFormatter {
    instructions: Option<String>,
}

impl Formatter for JsonFormatter {
    fn instructions(&self) -> Option<String> {
        self.instructions.clone()
    }

    fn parse_message(&self, message: &Message) -> Result<Value, FormatError> {
        extract_json(&message.text()).ok_or(FormatError::NoJson)
    }

    fn parse_chunk(&self, chunk: &GenerateResponseChunk) -> Option<Value> {
        extract_json(&chunk.accumulated_text())
    }
}
