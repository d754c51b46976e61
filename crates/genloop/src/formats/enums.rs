use std::sync::Arc;

use serde_json::{json, Value};

use super::{schema_type, FormatConfig, FormatDef, FormatError, Formatter};
use crate::models::message::Message;
use crate::prompt_template::load_prompt_file;
use crate::streaming::GenerateResponseChunk;

/// Exactly one value out of a fixed set
pub struct EnumFormat {
    config: FormatConfig,
}

impl Default for EnumFormat {
    fn default() -> Self {
        Self {
            config: FormatConfig {
                format: Some("enum".to_string()),
                content_type: Some("text/enum".to_string()),
                constrained: Some(true),
                default_instructions: None,
            },
        }
    }
}

impl FormatDef for EnumFormat {
    fn name(&self) -> &str {
        "enum"
    }

    fn config(&self) -> &FormatConfig {
        &self.config
    }

    fn create(&self, schema: Option<&Value>) -> Result<Arc<dyn Formatter>, FormatError> {
        let Some(schema) = schema else {
            return Ok(Arc::new(EnumFormatter { instructions: None }));
        };

        if !matches!(schema_type(schema), Some("string") | Some("enum")) {
            return Err(FormatError::InvalidSchema {
                format: self.name().to_string(),
                reason: "schema type must be 'string' or 'enum'".to_string(),
            });
        }

        let instructions = match schema.get("enum").and_then(Value::as_array) {
            Some(values) => {
                let values: Vec<String> = values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                Some(load_prompt_file("enum.md", &json!({"values": values}))?)
            }
            None => None,
        };
        Ok(Arc::new(EnumFormatter { instructions }))
    }
}

#[derive(Debug)]
pub struct EnumFormatter {
    instructions: Option<String>,
}

impl Formatter for EnumFormatter {
    fn instructions(&self) -> Option<String> {
        self.instructions.clone()
    }

    fn parse_message(&self, message: &Message) -> Result<Value, FormatError> {
        let text: String = message
            .text()
            .chars()
            .filter(|c| *c != '"' && *c != '\'')
            .collect();
        Ok(Value::String(text.trim().to_string()))
    }

    fn parse_chunk(&self, _chunk: &GenerateResponseChunk) -> Option<Value> {
        None
    }
}
