use std::sync::Arc;

use serde_json::Value;

use super::{FormatConfig, FormatDef, FormatError, Formatter};
use crate::models::message::Message;
use crate::streaming::GenerateResponseChunk;

/// Plain text output
pub struct TextFormat {
    config: FormatConfig,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            config: FormatConfig {
                format: Some("text".to_string()),
                content_type: Some("text/plain".to_string()),
                ..Default::default()
            },
        }
    }
}

impl FormatDef for TextFormat {
    fn name(&self) -> &str {
        "text"
    }

    fn config(&self) -> &FormatConfig {
        &self.config
    }

    fn create(&self, _schema: Option<&Value>) -> Result<Arc<dyn Formatter>, FormatError> {
        Ok(Arc::new(TextFormatter))
    }
}

#[derive(Debug)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn instructions(&self) -> Option<String> {
        None
    }

    fn parse_message(&self, message: &Message) -> Result<Value, FormatError> {
        Ok(Value::String(message.text()))
    }

    fn parse_chunk(&self, chunk: &GenerateResponseChunk) -> Option<Value> {
        Some(Value::String(chunk.text()))
    }
}
