//! Output formats
//!
//! A [`FormatDef`] is a named strategy for structured output. It declares how the request
//! should be configured (constrained decoding, content type, whether to inject instructions)
//! and creates a [`Formatter`] bound to the request's schema, which renders the instructions
//! and parses complete messages or streamed chunks.
pub mod array;
pub mod enums;
pub mod extract;
pub mod json;
pub mod jsonl;
pub mod text;

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::models::message::Message;
use crate::streaming::GenerateResponseChunk;

pub use extract::{extract_items, extract_json, parse_partial_json};

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Invalid schema for the {format} format: {reason}")]
    InvalidSchema { format: String, reason: String },

    #[error("No JSON found in output")]
    NoJson,

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("Failed to render format instructions: {0}")]
    Template(#[from] tera::Error),
}

/// Request directives a format applies unless the caller overrides them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatConfig {
    /// Wire-format hint passed on to the model backend
    pub format: Option<String>,
    pub content_type: Option<String>,
    pub constrained: Option<bool>,
    /// `Some(false)` keeps instructions out of the prompt unless the caller asks for them
    pub default_instructions: Option<bool>,
}

/// A named output format
pub trait FormatDef: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> &FormatConfig;

    /// Bind the format to the request's schema, if any
    fn create(&self, schema: Option<&Value>) -> Result<Arc<dyn Formatter>, FormatError>;
}

/// A format bound to a schema
pub trait Formatter: Send + Sync + Debug {
    /// Text to add to the prompt describing the expected output
    fn instructions(&self) -> Option<String>;

    fn parse_message(&self, message: &Message) -> Result<Value, FormatError>;

    /// Best-effort parse of everything streamed so far, `None` while nothing is usable
    fn parse_chunk(&self, chunk: &GenerateResponseChunk) -> Option<Value>;
}

/// The formats every registry starts with
pub fn builtin_formats() -> Vec<Arc<dyn FormatDef>> {
    vec![
        Arc::new(json::JsonFormat::default()),
        Arc::new(text::TextFormat::default()),
        Arc::new(array::ArrayFormat::default()),
        Arc::new(enums::EnumFormat::default()),
        Arc::new(jsonl::JsonlFormat::default()),
    ]
}

/// Compact schema text for instruction templates
pub(crate) fn schema_text(schema: &Value) -> String {
    schema.to_string()
}

pub(crate) fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}
