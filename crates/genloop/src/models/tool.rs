use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Metadata;

/// A tool as it is described to a model backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// The name exposed to the model
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// Schema of the input the tool accepts
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ToolDefinition {
    /// The name the tool was registered under, which differs from `name` for namespaced tools
    pub fn original_name(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("originalName"))
            .and_then(Value::as_str)
            .unwrap_or(&self.name)
    }
}
