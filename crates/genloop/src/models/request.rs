use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::Document;
use super::message::Message;
use super::tool::ToolDefinition;

/// How the model may choose among the offered tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    Required,
    None,
}

/// Caller control over format instructions: a toggle, or the literal text to inject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instructions {
    Toggle(bool),
    Custom(String),
}

/// Output options as supplied by the caller
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    /// Name of the format used to instruct and parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constrained: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Instructions>,
}

impl OutputOptions {
    /// Whether the caller explicitly asked for instructions to be injected
    pub fn requests_instructions(&self) -> bool {
        match &self.instructions {
            Some(Instructions::Toggle(enabled)) => *enabled,
            Some(Instructions::Custom(text)) => !text.is_empty(),
            None => false,
        }
    }
}

/// A generation request as supplied by the caller
///
/// Models, tools and formats are referenced by name and resolved on every turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub return_tool_requests: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl GenerateRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tool<S: Into<String>>(mut self, tool: S) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_doc(mut self, doc: Document) -> Self {
        self.docs.push(doc);
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_return_tool_requests(mut self, return_tool_requests: bool) -> Self {
        self.return_tool_requests = return_tool_requests;
        self
    }
}

/// Output configuration as seen by a model backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constrained: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// The normalized request handed to a model backend for a single turn
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<Document>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instructions_deserialize_from_bool_or_string() {
        let output: OutputOptions =
            serde_json::from_value(json!({"format": "json", "instructions": false})).unwrap();
        assert_eq!(output.instructions, Some(Instructions::Toggle(false)));
        assert!(!output.requests_instructions());

        let output: OutputOptions =
            serde_json::from_value(json!({"instructions": "Reply in JSON"})).unwrap();
        assert_eq!(
            output.instructions,
            Some(Instructions::Custom("Reply in JSON".to_string()))
        );
        assert!(output.requests_instructions());
    }

    #[test]
    fn test_empty_custom_instructions_do_not_count() {
        let output = OutputOptions {
            instructions: Some(Instructions::Custom(String::new())),
            ..Default::default()
        };
        assert!(!output.requests_instructions());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: GenerateRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}],
            "maxTurns": 3
        }))
        .unwrap();
        assert_eq!(request.max_turns, Some(3));
        assert!(request.tools.is_empty());
        assert!(!request.return_tool_requests);
        assert_eq!(request.messages[0].text(), "hi");
    }
}
