use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::part::{Part, ToolRequest, ToolResponse};
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from a model
pub struct Message {
    pub role: Role,
    pub content: Vec<Part>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Message {
            role,
            content: Vec::new(),
        }
    }

    /// Create a new user message
    pub fn user() -> Self {
        Self::new(Role::User)
    }

    /// Create a new model message
    pub fn model() -> Self {
        Self::new(Role::Model)
    }

    /// Create a new tool message
    pub fn tool() -> Self {
        Self::new(Role::Tool)
    }

    /// Create a new system message
    pub fn system() -> Self {
        Self::new(Role::System)
    }

    /// Add any Part to the message
    pub fn with_content(mut self, content: Part) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(Part::text(text))
    }

    /// Add a tool request to the message
    pub fn with_tool_request<N: Into<String>>(
        self,
        name: N,
        reference: Option<&str>,
        input: Value,
    ) -> Self {
        self.with_content(Part::tool_request(name, reference, input))
    }

    /// Add a tool response to the message
    pub fn with_tool_response<N: Into<String>>(
        self,
        name: N,
        reference: Option<&str>,
        output: Value,
    ) -> Self {
        self.with_content(Part::tool_response(name, reference, output))
    }

    /// Concatenate all text parts
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .concat()
    }

    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.content
            .iter()
            .filter_map(Part::as_tool_request)
            .collect()
    }

    pub fn tool_responses(&self) -> Vec<&ToolResponse> {
        self.content
            .iter()
            .filter_map(Part::as_tool_response)
            .collect()
    }

    pub fn has_tool_requests(&self) -> bool {
        self.content.iter().any(|p| p.as_tool_request().is_some())
    }
}
