use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use super::message::Message;
use super::part::{Part, ToolRequest};
use super::request::ModelRequest;
use super::role::Role;
use crate::formats::{extract_json, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<u32>,
        output_tokens: Option<u32>,
        total_tokens: Option<u32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Add another turn's usage; a count stays unknown only if it is unknown in both
    pub fn accumulate(&mut self, other: &Usage) {
        fn add(a: Option<u32>, b: Option<u32>) -> Option<u32> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                (a, b) => a.or(b),
            }
        }
        self.input_tokens = add(self.input_tokens, other.input_tokens);
        self.output_tokens = add(self.output_tokens, other.output_tokens);
        self.total_tokens = add(self.total_tokens, other.total_tokens);
    }
}

/// Why a model stopped producing output
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
    Blocked,
    Interrupted,
    Other,
    #[default]
    Unknown,
}

/// One model invocation's result, as returned by a backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default)]
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_message: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

impl ModelResponse {
    /// A response that stopped normally with the given message
    pub fn stop(message: Message) -> Self {
        Self {
            message: Some(message),
            finish_reason: FinishReason::Stop,
            finish_message: None,
            usage: Usage::default(),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// An incremental unit of a model's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseChunk {
    pub role: Role,
    /// Position of the message this chunk belongs to within the whole exchange
    #[serde(default)]
    pub index: u32,
    pub content: Vec<Part>,
}

impl ResponseChunk {
    /// A model chunk; its index is assigned when it is accumulated
    pub fn new(content: Vec<Part>) -> Self {
        Self {
            role: Role::Model,
            index: 0,
            content,
        }
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::new(vec![Part::text(text)])
    }

    /// Concatenate all text parts
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .concat()
    }
}

/// Finish details of a single turn of a multi-turn generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMetadata {
    pub turn: u32,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    /// Number of tool requests the model made in this turn
    pub tool_requests: usize,
}

/// The final result of a generation
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub message: Message,
    pub finish_reason: FinishReason,
    pub finish_message: Option<String>,
    /// Usage summed over all turns
    pub usage: Usage,
    /// The request sent to the model on the last turn
    pub request: ModelRequest,
    pub turns: Vec<TurnMetadata>,
    pub(crate) formatter: Option<Arc<dyn Formatter>>,
}

impl GenerateResponse {
    pub fn text(&self) -> String {
        self.message.text()
    }

    /// Structured output, parsed by the request's format or extracted from the text
    pub fn output(&self) -> Option<Value> {
        match &self.formatter {
            Some(formatter) => formatter.parse_message(&self.message).ok(),
            None => extract_json(&self.message.text()),
        }
    }

    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.message.tool_requests()
    }

    /// The full transcript: every message sent on the last turn plus the final message
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = self.request.messages.clone();
        messages.push(self.message.clone());
        messages
    }
}
