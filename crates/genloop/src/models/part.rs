use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Metadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPart {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A model's request to invoke a named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRequest {
    pub name: String,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// The output of a tool invocation, matched to its request by name and reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub name: String,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPart {
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
/// Content carried inside a message, a document or a streamed chunk
pub enum Part {
    Text(TextPart),
    Media(MediaPart),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
    Data(DataPart),
}

impl Part {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Part::Text(TextPart {
            text: text.into(),
            metadata: None,
        })
    }

    pub fn media<S: Into<String>>(url: S, content_type: Option<String>) -> Self {
        Part::Media(MediaPart {
            url: url.into(),
            content_type,
            metadata: None,
        })
    }

    pub fn tool_request<N: Into<String>>(name: N, reference: Option<&str>, input: Value) -> Self {
        Part::ToolRequest(ToolRequest {
            name: name.into(),
            reference: reference.map(String::from),
            input,
            metadata: None,
        })
    }

    pub fn tool_response<N: Into<String>>(name: N, reference: Option<&str>, output: Value) -> Self {
        Part::ToolResponse(ToolResponse {
            name: name.into(),
            reference: reference.map(String::from),
            output,
            metadata: None,
        })
    }

    pub fn data(data: Value) -> Self {
        Part::Data(DataPart {
            data,
            metadata: None,
        })
    }

    /// Get the text content if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    pub fn as_tool_request(&self) -> Option<&ToolRequest> {
        if let Part::ToolRequest(ref tool_request) = self {
            Some(tool_request)
        } else {
            None
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        if let Part::ToolResponse(ref tool_response) = self {
            Some(tool_response)
        } else {
            None
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Part::Text(p) => p.metadata.as_ref(),
            Part::Media(p) => p.metadata.as_ref(),
            Part::ToolRequest(p) => p.metadata.as_ref(),
            Part::ToolResponse(p) => p.metadata.as_ref(),
            Part::Data(p) => p.metadata.as_ref(),
        }
    }

    fn metadata_mut(&mut self) -> &mut Option<Metadata> {
        match self {
            Part::Text(p) => &mut p.metadata,
            Part::Media(p) => &mut p.metadata,
            Part::ToolRequest(p) => &mut p.metadata,
            Part::ToolResponse(p) => &mut p.metadata,
            Part::Data(p) => &mut p.metadata,
        }
    }

    /// Set a single metadata key, keeping any others
    pub fn with_metadata<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata_mut()
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value);
        self
    }

    /// Look up a metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata().and_then(|m| m.get(key))
    }

    /// The `purpose` metadata tag, used to find injected instruction and context parts
    pub fn purpose(&self) -> Option<&str> {
        self.metadata_value("purpose").and_then(Value::as_str)
    }

    /// Whether this part is a placeholder that should be replaced when re-rendered
    pub fn is_pending(&self) -> bool {
        self.metadata_value("pending")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
