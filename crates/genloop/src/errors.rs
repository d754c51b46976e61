use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::models::request::ModelRequest;
use crate::models::response::GenerateResponse;

/// Coarse status code carried by every error, for callers mapping errors onto their own transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Aborted,
    Internal,
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tool not found: {0}")]
    ToolResolution(String),

    #[error("Tool {name} failed: {source}")]
    ToolExecution {
        name: String,
        #[source]
        source: ToolError,
    },

    #[error("Output does not conform to schema: {}", .errors.join("; "))]
    SchemaValidation {
        errors: Vec<String>,
        response: Box<GenerateResponse>,
    },

    #[error("Exceeded maximum tool call iterations ({max_turns})")]
    Aborted {
        max_turns: u32,
        response: Box<GenerateResponse>,
        request: Box<ModelRequest>,
    },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Model error: {0}")]
    Model(#[from] anyhow::Error),
}

impl GenerateError {
    pub fn status(&self) -> Status {
        match self {
            GenerateError::Configuration(_) => Status::InvalidArgument,
            GenerateError::ToolResolution(_) => Status::NotFound,
            GenerateError::ToolExecution { .. } => Status::Internal,
            GenerateError::SchemaValidation { .. } => Status::FailedPrecondition,
            GenerateError::Aborted { .. } => Status::Aborted,
            GenerateError::InvalidResponse(_) => Status::FailedPrecondition,
            GenerateError::Model(_) => Status::Internal,
        }
    }

    /// The response that was produced before the failure, if any
    pub fn response(&self) -> Option<&GenerateResponse> {
        match self {
            GenerateError::SchemaValidation { response, .. }
            | GenerateError::Aborted { response, .. } => Some(response),
            _ => None,
        }
    }
}

pub type GenerateResult<T> = Result<T, GenerateError>;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    /// Not a failure: the tool asks the loop to pause and hand control back to the caller
    #[error("Tool interrupted")]
    Interrupt(Value),
}

pub type ToolResult<T> = Result<T, ToolError>;
