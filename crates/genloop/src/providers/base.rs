use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::middleware::RunContext;
use crate::models::request::ModelRequest;
use crate::models::response::ModelResponse;

/// Capabilities a model backend declares about itself
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSupports {
    pub multiturn: bool,
    pub media: bool,
    pub tools: bool,
    pub system_role: bool,
    pub tool_choice: bool,
    pub constrained: bool,
    /// The backend consumes `ModelRequest::docs` natively
    pub context: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelInfo {
    pub label: Option<String>,
    pub supports: ModelSupports,
}

/// Base trait for model backends (Gemini, OpenAI, Ollama, etc)
#[async_trait]
pub trait Model: Send + Sync {
    /// The name the model is registered under
    fn name(&self) -> &str;

    fn info(&self) -> ModelInfo {
        ModelInfo::default()
    }

    /// Generate the next message for the request
    ///
    /// Streaming backends forward each incremental chunk through `ctx.send_chunk`
    /// when `ctx.is_streaming()` and still return the complete response.
    async fn generate(&self, request: ModelRequest, ctx: RunContext) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_info_deserializes_partial_supports() -> Result<()> {
        let info: ModelInfo = serde_json::from_value(json!({
            "label": "Gemini 2.0 Flash",
            "supports": {"context": true, "tools": true}
        }))?;
        assert!(info.supports.context);
        assert!(info.supports.tools);
        assert!(!info.supports.media);
        Ok(())
    }
}
