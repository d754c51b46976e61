use std::sync::Arc;

use crate::models::request::{GenerateRequest, ModelRequest, OutputConfig};
use crate::tool::{to_tool_definition, Tool};

/// Build the request a model backend sees for one turn
pub fn to_model_request(request: &GenerateRequest, tools: &[Arc<dyn Tool>]) -> ModelRequest {
    let output = request
        .output
        .as_ref()
        .map(|output| OutputConfig {
            format: output.format.clone(),
            schema: output.json_schema.clone(),
            constrained: output.constrained,
            content_type: output.content_type.clone(),
        })
        .unwrap_or_default();

    ModelRequest {
        messages: request.messages.clone(),
        config: request.config.clone().unwrap_or_default(),
        docs: request.docs.clone(),
        tools: tools.iter().map(|tool| to_tool_definition(tool.as_ref())).collect(),
        tool_choice: request.tool_choice,
        output,
    }
}
