use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::ToolResult;
use crate::models::tool::ToolDefinition;
use crate::models::Metadata;

/// Core trait that defines a tool a model can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name the tool is registered under, possibly namespaced as `plugin/tool`
    fn name(&self) -> &str;

    /// A description of what the tool does, shown to the model
    fn description(&self) -> &str;

    /// Schema of the input the tool accepts
    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    fn output_schema(&self) -> Option<Value> {
        None
    }

    /// Call the tool with the input the model supplied
    ///
    /// Return `ToolError::Interrupt` to stop the loop and hand the pending request back to the
    /// caller.
    async fn call(&self, input: Value) -> ToolResult<Value>;
}

/// The name a registered tool is exposed under: the last `/`-separated segment
pub fn exposed_name(registered: &str) -> &str {
    registered
        .rsplit_once('/')
        .map_or(registered, |(_, short)| short)
}

/// Describe a tool for a model backend, shortening namespaced names
pub fn to_tool_definition(tool: &dyn Tool) -> ToolDefinition {
    let original_name = tool.name();
    let name = exposed_name(original_name);

    let metadata = (name != original_name).then(|| {
        let mut metadata = Metadata::new();
        metadata.insert("originalName".to_string(), json!(original_name));
        metadata
    });

    ToolDefinition {
        name: name.to_string(),
        description: tool.description().to_string(),
        input_schema: tool.input_schema(),
        output_schema: tool.output_schema(),
        metadata,
    }
}
