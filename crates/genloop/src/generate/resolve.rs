use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{GenerateError, GenerateResult};
use crate::formats::FormatDef;
use crate::models::request::GenerateRequest;
use crate::providers::base::Model;
use crate::registry::ActionLookup;
use crate::tool::{exposed_name, Tool};

/// The actions a request names, resolved for one turn
pub struct ResolvedParameters {
    pub model: Arc<dyn Model>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub format: Option<Arc<dyn FormatDef>>,
}

/// Resolve the model, tools and output format a request refers to
pub fn resolve_parameters(
    lookup: &dyn ActionLookup,
    request: &GenerateRequest,
) -> GenerateResult<ResolvedParameters> {
    let model_name = request
        .model
        .as_deref()
        .or_else(|| lookup.default_model())
        .ok_or_else(|| {
            GenerateError::Configuration(
                "No model specified and no default model configured".to_string(),
            )
        })?;
    let model = lookup
        .lookup_model(model_name)
        .ok_or_else(|| GenerateError::Configuration(format!("Model {model_name} not found")))?;

    let mut tools = Vec::with_capacity(request.tools.len());
    let mut exposed: HashMap<&str, &str> = HashMap::new();
    for name in &request.tools {
        let tool = lookup
            .lookup_tool(name)
            .ok_or_else(|| GenerateError::Configuration(format!("Unable to resolve tool {name}")))?;
        if let Some(other) = exposed.insert(exposed_name(name), name.as_str()) {
            if other != name.as_str() {
                return Err(GenerateError::Configuration(format!(
                    "Tools {other} and {name} are both exposed as {}",
                    exposed_name(name)
                )));
            }
        }
        tools.push(tool);
    }

    let format = match request.output.as_ref().and_then(|o| o.format.as_deref()) {
        Some(name) => Some(lookup.lookup_format(name).ok_or_else(|| {
            GenerateError::Configuration(format!("Unsupported format: {name}"))
        })?),
        None => None,
    };

    Ok(ResolvedParameters {
        model,
        tools,
        format,
    })
}
