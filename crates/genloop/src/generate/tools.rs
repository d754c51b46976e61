use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{GenerateError, GenerateResult, ToolError};
use crate::models::message::Message;
use crate::models::part::ToolRequest;
use crate::models::request::GenerateRequest;
use crate::registry::ActionLookup;
use crate::tool::{exposed_name, Tool};

/// Outcome of executing the tool requests in a model message
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResolution {
    /// Every tool answered; the message holds one tool response per request, in request order
    Responses(Message),
    /// At least one tool interrupted; the model message revised with each request's outcome
    Interrupted(Message),
}

/// Execute every tool request in `message` with the tools `request` makes available
pub async fn resolve_tool_requests(
    lookup: &dyn ActionLookup,
    request: &GenerateRequest,
    message: &Message,
) -> GenerateResult<ToolResolution> {
    let mut available: HashMap<&str, Arc<dyn Tool>> = HashMap::new();
    for name in &request.tools {
        if let Some(tool) = lookup.lookup_tool(name) {
            available.insert(exposed_name(name), tool.clone());
            available.insert(name.as_str(), tool);
        }
    }

    let mut calls: Vec<(usize, &ToolRequest, Arc<dyn Tool>)> = Vec::new();
    for (index, part) in message.content.iter().enumerate() {
        let Some(tool_request) = part.as_tool_request() else {
            continue;
        };
        let tool = available
            .get(tool_request.name.as_str())
            .cloned()
            .ok_or_else(|| GenerateError::ToolResolution(tool_request.name.clone()))?;
        calls.push((index, tool_request, tool));
    }

    debug!(count = calls.len(), "dispatching tool calls");
    let futures: Vec<_> = calls
        .iter()
        .map(|(_, tool_request, tool)| tool.call(tool_request.input.clone()))
        .collect();
    // Run concurrently, results come back in request order
    let outputs = join_all(futures).await;

    let mut responses = Message::tool();
    let mut outcomes: Vec<(usize, &'static str, Value)> = Vec::with_capacity(calls.len());
    let mut interrupted = false;
    for ((index, tool_request, tool), output) in calls.iter().zip(outputs) {
        match output {
            Ok(output) => {
                debug!(tool = tool.name(), "tool call completed");
                outcomes.push((*index, "pendingOutput", output.clone()));
                responses = responses.with_tool_response(
                    tool_request.name.clone(),
                    tool_request.reference.as_deref(),
                    output,
                );
            }
            Err(ToolError::Interrupt(metadata)) => {
                warn!(tool = tool.name(), "tool call interrupted");
                interrupted = true;
                let metadata = if metadata.is_null() { json!(true) } else { metadata };
                outcomes.push((*index, "interrupt", metadata));
            }
            Err(source) => {
                return Err(GenerateError::ToolExecution {
                    name: tool_request.name.clone(),
                    source,
                })
            }
        }
    }

    if !interrupted {
        return Ok(ToolResolution::Responses(responses));
    }

    let mut revised = message.clone();
    for (index, key, value) in outcomes {
        let part = revised.content[index].clone().with_metadata(key, value);
        revised.content[index] = part;
    }
    Ok(ToolResolution::Interrupted(revised))
}
