//! These models represent the objects passed around by the orchestrator
//!
//! There are two request shapes we need to interact with:
//! - the caller-facing [`request::GenerateRequest`], which names models, tools and formats
//! - the backend-facing [`request::ModelRequest`], which carries resolved tool definitions
//!
//! Conversation content is shared between the two: a [`message::Message`] is a role plus
//! an ordered list of [`part::Part`]s. Responses come back as a [`response::ModelResponse`]
//! per turn, or incrementally as [`response::ResponseChunk`]s when streaming.
pub mod document;
pub mod message;
pub mod part;
pub mod request;
pub mod response;
pub mod role;
pub mod tool;

/// Free-form metadata attached to parts, documents and tool definitions
pub type Metadata = serde_json::Map<String, serde_json::Value>;
