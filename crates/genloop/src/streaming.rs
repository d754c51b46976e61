//! Streaming chunk accumulation
//!
//! A multi-turn generation streams the output of several model invocations plus the tool
//! responses between them. [`ChunkAccumulator`] turns those into one linear transcript for
//! the caller: every chunk gets the index of the message it belongs to and a snapshot of
//! everything streamed before it.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::formats::Formatter;
use crate::models::message::Message;
use crate::models::part::Part;
use crate::models::response::ResponseChunk;
use crate::models::role::Role;

/// Receives every chunk of a generation, in order
pub type StreamingCallback = Arc<dyn Fn(GenerateResponseChunk) + Send + Sync>;

/// A chunk as delivered to the caller
#[derive(Debug, Clone)]
pub struct GenerateResponseChunk {
    pub chunk: ResponseChunk,
    /// Every chunk streamed before this one in the same generation
    pub previous_chunks: Vec<ResponseChunk>,
    formatter: Option<Arc<dyn Formatter>>,
}

impl GenerateResponseChunk {
    pub fn new(
        chunk: ResponseChunk,
        previous_chunks: Vec<ResponseChunk>,
        formatter: Option<Arc<dyn Formatter>>,
    ) -> Self {
        Self {
            chunk,
            previous_chunks,
            formatter,
        }
    }

    pub fn role(&self) -> Role {
        self.chunk.role
    }

    pub fn index(&self) -> u32 {
        self.chunk.index
    }

    pub fn content(&self) -> &[Part] {
        &self.chunk.content
    }

    pub fn text(&self) -> String {
        self.chunk.text_content()
    }

    /// Text of this chunk and every earlier chunk of the same message
    pub fn accumulated_text(&self) -> String {
        self.previous_chunks
            .iter()
            .filter(|c| c.index == self.chunk.index)
            .chain(std::iter::once(&self.chunk))
            .map(ResponseChunk::text_content)
            .collect()
    }

    /// Structured output parsed so far by the request's format
    pub fn output(&self) -> Option<Value> {
        self.formatter
            .as_ref()
            .and_then(|formatter| formatter.parse_chunk(self))
    }
}

/// Positional bookkeeping for one top-level generation
pub struct ChunkAccumulator {
    callback: StreamingCallback,
    previous_chunks: Vec<ResponseChunk>,
    last_role: Role,
    index: u32,
    formatter: Option<Arc<dyn Formatter>>,
}

impl ChunkAccumulator {
    pub fn new(callback: StreamingCallback) -> Self {
        Self {
            callback,
            previous_chunks: Vec::new(),
            last_role: Role::Model,
            index: 0,
            formatter: None,
        }
    }

    /// The formatter used by chunk-level `output()` for the current turn
    pub fn set_formatter(&mut self, formatter: Option<Arc<dyn Formatter>>) {
        self.formatter = formatter;
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Position `chunk` under `role` and deliver it to the callback
    pub fn push(&mut self, role: Role, mut chunk: ResponseChunk) {
        if role != self.last_role && !self.previous_chunks.is_empty() {
            self.index += 1;
        }
        self.last_role = role;

        chunk.role = role;
        chunk.index = self.index;

        let previous_chunks = self.previous_chunks.clone();
        self.previous_chunks.push(chunk.clone());

        debug!(role = %role, index = self.index, "streaming chunk");
        (self.callback)(GenerateResponseChunk::new(
            chunk,
            previous_chunks,
            self.formatter.clone(),
        ));
    }

    /// Stream a whole message as a single chunk
    pub fn push_message(&mut self, message: &Message) {
        self.push(message.role, ResponseChunk::new(message.content.clone()));
    }

    /// Move to the next turn: a new message boundary that the model's first chunk continues
    pub fn start_turn(&mut self) {
        self.index += 1;
        self.last_role = Role::Model;
    }
}
