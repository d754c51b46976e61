//! Interceptors around the model call
//!
//! Middleware form a chain. Each one receives the request, the run context and a [`Next`]
//! handle. It can pass the request through unchanged, modify it before calling
//! `next.run(..)`, wrap the response that comes back, or short-circuit by returning a
//! response of its own without calling `next` at all. `Next::run` consumes the handle, so
//! the rest of the chain runs at most once per middleware.

pub mod context;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::{GenerateError, GenerateResult};
use crate::models::request::ModelRequest;
use crate::models::response::{ModelResponse, ResponseChunk};
use crate::providers::base::Model;

pub use context::{augment_with_context, ContextAugmenter};

/// Receives raw chunks from a streaming model backend
pub type ChunkSink = Arc<dyn Fn(ResponseChunk) + Send + Sync>;

/// Per-call state shared by the middleware chain and the model backend
#[derive(Clone, Default)]
pub struct RunContext {
    /// Caller-supplied values, e.g. auth or tracing data
    pub context: Map<String, Value>,
    on_chunk: Option<ChunkSink>,
}

impl RunContext {
    pub fn new(context: Map<String, Value>) -> Self {
        Self {
            context,
            on_chunk: None,
        }
    }

    pub fn with_chunk_sink(mut self, sink: ChunkSink) -> Self {
        self.on_chunk = Some(sink);
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.on_chunk.is_some()
    }

    /// Forward a chunk to the caller; a no-op when the call is not streaming
    pub fn send_chunk(&self, chunk: ResponseChunk) {
        if let Some(sink) = &self.on_chunk {
            sink(chunk);
        }
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("context", &self.context)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

#[async_trait]
pub trait ModelMiddleware: Send + Sync {
    /// Handle the request, calling `next.run(..)` to continue the chain
    async fn handle(
        &self,
        request: ModelRequest,
        ctx: RunContext,
        next: Next<'_>,
    ) -> GenerateResult<ModelResponse>;
}

/// Handle to invoke the rest of the chain, ending with the model itself
pub struct Next<'a> {
    middleware: &'a [Arc<dyn ModelMiddleware>],
    model: &'a dyn Model,
}

impl<'a> Next<'a> {
    pub fn new(middleware: &'a [Arc<dyn ModelMiddleware>], model: &'a dyn Model) -> Self {
        Self { middleware, model }
    }

    pub async fn run(
        self,
        request: ModelRequest,
        ctx: RunContext,
    ) -> GenerateResult<ModelResponse> {
        match self.middleware.split_first() {
            Some((first, rest)) => {
                let next = Next {
                    middleware: rest,
                    model: self.model,
                };
                first.handle(request, ctx, next).await
            }
            None => self
                .model
                .generate(request, ctx)
                .await
                .map_err(GenerateError::Model),
        }
    }
}
