use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::middleware::RunContext;
use crate::models::message::Message;
use crate::models::request::ModelRequest;
use crate::models::response::{ModelResponse, ResponseChunk};
use crate::providers::base::{Model, ModelInfo};

/// A mock model that returns pre-configured responses for testing
pub struct MockProvider {
    name: String,
    info: ModelInfo,
    responses: Arc<Mutex<Vec<ModelResponse>>>,
    chunks: Arc<Mutex<Vec<Vec<ResponseChunk>>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl MockProvider {
    /// Create a new mock model with a sequence of messages, each ending its turn normally
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_responses(responses.into_iter().map(ModelResponse::stop).collect())
    }

    pub fn with_responses(responses: Vec<ModelResponse>) -> Self {
        Self {
            name: "mock/model".to_string(),
            info: ModelInfo::default(),
            responses: Arc::new(Mutex::new(responses)),
            chunks: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_info(mut self, info: ModelInfo) -> Self {
        self.info = info;
        self
    }

    /// Chunks to stream before each response, one list per turn
    pub fn with_chunks(self, chunks: Vec<Vec<ResponseChunk>>) -> Self {
        *self.chunks.lock().unwrap() = chunks;
        self
    }

    /// Every request the model has received so far
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            requests: self.requests.clone(),
        }
    }
}

/// Keeps access to recorded requests after the model is moved into a registry
#[derive(Clone)]
pub struct MockHandle {
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl MockHandle {
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Model for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> ModelInfo {
        self.info.clone()
    }

    async fn generate(&self, request: ModelRequest, ctx: RunContext) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request);

        let chunks = {
            let mut chunks = self.chunks.lock().unwrap();
            if chunks.is_empty() {
                Vec::new()
            } else {
                chunks.remove(0)
            }
        };
        if ctx.is_streaming() {
            for chunk in chunks {
                ctx.send_chunk(chunk);
            }
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(anyhow!("mock model has no more responses"))
        } else {
            Ok(responses.remove(0))
        }
    }
}
