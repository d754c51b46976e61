//! The multi-turn generation loop
//!
//! Each turn resolves the request's named actions, applies the output format, normalizes the
//! request for the backend and dispatches it through the middleware chain. A reply without
//! tool requests ends the generation; otherwise the requested tools run and their responses
//! are appended to the conversation for the next turn, up to the turn bound.
pub mod format;
pub mod normalize;
pub mod resolve;
pub mod tools;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::BoxStream;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::configuration::{Settings, DEFAULT_MAX_TURNS};
use crate::errors::{GenerateError, GenerateResult};
use crate::formats::Formatter;
use crate::middleware::{augment_with_context, ModelMiddleware, Next, RunContext};
use crate::models::request::{GenerateRequest, ModelRequest};
use crate::models::response::{
    FinishReason, GenerateResponse, ModelResponse, ResponseChunk, TurnMetadata, Usage,
};
use crate::models::role::Role;
use crate::registry::ActionLookup;
use crate::schema;
use crate::streaming::{ChunkAccumulator, GenerateResponseChunk, StreamingCallback};

pub use format::{apply_format, inject_instructions, resolve_instructions};
pub use normalize::to_model_request;
pub use resolve::{resolve_parameters, ResolvedParameters};
pub use tools::{resolve_tool_requests, ToolResolution};

pub const INTERRUPTED_MESSAGE: &str = "One or more tool calls resulted in interrupts.";

/// Per-call options for [`Generator::generate`]
#[derive(Clone, Default)]
pub struct GenerateOptions {
    /// Receives every chunk of the generation, including tool responses between turns
    pub on_chunk: Option<StreamingCallback>,
    /// Applied around the model call on every turn, outermost first
    pub middleware: Vec<Arc<dyn ModelMiddleware>>,
    /// Passed to middleware and the model backend
    pub context: Map<String, Value>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_chunk(mut self, on_chunk: StreamingCallback) -> Self {
        self.on_chunk = Some(on_chunk);
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn ModelMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }
}

impl fmt::Debug for GenerateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateOptions")
            .field("streaming", &self.on_chunk.is_some())
            .field("middleware", &self.middleware.len())
            .field("context", &self.context)
            .finish()
    }
}

/// An item of [`Generator::generate_stream`]
#[derive(Debug, Clone)]
pub enum GenerateEvent {
    Chunk(GenerateResponseChunk),
    Done(GenerateResponse),
}

/// The outcome of one model invocation
struct Turn {
    response: ModelResponse,
    request: ModelRequest,
    formatter: Option<Arc<dyn Formatter>>,
}

type SharedAccumulator = Arc<Mutex<ChunkAccumulator>>;

/// Aborts the spawned generation when the stream driving it is dropped
struct AbortOnDrop(JoinHandle<GenerateResult<GenerateResponse>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs generation requests against the actions of a lookup
#[derive(Clone)]
pub struct Generator {
    lookup: Arc<dyn ActionLookup>,
    max_turns: u32,
    default_model: Option<String>,
}

impl Generator {
    pub fn new(lookup: Arc<dyn ActionLookup>) -> Self {
        Self {
            lookup,
            max_turns: DEFAULT_MAX_TURNS,
            default_model: None,
        }
    }

    pub fn with_settings(lookup: Arc<dyn ActionLookup>, settings: &Settings) -> Self {
        Self::new(lookup)
            .with_max_turns(settings.max_turns)
            .with_default_model(settings.default_model.clone())
    }

    /// Model for requests that do not name one, ahead of the lookup's default
    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    /// Turn bound for requests that do not set their own
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Run a request to completion
    pub async fn generate(
        &self,
        request: GenerateRequest,
        options: GenerateOptions,
    ) -> GenerateResult<GenerateResponse> {
        let max_turns = request.max_turns.unwrap_or(self.max_turns);
        if max_turns == 0 {
            return Err(GenerateError::Configuration(
                "max_turns must be at least 1".to_string(),
            ));
        }

        let accumulator: Option<SharedAccumulator> = options
            .on_chunk
            .clone()
            .map(|callback| Arc::new(Mutex::new(ChunkAccumulator::new(callback))));

        let mut request = request;
        if request.model.is_none() {
            request.model = self.default_model.clone();
        }
        let mut usage = Usage::default();
        let mut turns = Vec::new();
        let mut turn = 0u32;

        loop {
            let Turn {
                response,
                request: model_request,
                formatter,
            } = self
                .run_turn(&request, &options, accumulator.as_ref(), turn)
                .await?;

            let ModelResponse {
                message,
                finish_reason,
                finish_message,
                usage: turn_usage,
            } = response;

            if finish_reason == FinishReason::Blocked {
                return Err(GenerateError::InvalidResponse(match finish_message {
                    Some(reason) => format!("Generation blocked: {reason}"),
                    None => "Generation blocked".to_string(),
                }));
            }
            let Some(message) = message else {
                return Err(GenerateError::InvalidResponse(
                    "Model did not return a message".to_string(),
                ));
            };

            let tool_requests = message.tool_requests().len();
            usage.accumulate(&turn_usage);
            turns.push(TurnMetadata {
                turn,
                finish_reason,
                usage: turn_usage,
                tool_requests,
            });

            let response = GenerateResponse {
                message,
                finish_reason,
                finish_message,
                usage,
                request: model_request,
                turns: turns.clone(),
                formatter,
            };

            if tool_requests == 0 {
                let response = validate_output(&request, response)?;
                info!(turns = turn + 1, finish_reason = %finish_reason, "generation complete");
                return Ok(response);
            }
            if request.return_tool_requests {
                info!(tool_requests, "returning tool requests to the caller");
                return Ok(response);
            }
            if turn + 1 >= max_turns {
                warn!(max_turns, "exceeded maximum tool call iterations");
                let last_request = response.request.clone();
                return Err(GenerateError::Aborted {
                    max_turns,
                    response: Box::new(response),
                    request: Box::new(last_request),
                });
            }

            let resolution =
                resolve_tool_requests(self.lookup.as_ref(), &request, &response.message).await?;
            match resolution {
                ToolResolution::Interrupted(revised) => {
                    warn!(turn, "tool calls interrupted the generation");
                    return Ok(GenerateResponse {
                        message: revised,
                        finish_reason: FinishReason::Interrupted,
                        finish_message: Some(INTERRUPTED_MESSAGE.to_string()),
                        ..response
                    });
                }
                ToolResolution::Responses(tool_message) => {
                    if let Some(accumulator) = &accumulator {
                        let mut accumulator =
                            accumulator.lock().unwrap_or_else(PoisonError::into_inner);
                        accumulator.push_message(&tool_message);
                        accumulator.start_turn();
                    }
                    request.messages.push(response.message);
                    request.messages.push(tool_message);
                    turn += 1;
                    info!(turn, "continuing with tool responses");
                }
            }
        }
    }

    /// Run a request, yielding chunks as they are produced and the final response last
    ///
    /// Dropping the stream cancels the generation, including any model or tool call in flight.
    pub fn generate_stream(
        &self,
        request: GenerateRequest,
        options: GenerateOptions,
    ) -> BoxStream<'static, GenerateResult<GenerateEvent>> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forward = options.on_chunk.clone();
        let on_chunk: StreamingCallback = Arc::new(move |chunk: GenerateResponseChunk| {
            if let Some(forward) = &forward {
                forward(chunk.clone());
            }
            // The receiver only goes away when the caller drops the stream
            let _ = tx.send(chunk);
        });
        let options = GenerateOptions {
            on_chunk: Some(on_chunk),
            ..options
        };

        let generator = self.clone();
        let mut task = AbortOnDrop(tokio::spawn(async move {
            generator.generate(request, options).await
        }));

        Box::pin(async_stream::stream! {
            while let Some(chunk) = rx.recv().await {
                yield Ok(GenerateEvent::Chunk(chunk));
            }
            let result = match (&mut task.0).await {
                Ok(result) => result,
                Err(e) => Err(GenerateError::Model(anyhow::Error::new(e))),
            };
            yield result.map(GenerateEvent::Done);
        })
    }

    #[instrument(skip_all, fields(turn = turn))]
    async fn run_turn(
        &self,
        request: &GenerateRequest,
        options: &GenerateOptions,
        accumulator: Option<&SharedAccumulator>,
        turn: u32,
    ) -> GenerateResult<Turn> {
        let resolved = resolve_parameters(self.lookup.as_ref(), request)?;
        debug!(
            model = resolved.model.name(),
            tools = resolved.tools.len(),
            "resolved parameters"
        );

        let (formatted, formatter) = apply_format(request, resolved.format.as_ref())?;
        let model_request = to_model_request(&formatted, &resolved.tools);

        let mut middleware: Vec<Arc<dyn ModelMiddleware>> = Vec::new();
        if !model_request.docs.is_empty() && !resolved.model.info().supports.context {
            middleware.push(augment_with_context());
        }
        middleware.extend(options.middleware.iter().cloned());

        let mut ctx = RunContext::new(options.context.clone());
        if let Some(accumulator) = accumulator {
            accumulator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .set_formatter(formatter.clone());
            let accumulator = accumulator.clone();
            ctx = ctx.with_chunk_sink(Arc::new(move |chunk: ResponseChunk| {
                accumulator
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(Role::Model, chunk);
            }));
        }

        debug!(middleware = middleware.len(), "dispatching model request");
        let response = Next::new(&middleware, resolved.model.as_ref())
            .run(model_request.clone(), ctx)
            .await?;

        Ok(Turn {
            response,
            request: model_request,
            formatter,
        })
    }
}

/// Check a terminal response against the request's output schema, if any
fn validate_output(
    request: &GenerateRequest,
    response: GenerateResponse,
) -> GenerateResult<GenerateResponse> {
    let Some(schema) = request.output.as_ref().and_then(|o| o.json_schema.as_ref()) else {
        return Ok(response);
    };
    let output = response.output().unwrap_or(Value::Null);
    match schema::validate(schema, &output) {
        Ok(()) => Ok(response),
        Err(errors) => {
            warn!(errors = errors.len(), "output failed schema validation");
            Err(GenerateError::SchemaValidation {
                errors,
                response: Box::new(response),
            })
        }
    }
}
