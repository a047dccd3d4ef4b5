//! Response providers behind a common [`Responder`] interface.
//!
//! - [`RemoteResponder`]: the generative-language provider, usable only
//!   while the shared [`ProviderState`] is available.
//! - [`DeterministicResponder`]: the rule-based engine; never fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::composer::ResponseComposer;
use crate::context::{ChatContext, ChatMessage};
use crate::engine::{DeterministicEngine, Route};
use crate::error::{Error, Result};
use crate::image::ImageData;
use crate::llm::{CompletionRequest, InlineImage, LLMClient};
use crate::prompt::PromptBuilder;
use crate::provider::{ActiveModel, ProviderState};

/// One chat turn to answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorRequest {
    pub message: String,
    #[serde(default)]
    pub context: ChatContext,
    /// Prior messages, oldest first, not including `message`
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl TutorRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: ChatContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReplySource {
    Remote { model: String },
    Deterministic { route: Route },
}

/// A finished reply and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorReply {
    pub text: String,
    pub source: ReplySource,
}

impl TutorReply {
    pub fn is_remote(&self) -> bool {
        matches!(self.source, ReplySource::Remote { .. })
    }

    /// The engine route, for deterministic replies.
    pub fn route(&self) -> Option<Route> {
        match &self.source {
            ReplySource::Deterministic { route } => Some(*route),
            ReplySource::Remote { .. } => None,
        }
    }
}

/// Something that can answer a chat turn or describe an image.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Answer a chat turn.
    async fn respond(&self, request: &TutorRequest) -> Result<TutorReply>;

    /// Describe an image, optionally guided by the student's note.
    async fn describe_image(&self, image: &ImageData, context: Option<&str>) -> Result<String>;
}

/// Rule-based responder: arithmetic, subject pools, general pool.
#[derive(Debug, Clone, Default)]
pub struct DeterministicResponder {
    engine: DeterministicEngine,
    composer: ResponseComposer,
    thinking_delay: Duration,
}

impl DeterministicResponder {
    pub fn new(engine: DeterministicEngine) -> Self {
        Self {
            engine,
            composer: ResponseComposer::new(),
            thinking_delay: Duration::ZERO,
        }
    }

    /// Pause before answering so replies don't feel instantaneous.
    pub fn with_thinking_delay(mut self, delay: Duration) -> Self {
        self.thinking_delay = delay;
        self
    }

    pub fn engine(&self) -> &DeterministicEngine {
        &self.engine
    }

    async fn think(&self) {
        if !self.thinking_delay.is_zero() {
            tokio::time::sleep(self.thinking_delay).await;
        }
    }

    /// Answer without the thinking delay.
    pub fn answer_now(&self, request: &TutorRequest) -> TutorReply {
        let answer = self.engine.answer(&request.message);
        debug!(route = ?answer.route, "deterministic route selected");
        TutorReply {
            text: self.composer.compose(&answer.body, &request.context),
            source: ReplySource::Deterministic {
                route: answer.route,
            },
        }
    }
}

#[async_trait]
impl Responder for DeterministicResponder {
    fn name(&self) -> &str {
        "deterministic"
    }

    async fn respond(&self, request: &TutorRequest) -> Result<TutorReply> {
        self.think().await;
        Ok(self.answer_now(request))
    }

    async fn describe_image(&self, image: &ImageData, context: Option<&str>) -> Result<String> {
        self.think().await;
        let size = match image.decode() {
            Ok(decoded) => Some(decoded.bytes.len()),
            Err(e) => {
                debug!(error = %e, "image payload could not be decoded");
                None
            }
        };
        Ok(self.composer.describe_image(size, context))
    }
}

/// Responder backed by a remote [`LLMClient`].
///
/// Any failure (including a timeout) downgrades the shared provider state
/// before the error is returned.
pub struct RemoteResponder {
    client: Arc<dyn LLMClient>,
    state: Arc<ProviderState>,
    prompts: PromptBuilder,
    request_timeout: Duration,
}

impl RemoteResponder {
    pub fn new(
        client: Arc<dyn LLMClient>,
        state: Arc<ProviderState>,
        prompts: PromptBuilder,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            state,
            prompts,
            request_timeout,
        }
    }

    pub fn client(&self) -> &Arc<dyn LLMClient> {
        &self.client
    }

    fn active_model(&self) -> Result<ActiveModel> {
        self.state
            .active()
            .ok_or_else(|| Error::provider_unavailable("no active model"))
    }

    /// Run a completion with the timeout. Every error from the client,
    /// a timeout, or a blank reply downgrades the provider.
    async fn complete(&self, active: &ActiveModel, request: CompletionRequest) -> Result<String> {
        let result = match tokio::time::timeout(self.request_timeout, self.client.complete(request))
            .await
        {
            Ok(Ok(response)) if response.content.trim().is_empty() => {
                Err(Error::LLM("empty response".to_string()))
            }
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::timeout(self.request_timeout.as_millis() as u64)),
        };

        if let Err(e) = &result {
            if self.state.mark_failed(active, e.to_string()) {
                warn!(
                    provider = self.client.name(),
                    model = %active.model,
                    error = %e,
                    "remote provider failed; switching to deterministic replies"
                );
            }
        }
        result
    }
}

#[async_trait]
impl Responder for RemoteResponder {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn respond(&self, request: &TutorRequest) -> Result<TutorReply> {
        let active = self.active_model()?;
        let completion = self.prompts.chat_request(
            &active.model,
            &request.message,
            &request.context,
            &request.history,
        );
        let text = self.complete(&active, completion).await?;
        Ok(TutorReply {
            text,
            source: ReplySource::Remote {
                model: active.model,
            },
        })
    }

    async fn describe_image(&self, image: &ImageData, context: Option<&str>) -> Result<String> {
        let active = self.active_model()?;
        // A bad payload is the caller's problem, not the provider's.
        let decoded = image.decode()?;
        let inline = InlineImage {
            mime_type: decoded.mime_type.clone(),
            data: decoded.to_base64(),
        };
        let completion = self.prompts.image_request(&active.model, inline, context);
        self.complete(&active, completion).await
    }
}
