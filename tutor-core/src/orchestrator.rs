//! Provider chain orchestration.
//!
//! [`Tutor`] is the inbound surface. Each request tries the remote provider
//! while [`ProviderState`] says it is available and otherwise (or after any
//! remote failure) falls through to the deterministic responder. Callers
//! always get text back; provider errors are only logged.
//!
//! ```rust,ignore
//! use tutor_core::{ChatContext, Tutor, TutorConfig};
//!
//! let tutor = Tutor::builder()
//!     .with_config(TutorConfig::from_env())
//!     .start()
//!     .await?;
//!
//! let ctx = ChatContext::new().with_subject("Physics");
//! let reply = tutor.generate_response("Explain Newton's laws", Some(&ctx), &[]).await;
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::composer::{ResponseComposer, STUDY_TIP};
use crate::config::TutorConfig;
use crate::context::{ChatContext, ChatMessage};
use crate::engine::{
    DeterministicEngine, RandomSource, ResponseSelector, Route, ThreadRandom, TopicClassifier,
};
use crate::error::Result;
use crate::image::ImageData;
use crate::llm::{ClientConfig, GeminiClient, LLMClient};
use crate::prompt::PromptBuilder;
use crate::provider::{ProviderSnapshot, ProviderState};
use crate::responder::{
    DeterministicResponder, RemoteResponder, ReplySource, Responder, TutorReply, TutorRequest,
};

/// Reply used only if the deterministic responder itself fails.
const LAST_RESORT_REPLY: &str =
    "I'm having a little trouble putting an answer together right now. Could you try asking that again, maybe in different words?";

/// Entry point for chat replies and image descriptions.
pub struct Tutor {
    remote: Option<RemoteResponder>,
    fallback: Arc<dyn Responder>,
    state: Arc<ProviderState>,
    candidates: Vec<String>,
    probe_timeout: Duration,
    history_window: usize,
    probe_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Tutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tutor")
            .field("remote", &self.remote.as_ref().map(|r| r.name().to_string()))
            .field("fallback", &self.fallback.name())
            .field("state", &self.state.status())
            .field("candidates", &self.candidates)
            .finish()
    }
}

impl Tutor {
    pub fn builder() -> TutorBuilder {
        TutorBuilder::new()
    }

    /// Build a tutor from configuration without probing.
    pub fn from_config(config: TutorConfig) -> Result<Self> {
        TutorBuilder::new().with_config(config).build()
    }

    /// Current provider availability.
    pub fn provider_state(&self) -> ProviderSnapshot {
        self.state.snapshot()
    }

    /// Shared provider state, e.g. for inspection by the embedding service.
    pub fn state(&self) -> &Arc<ProviderState> {
        &self.state
    }

    /// Probe the candidate models in order and record the first that
    /// answers. Also the only way back to `Available` after a downgrade.
    ///
    /// Concurrent calls are serialized. Dropping the future mid-probe
    /// leaves the provider unavailable.
    pub async fn probe(&self) -> ProviderSnapshot {
        let _serial = self.probe_lock.lock().await;
        let guard = self.state.begin_probe();

        let Some(remote) = &self.remote else {
            info!("no remote provider configured; using deterministic replies only");
            guard.finish(None);
            return self.state.snapshot();
        };

        let client = remote.client();
        let mut active = None;
        for model in &self.candidates {
            match tokio::time::timeout(self.probe_timeout, client.probe(model)).await {
                Ok(Ok(())) => {
                    active = Some(model.clone());
                    break;
                }
                Ok(Err(e)) => debug!(model = %model, error = %e, "candidate model probe failed"),
                Err(_) => debug!(model = %model, "candidate model probe timed out"),
            }
        }

        match &active {
            Some(model) => info!(provider = client.name(), model = %model, "remote provider available"),
            None => info!(
                provider = client.name(),
                candidates = self.candidates.len(),
                "no candidate model responded; using deterministic replies only"
            ),
        }
        guard.finish(active);
        self.state.snapshot()
    }

    /// Reply text for a chat turn. Never fails.
    pub async fn generate_response(
        &self,
        message: &str,
        context: Option<&ChatContext>,
        history: &[ChatMessage],
    ) -> String {
        self.generate_reply(message, context, history).await.text
    }

    /// Reply for a chat turn, with where it came from. Never fails.
    pub async fn generate_reply(
        &self,
        message: &str,
        context: Option<&ChatContext>,
        history: &[ChatMessage],
    ) -> TutorReply {
        let start = history.len().saturating_sub(self.history_window);
        let request = TutorRequest {
            message: message.to_string(),
            context: context.cloned().unwrap_or_default(),
            history: history[start..].to_vec(),
        };

        let span = info_span!("tutor_reply", request_id = %Uuid::new_v4());
        self.reply(&request).instrument(span).await
    }

    async fn reply(&self, request: &TutorRequest) -> TutorReply {
        if let Some(remote) = self.available_remote() {
            match remote.respond(request).await {
                Ok(reply) => {
                    debug!(route = "remote", "reply generated");
                    return reply;
                }
                Err(e) => debug!(error = %e, "remote reply failed; using deterministic engine"),
            }
        }

        match self.fallback.respond(request).await {
            Ok(reply) => {
                if let ReplySource::Deterministic { route } = &reply.source {
                    debug!(route = route_label(route), "reply generated");
                }
                reply
            }
            Err(e) => {
                warn!(responder = self.fallback.name(), error = %e, "fallback responder failed");
                TutorReply {
                    text: format!("{}\n\n{}", LAST_RESORT_REPLY, STUDY_TIP),
                    source: ReplySource::Deterministic {
                        route: Route::General,
                    },
                }
            }
        }
    }

    /// Describe an uploaded image. Never fails.
    pub async fn analyze_image(&self, image: &ImageData, context: Option<&str>) -> String {
        let span = info_span!("tutor_image", request_id = %Uuid::new_v4());
        async {
            if let Some(remote) = self.available_remote() {
                match remote.describe_image(image, context).await {
                    Ok(text) => return text,
                    Err(e) => debug!(error = %e, "remote image description failed"),
                }
            }
            match self.fallback.describe_image(image, context).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(responder = self.fallback.name(), error = %e, "fallback responder failed");
                    ResponseComposer::new().describe_image(None, context)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn available_remote(&self) -> Option<&RemoteResponder> {
        self.remote.as_ref().filter(|_| self.state.is_available())
    }
}

fn route_label(route: &Route) -> &'static str {
    match route {
        Route::Arithmetic(_) => "arithmetic",
        Route::Subject(subject) => subject.name(),
        Route::General => "general",
    }
}

/// Builder for [`Tutor`].
#[derive(Default)]
pub struct TutorBuilder {
    config: TutorConfig,
    client: Option<Arc<dyn LLMClient>>,
    fallback: Option<Arc<dyn Responder>>,
    random: Option<Arc<dyn RandomSource>>,
    classifier: Option<TopicClassifier>,
    state: Option<Arc<ProviderState>>,
}

impl TutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: TutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this client for the remote provider instead of building one
    /// from the configured API key.
    pub fn with_client(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the deterministic responder entirely.
    pub fn with_fallback(mut self, fallback: Arc<dyn Responder>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Random source for canned template selection.
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn with_classifier(mut self, classifier: TopicClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Share an existing provider state.
    pub fn with_state(mut self, state: Arc<ProviderState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Build the tutor. The provider stays unavailable until
    /// [`Tutor::probe`] succeeds.
    pub fn build(self) -> Result<Tutor> {
        let config = self.config;
        config.validate()?;

        let state = self.state.unwrap_or_default();

        let client = match self.client {
            Some(client) => Some(client),
            None => match config.api_key.as_deref().filter(|_| config.has_remote()) {
                Some(key) => {
                    let mut client_config = ClientConfig::new(key)
                        .with_timeout(config.request_timeout().as_secs().max(1));
                    if let Some(base_url) = &config.base_url {
                        client_config = client_config.with_base_url(base_url);
                    }
                    Some(Arc::new(GeminiClient::new(client_config)?) as Arc<dyn LLMClient>)
                }
                None => None,
            },
        };

        let remote = client.map(|client| {
            let prompts = PromptBuilder::new()
                .with_history_window(config.history_window)
                .with_max_tokens(config.max_output_tokens)
                .with_temperature(config.temperature);
            RemoteResponder::new(client, Arc::clone(&state), prompts, config.request_timeout())
        });

        let fallback = match self.fallback {
            Some(fallback) => fallback,
            None => {
                let random = self.random.unwrap_or_else(|| Arc::new(ThreadRandom));
                let engine = DeterministicEngine::new(
                    self.classifier.unwrap_or_default(),
                    ResponseSelector::new(random),
                );
                Arc::new(
                    DeterministicResponder::new(engine)
                        .with_thinking_delay(config.thinking_delay()),
                )
            }
        };

        Ok(Tutor {
            remote,
            fallback,
            state,
            candidates: config.candidate_models.clone(),
            probe_timeout: config.probe_timeout(),
            history_window: config.history_window,
            probe_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Build the tutor and run the startup probe.
    pub async fn start(self) -> Result<Tutor> {
        let tutor = self.build()?;
        tutor.probe().await;
        Ok(tutor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MathExpression, Operator, PoolKind, ResponsePool, SeededRandom, Subject};
    use crate::error::Error;
    use crate::llm::{CompletionRequest, CompletionResponse};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// How the fake provider answers completions.
    #[derive(Clone)]
    enum Behavior {
        Reply(&'static str),
        Fail,
        Broken,
        Hang,
    }

    struct FakeClient {
        working_models: HashSet<String>,
        behavior: Behavior,
        probe_hangs: bool,
        probes: AtomicUsize,
        completions: AtomicUsize,
    }

    impl FakeClient {
        fn new(working_models: &[&str], behavior: Behavior) -> Self {
            Self {
                working_models: working_models.iter().map(|m| m.to_string()).collect(),
                behavior,
                probe_hangs: false,
                probes: AtomicUsize::new(0),
                completions: AtomicUsize::new(0),
            }
        }

        fn hanging_probe(mut self) -> Self {
            self.probe_hangs = true;
            self
        }
    }

    #[async_trait]
    impl LLMClient for FakeClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            self.completions.fetch_add(1, Ordering::SeqCst);
            let model = request.model.unwrap_or_default();
            match self.behavior {
                Behavior::Reply(text) => Ok(CompletionResponse::text(model, text)),
                Behavior::Fail => Err(Error::llm_api("fake", "quota exceeded")),
                Behavior::Broken => Err(Error::Internal("sdk blew up".to_string())),
                Behavior::Hang => std::future::pending().await,
            }
        }

        async fn probe(&self, model: &str) -> Result<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.probe_hangs {
                return std::future::pending().await;
            }
            if self.working_models.contains(model) {
                Ok(())
            } else {
                Err(Error::llm_api("fake", format!("unknown model {}", model)))
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct BrokenResponder;

    #[async_trait]
    impl Responder for BrokenResponder {
        fn name(&self) -> &str {
            "broken"
        }

        async fn respond(&self, _request: &TutorRequest) -> Result<TutorReply> {
            Err(Error::Internal("broken".to_string()))
        }

        async fn describe_image(&self, _image: &ImageData, _context: Option<&str>) -> Result<String> {
            Err(Error::Internal("broken".to_string()))
        }
    }

    fn test_config() -> TutorConfig {
        TutorConfig::new()
            .with_candidate_models(["model-a", "model-b", "model-c"])
            .with_thinking_delay(Duration::ZERO)
    }

    fn offline_tutor() -> Tutor {
        Tutor::builder()
            .with_config(test_config())
            .with_random_source(Arc::new(SeededRandom::new(7)))
            .build()
            .unwrap()
    }

    async fn tutor_with(client: Arc<FakeClient>, config: TutorConfig) -> Tutor {
        Tutor::builder()
            .with_config(config)
            .with_client(client)
            .start()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_arithmetic_scenarios() {
        let tutor = offline_tutor();

        let reply = tutor.generate_reply("what is 5+3", None, &[]).await;
        assert!(reply.text.contains("5 + 3 = 8"));
        assert_eq!(
            reply.route(),
            Some(Route::Arithmetic(MathExpression::new(5, Operator::Add, 3)))
        );

        let text = tutor.generate_response("10-4=", None, &[]).await;
        assert!(text.contains("10 - 4 = 6"));
    }

    #[tokio::test]
    async fn test_subject_scenario_with_context() {
        let tutor = offline_tutor();
        let ctx = ChatContext::new().with_subject("Physics");

        let reply = tutor
            .generate_reply("Explain Newton's laws", Some(&ctx), &[])
            .await;
        assert_eq!(reply.route(), Some(Route::Subject(Subject::Physics)));
        assert!(reply.text.contains("Since you're studying Physics"));

        let pool = ResponsePool::for_kind(PoolKind::Subject(Subject::Physics));
        assert!(pool.templates.iter().any(|t| reply.text.contains(t)));
    }

    #[tokio::test]
    async fn test_general_scenario_without_context() {
        let tutor = offline_tutor();

        let reply = tutor.generate_reply("hello", None, &[]).await;
        assert_eq!(reply.route(), Some(Route::General));
        assert!(reply.text.ends_with(STUDY_TIP));
        assert!(!reply.text.contains("Since you're"));

        let pool = ResponsePool::for_kind(PoolKind::General);
        assert!(pool.templates.iter().any(|t| reply.text.contains(t)));
    }

    #[tokio::test]
    async fn test_no_remote_configured_is_unavailable() {
        let tutor = Tutor::from_config(test_config()).unwrap();
        let snapshot = tutor.probe().await;
        assert!(!snapshot.is_available);
        assert_eq!(snapshot.active_model, None);
    }

    #[tokio::test]
    async fn test_probe_exhaustion_uses_deterministic_path() {
        let client = Arc::new(FakeClient::new(&[], Behavior::Reply("remote")));
        let tutor = tutor_with(Arc::clone(&client), test_config()).await;

        assert!(!tutor.provider_state().is_available);
        assert_eq!(client.probes.load(Ordering::SeqCst), 3);

        for message in ["what is 5+3", "hello", "tell me about cells"] {
            let reply = tutor.generate_reply(message, None, &[]).await;
            assert!(!reply.is_remote());
        }
        assert_eq!(client.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_records_first_working_candidate() {
        let client = Arc::new(FakeClient::new(
            &["model-b", "model-c"],
            Behavior::Reply("Remote says hi"),
        ));
        let tutor = tutor_with(Arc::clone(&client), test_config()).await;

        assert_eq!(
            tutor.provider_state(),
            ProviderSnapshot {
                is_available: true,
                active_model: Some("model-b".to_string()),
            }
        );
        assert_eq!(client.probes.load(Ordering::SeqCst), 2);

        let ctx = ChatContext::new().with_subject("Physics");
        let reply = tutor.generate_reply("hello", Some(&ctx), &[]).await;
        // Remote text is returned untouched.
        assert_eq!(reply.text, "Remote says hi");
        assert_eq!(
            reply.source,
            ReplySource::Remote {
                model: "model-b".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_remote_failure_downgrades_and_falls_back() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Fail));
        let tutor = tutor_with(Arc::clone(&client), test_config()).await;
        assert!(tutor.provider_state().is_available);

        let reply = tutor.generate_reply("what is 5+3", None, &[]).await;
        assert!(!reply.is_remote());
        assert!(reply.text.contains("5 + 3 = 8"));
        assert!(!tutor.provider_state().is_available);

        // No further remote attempts once downgraded.
        tutor.generate_response("hello", None, &[]).await;
        assert_eq!(client.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_any_client_error_downgrades() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Broken));
        let tutor = tutor_with(Arc::clone(&client), test_config()).await;
        assert!(tutor.provider_state().is_available);

        for _ in 0..3 {
            let reply = tutor.generate_reply("hello", None, &[]).await;
            assert!(!reply.is_remote());
        }
        assert!(!tutor.provider_state().is_available);
        assert_eq!(client.completions.load(Ordering::SeqCst), 1);
    }

    /// Client relying on the default `probe`, answering with blank text.
    struct BlankClient;

    #[async_trait]
    impl LLMClient for BlankClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse::text(request.model.unwrap_or_default(), "  "))
        }

        fn name(&self) -> &str {
            "blank"
        }
    }

    #[tokio::test]
    async fn test_blank_probe_reply_is_not_available() {
        let tutor = Tutor::builder()
            .with_config(test_config())
            .with_client(Arc::new(BlankClient))
            .start()
            .await
            .unwrap();

        assert!(!tutor.provider_state().is_available);
        let reply = tutor.generate_reply("what is 5+3", None, &[]).await;
        assert!(!reply.is_remote());
        assert!(reply.text.contains("5 + 3 = 8"));
    }

    #[tokio::test]
    async fn test_reprobe_restores_availability() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Fail));
        let tutor = tutor_with(Arc::clone(&client), test_config()).await;

        tutor.generate_response("hello", None, &[]).await;
        assert!(!tutor.provider_state().is_available);

        let snapshot = tutor.probe().await;
        assert!(snapshot.is_available);
        assert_eq!(snapshot.active_model.as_deref(), Some("model-a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_is_a_failure() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Hang));
        let config = test_config().with_request_timeout(Duration::from_millis(250));
        let tutor = tutor_with(client, config).await;

        let started = tokio::time::Instant::now();
        let reply = tutor.generate_reply("10-4=", None, &[]).await;
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert!(reply.text.contains("10 - 4 = 6"));
        assert!(!tutor.provider_state().is_available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_leaves_state_intact() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Hang));
        let tutor = tutor_with(client, test_config()).await;

        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            tutor.generate_response("hello", None, &[]),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(tutor.provider_state().is_available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_moves_to_next_candidate() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Reply("ok")).hanging_probe());
        let config = test_config().with_probe_timeout(Duration::from_millis(100));
        let tutor = tutor_with(Arc::clone(&client), config).await;

        assert_eq!(client.probes.load(Ordering::SeqCst), 3);
        assert!(!tutor.provider_state().is_available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_probe_settles_unavailable() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Reply("ok")).hanging_probe());
        let tutor = Tutor::builder()
            .with_config(test_config().with_probe_timeout(Duration::from_secs(60)))
            .with_client(client)
            .build()
            .unwrap();

        let cancelled = tokio::time::timeout(Duration::from_millis(10), tutor.probe()).await;
        assert!(cancelled.is_err());
        assert!(matches!(
            tutor.state().status(),
            crate::provider::ProviderStatus::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_failures_all_get_replies() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Fail));
        let tutor = tutor_with(client, test_config()).await;

        let messages: Vec<String> = (0..16).map(|i| format!("{}+{}=", i, i)).collect();
        let replies = futures::future::join_all(
            messages
                .iter()
                .map(|m| tutor.generate_reply(m, None, &[])),
        )
        .await;

        assert_eq!(replies.len(), 16);
        for (i, reply) in replies.iter().enumerate() {
            assert!(!reply.is_remote());
            assert!(reply.text.contains(&format!("{} + {} = {}", i, i, 2 * i)));
        }
        assert!(!tutor.provider_state().is_available);
    }

    #[tokio::test]
    async fn test_fallback_failure_still_replies() {
        let tutor = Tutor::builder()
            .with_config(test_config())
            .with_fallback(Arc::new(BrokenResponder))
            .build()
            .unwrap();

        let text = tutor.generate_response("hello", None, &[]).await;
        assert!(text.starts_with(LAST_RESORT_REPLY));

        let text = tutor
            .analyze_image(&ImageData::from_bytes(vec![1, 2]), Some("graph"))
            .await;
        assert!(text.contains("graph"));
    }

    #[tokio::test]
    async fn test_analyze_image_paths() {
        let tutor = offline_tutor();
        let text = tutor
            .analyze_image(&ImageData::from_bytes(vec![0u8; 2048]), Some("my notes"))
            .await;
        assert!(text.contains("2.0 KB"));
        assert!(text.contains("my notes"));

        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Reply("A labelled cell diagram")));
        let tutor = tutor_with(client, test_config()).await;
        let text = tutor
            .analyze_image(&ImageData::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]), None)
            .await;
        assert_eq!(text, "A labelled cell diagram");
    }

    #[tokio::test]
    async fn test_remote_image_failure_falls_back() {
        let client = Arc::new(FakeClient::new(&["model-a"], Behavior::Fail));
        let tutor = tutor_with(client, test_config()).await;

        let text = tutor
            .analyze_image(&ImageData::from_bytes(vec![1, 2, 3]), None)
            .await;
        assert!(text.contains("3 bytes"));
        assert!(!tutor.provider_state().is_available);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = TutorConfig::new().with_request_timeout(Duration::ZERO);
        assert!(matches!(
            Tutor::from_config(config),
            Err(Error::Config(_))
        ));
    }
}
