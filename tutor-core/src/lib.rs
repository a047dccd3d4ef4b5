//! # tutor-core
//!
//! Reply engine for a study assistant. Chat turns go to a remote
//! generative-language provider while it is healthy and otherwise to a
//! deterministic, rule-based tutor, so callers always get a reply.
//!
//! ## Core Components
//!
//! - **Engine**: arithmetic extraction and solving, topic classification,
//!   canned subject responses
//! - **Composer**: context annotation and the closing study tip
//! - **Provider**: shared remote availability state
//! - **Orchestrator**: the [`Tutor`] provider chain
//! - **LLM**: the outbound [`LLMClient`] capability and a Gemini adapter
//!
//! ## Example
//!
//! ```rust,ignore
//! use tutor_core::{ChatContext, Tutor, TutorConfig};
//!
//! let tutor = Tutor::builder()
//!     .with_config(TutorConfig::from_env())
//!     .start()
//!     .await?;
//!
//! let reply = tutor.generate_response("what is 5+3", None, &[]).await;
//! assert!(reply.contains("5 + 3 = 8"));
//! ```

pub mod composer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod image;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod responder;
pub mod session;

// Re-exports for convenience
pub use composer::{ResponseComposer, STUDY_TIP};
pub use config::TutorConfig;
pub use context::{ChatContext, ChatHistory, ChatMessage, Role, DEFAULT_HISTORY_WINDOW};
pub use engine::{
    extract_expression, solve, DeterministicEngine, MathExpression, Operator, RandomSource, Route,
    SeededRandom, Solution, Subject, ThreadRandom, TopicClassifier,
};
pub use error::{Error, Result};
pub use image::{DecodedImage, ImageData};
pub use llm::{ClientConfig, CompletionRequest, CompletionResponse, GeminiClient, LLMClient};
pub use orchestrator::{Tutor, TutorBuilder};
pub use prompt::PromptBuilder;
pub use provider::{ActiveModel, ProviderSnapshot, ProviderState, ProviderStatus};
pub use responder::{
    DeterministicResponder, RemoteResponder, ReplySource, Responder, TutorReply, TutorRequest,
};
pub use session::TutorSession;
