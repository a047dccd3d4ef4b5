//! Outbound generative-language capability.
//!
//! The tutor only depends on the [`LLMClient`] trait: `probe` a model id,
//! then `complete` prompts against it. [`GeminiClient`] is the stock HTTP
//! implementation; tests and embedders can supply their own.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tutor_core::llm::{ClientConfig, CompletionRequest, GeminiClient, LLMClient, PromptMessage};
//!
//! let client = GeminiClient::new(ClientConfig::new("your-api-key"))?;
//! client.probe("gemini-2.0-flash").await?;
//!
//! let request = CompletionRequest::new()
//!     .with_model("gemini-2.0-flash")
//!     .with_message(PromptMessage::user("Explain photosynthesis"));
//!
//! let response = client.complete(request).await?;
//! ```

mod client;
mod types;

pub use client::{ClientConfig, GeminiClient, LLMClient};
pub use types::{
    CompletionRequest, CompletionResponse, InlineImage, PromptMessage, PromptRole, StopReason,
    TokenUsage,
};
