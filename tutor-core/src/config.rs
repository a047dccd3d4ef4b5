//! Tutor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::context::DEFAULT_HISTORY_WINDOW;
use crate::error::{Error, Result};

/// Model ids probed in order when nothing else is configured.
pub const DEFAULT_CANDIDATE_MODELS: &[&str] =
    &["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro"];

/// Configuration for a [`Tutor`](crate::Tutor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    /// Remote model ids, probed in order at startup
    pub candidate_models: Vec<String>,
    /// API key for the remote provider; without one only the
    /// deterministic engine is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for the provider endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Deadline for one remote completion in milliseconds
    pub request_timeout_ms: u64,
    /// Deadline for each probe call in milliseconds
    pub probe_timeout_ms: u64,
    /// Simulated thinking time on the deterministic path in milliseconds
    pub thinking_delay_ms: u64,
    /// History entries sent with each remote prompt (at most 10)
    pub history_window: usize,
    pub max_output_tokens: u32,
    pub temperature: f64,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            candidate_models: DEFAULT_CANDIDATE_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            api_key: None,
            base_url: None,
            request_timeout_ms: 30_000,
            probe_timeout_ms: 10_000,
            thinking_delay_ms: 1_000,
            history_window: DEFAULT_HISTORY_WINDOW,
            max_output_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl TutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup. Unset or
    /// unparsable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed_u64 = |key: &str, default: u64| {
            non_empty(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };

        let candidate_models = non_empty("TUTOR_MODEL_CANDIDATES")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or(defaults.candidate_models);

        let history_window = non_empty("TUTOR_HISTORY_WINDOW")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(defaults.history_window)
            .min(DEFAULT_HISTORY_WINDOW);

        Self {
            candidate_models,
            api_key: non_empty("TUTOR_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")),
            base_url: non_empty("TUTOR_API_BASE_URL"),
            request_timeout_ms: parsed_u64("TUTOR_REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            probe_timeout_ms: parsed_u64("TUTOR_PROBE_TIMEOUT_MS", defaults.probe_timeout_ms),
            thinking_delay_ms: parsed_u64("TUTOR_THINKING_DELAY_MS", defaults.thinking_delay_ms),
            history_window,
            max_output_tokens: defaults.max_output_tokens,
            temperature: defaults.temperature,
        }
    }

    pub fn with_candidate_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_thinking_delay(mut self, delay: Duration) -> Self {
        self.thinking_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.min(DEFAULT_HISTORY_WINDOW);
        self
    }

    pub fn with_max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn thinking_delay(&self) -> Duration {
        Duration::from_millis(self.thinking_delay_ms)
    }

    /// Whether a remote provider should be set up at all.
    pub fn has_remote(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Check the configuration for values the tutor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.has_remote() && self.candidate_models.is_empty() {
            return Err(Error::Config(
                "an API key is set but no candidate models are configured".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request timeout must be non-zero".to_string()));
        }
        if self.history_window == 0 {
            return Err(Error::Config("history window must be non-zero".to_string()));
        }
        if self.history_window > DEFAULT_HISTORY_WINDOW {
            return Err(Error::Config(format!(
                "history window must be at most {}",
                DEFAULT_HISTORY_WINDOW
            )));
        }
        Ok(())
    }
}
