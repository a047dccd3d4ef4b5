//! LLM client trait and the generative-language provider implementation.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crate::error::{Error, Result};

use super::types::{
    CompletionRequest, CompletionResponse, PromptMessage, PromptRole, StopReason, TokenUsage,
};

/// Remote generative-text capability the tutor is written against.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Check that `model` answers a trivial request with some text.
    async fn probe(&self, model: &str) -> Result<()> {
        let request = CompletionRequest::new()
            .with_model(model)
            .with_message(PromptMessage::user("Hello"))
            .with_max_tokens(16);
        let response = self.complete(request).await?;
        if response.content.trim().is_empty() {
            return Err(Error::LLM("empty response".to_string()));
        }
        Ok(())
    }

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// Configuration for LLM clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key
    pub api_key: String,
    /// Base URL override
    pub base_url: Option<String>,
    /// Default model
    pub default_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            default_model: None,
            timeout_secs: 60,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let timeout = Duration::from_secs(timeout_secs);

    // Proxy auto-detection can panic in some sandboxed environments; retry
    // without proxy support in that case.
    match catch_unwind(AssertUnwindSafe(|| Client::builder().timeout(timeout).build())) {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(_)) | Err(_) => Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e))),
    }
}

/// Client for the Google generative-language API.
pub struct GeminiClient {
    config: ClientConfig,
    http: Client,
}

impl GeminiClient {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(config.timeout_secs)?;

        Ok(Self { config, http })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn resolve_model(&self, request: &CompletionRequest) -> String {
        request
            .model
            .clone()
            .or_else(|| self.config.default_model.clone())
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string())
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    status: Option<String>,
}

fn build_request_body(request: &CompletionRequest) -> GeminiRequest {
    let mut contents: Vec<GeminiContent> = request
        .messages
        .iter()
        .map(|m| GeminiContent {
            role: Some(
                match m.role {
                    PromptRole::User => "user",
                    PromptRole::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![GeminiPart::Text {
                text: m.content.clone(),
            }],
        })
        .collect();

    // Images ride along with the final user turn.
    if !request.images.is_empty() {
        let image_parts = request.images.iter().map(|img| GeminiPart::InlineData {
            inline_data: GeminiBlob {
                mime_type: img.mime_type.clone(),
                data: img.data.clone(),
            },
        });
        let last_is_user = contents
            .last()
            .map_or(false, |c| c.role.as_deref() == Some("user"));
        if last_is_user {
            if let Some(last) = contents.last_mut() {
                last.parts.extend(image_parts);
            }
        } else {
            contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: image_parts.collect(),
            });
        }
    }

    let system_instruction = request.system.as_ref().map(|s| GeminiContent {
        role: None,
        parts: vec![GeminiPart::Text { text: s.clone() }],
    });

    let generation_config = if request.max_tokens.is_some() || request.temperature.is_some() {
        Some(GeminiGenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        })
    } else {
        None
    };

    GeminiRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

fn parse_error_body(status: reqwest::StatusCode, body: &str) -> Error {
    match serde_json::from_str::<GeminiError>(body) {
        Ok(error) => Error::llm_api(
            "gemini",
            match error.error.status {
                Some(code) => format!("{} ({})", error.error.message, code),
                None => error.error.message,
            },
        ),
        Err(_) => Error::llm_api("gemini", format!("HTTP {}: {}", status, body)),
    }
}

fn parse_response_body(model: &str, body: &str) -> Result<CompletionResponse> {
    let api_response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| Error::LLM(format!("Failed to parse response: {}", e)))?;

    let candidate = api_response
        .candidates
        .first()
        .ok_or_else(|| Error::LLM("No candidates in response".to_string()))?;

    let content = candidate
        .content
        .as_ref()
        .map(|c| {
            c.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let stop_reason = candidate.finish_reason.as_deref().map(|r| match r {
        "STOP" => StopReason::EndTurn,
        "MAX_TOKENS" => StopReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => StopReason::Safety,
        _ => StopReason::StopSequence,
    });

    let usage = api_response
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count.unwrap_or(0),
        })
        .unwrap_or_default();

    // Gemini doesn't return a response id
    let id = format!("gemini-{}", Utc::now().timestamp_millis());

    Ok(CompletionResponse {
        id,
        model: model.to_string(),
        content,
        stop_reason,
        usage,
        timestamp: Utc::now(),
    })
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = self.resolve_model(&request);
        let api_request = build_request_body(&request);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url(),
            model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::LLM(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::LLM(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(parse_error_body(status, &body));
        }

        parse_response_body(&model, &body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::InlineImage;
    use serde_json::json;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new("test-key")
            .with_base_url("https://custom.api.com")
            .with_default_model("gemini-1.5-pro")
            .with_timeout(30);

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, Some("https://custom.api.com".to_string()));
        assert_eq!(config.default_model, Some("gemini-1.5-pro".to_string()));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_model_resolution() {
        let client = GeminiClient::new(
            ClientConfig::new("k")
                .with_default_model("gemini-1.5-flash")
                .with_base_url("http://localhost:9999/"),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999");
        assert_eq!(
            client.resolve_model(&CompletionRequest::new()),
            "gemini-1.5-flash"
        );
        assert_eq!(
            client.resolve_model(&CompletionRequest::new().with_model("x")),
            "x"
        );

        let client = GeminiClient::new(ClientConfig::new("k")).unwrap();
        assert_eq!(client.resolve_model(&CompletionRequest::new()), "gemini-2.0-flash");
        assert_eq!(client.name(), "gemini");
    }

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest::new()
            .with_system("Be a tutor")
            .with_message(PromptMessage::user("Hi"))
            .with_message(PromptMessage::assistant("Hello!"))
            .with_message(PromptMessage::user("What is a cell?"))
            .with_max_tokens(100);

        let body = serde_json::to_value(build_request_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"text": "Hello!"}]},
                    {"role": "user", "parts": [{"text": "What is a cell?"}]}
                ],
                "systemInstruction": {"parts": [{"text": "Be a tutor"}]},
                "generationConfig": {"maxOutputTokens": 100}
            })
        );
    }

    #[test]
    fn test_request_body_attaches_images_to_last_user_turn() {
        let request = CompletionRequest::new()
            .with_message(PromptMessage::user("Describe this"))
            .with_image(InlineImage {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            });

        let body = serde_json::to_value(build_request_body(&request)).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][1],
            json!({"inlineData": {"mimeType": "image/png", "data": "AAAA"}})
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_parse_response_body() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Gravity "}, {"text": "pulls."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15}
        })
        .to_string();

        let response = parse_response_body("gemini-2.0-flash", &body).unwrap();
        assert_eq!(response.content, "Gravity pulls.");
        assert_eq!(response.model, "gemini-2.0-flash");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.usage.total(), 15);
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let err = parse_response_body("m", r#"{"candidates": []}"#).unwrap_err();
        assert!(err.to_string().contains("No candidates"));

        let err = parse_response_body("m", "not json").unwrap_err();
        assert!(matches!(err, Error::LLM(_)));
    }

    /// Client that answers every completion with fixed text.
    struct FixedReply(&'static str);

    #[async_trait]
    impl LLMClient for FixedReply {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse::text(
                request.model.unwrap_or_default(),
                self.0,
            ))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_default_probe_requires_text() {
        assert!(FixedReply("Hi there").probe("m").await.is_ok());

        let err = FixedReply("").probe("m").await.unwrap_err();
        assert!(matches!(err, Error::LLM(_)));
        assert!(FixedReply(" \n ").probe("m").await.is_err());
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = parse_error_body(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(
            err.to_string(),
            "LLM API error: gemini - Quota exceeded (RESOURCE_EXHAUSTED)"
        );

        let err = parse_error_body(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));
    }
}
