//! Prompt construction for the remote provider.

use crate::context::{ChatContext, ChatMessage, DEFAULT_HISTORY_WINDOW};
use crate::llm::{CompletionRequest, InlineImage, PromptMessage};

const TUTOR_INSTRUCTION: &str = "You are a friendly, patient AI tutor helping students learn. \
Explain concepts step by step in clear, simple language, use examples where they help, \
show your working for calculations, and finish with a short study tip. \
Keep answers focused and encouraging.";

const IMAGE_INSTRUCTION: &str = "Describe this image for a student and explain what they can \
learn from it. If it contains a problem or diagram, walk through it step by step.";

/// Builds completion requests carrying the tutor instruction, the
/// student's context and recent history.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    history_window: usize,
    max_tokens: u32,
    temperature: f64,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of history entries to include (never more than ten).
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.min(DEFAULT_HISTORY_WINDOW);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// System instruction plus any context the student supplied.
    pub fn system_instruction(&self, context: &ChatContext) -> String {
        let mut lines = Vec::new();
        if let Some(subject) = context.subject() {
            lines.push(format!("The student is currently studying {}.", subject));
        }
        if let Some(topic) = context.topic() {
            lines.push(format!("Their current topic is {}.", topic));
        }
        if let Some(test) = context.recent_test() {
            lines.push(format!("They recently took a test on {}.", test));
        }

        if lines.is_empty() {
            TUTOR_INSTRUCTION.to_string()
        } else {
            format!(
                "{}\n\nStudent context:\n{}",
                TUTOR_INSTRUCTION,
                lines.join("\n")
            )
        }
    }

    /// Request for a chat turn: recent history, then the new message.
    pub fn chat_request(
        &self,
        model: &str,
        message: &str,
        context: &ChatContext,
        history: &[ChatMessage],
    ) -> CompletionRequest {
        let start = history.len().saturating_sub(self.history_window);
        let mut messages: Vec<PromptMessage> =
            history[start..].iter().map(PromptMessage::from).collect();
        messages.push(PromptMessage::user(message));

        CompletionRequest::new()
            .with_model(model)
            .with_system(self.system_instruction(context))
            .with_messages(messages)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Request describing an image, optionally with the student's note.
    pub fn image_request(
        &self,
        model: &str,
        image: InlineImage,
        context: Option<&str>,
    ) -> CompletionRequest {
        let text = match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(note) => format!("{}\n\nThe student says: {}", IMAGE_INSTRUCTION, note),
            None => IMAGE_INSTRUCTION.to_string(),
        };

        CompletionRequest::new()
            .with_model(model)
            .with_system(TUTOR_INSTRUCTION)
            .with_message(PromptMessage::user(text))
            .with_image(image)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}
