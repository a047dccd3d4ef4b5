//! A single student's conversation with the tutor.

use std::sync::Arc;

use crate::context::{ChatContext, ChatHistory, ChatMessage, DEFAULT_HISTORY_WINDOW};
use crate::image::ImageData;
use crate::orchestrator::Tutor;
use crate::responder::TutorReply;

/// Owns a message log and context, and feeds the recent window to a
/// shared [`Tutor`].
///
/// Sends take `&mut self`, so turns within one session are serialized.
#[derive(Debug)]
pub struct TutorSession {
    tutor: Arc<Tutor>,
    history: ChatHistory,
    context: ChatContext,
    window: usize,
}

impl TutorSession {
    pub fn new(tutor: Arc<Tutor>) -> Self {
        Self {
            tutor,
            history: ChatHistory::new(),
            context: ChatContext::new(),
            window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Resume from an existing log.
    pub fn with_history(mut self, history: ChatHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_context(mut self, context: ChatContext) -> Self {
        self.context = context;
        self
    }

    pub fn set_context(&mut self, context: ChatContext) {
        self.context = context;
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Send a message and return the reply text.
    pub async fn send(&mut self, message: &str) -> String {
        self.send_with_source(message).await.text
    }

    /// Send a message and return the full reply.
    ///
    /// The log is only updated once the reply is ready, so a cancelled
    /// send leaves it unchanged.
    pub async fn send_with_source(&mut self, message: &str) -> TutorReply {
        let user = ChatMessage::user(message);
        let context = (!self.context.is_empty()).then_some(&self.context);
        let reply = self
            .tutor
            .generate_reply(message, context, self.history.recent(self.window))
            .await;

        self.history.push(user);
        self.history.push(ChatMessage::assistant(reply.text.clone()));
        reply
    }

    /// Describe an image. Image turns are not recorded in the log.
    pub async fn analyze_image(&self, image: &ImageData, note: Option<&str>) -> String {
        self.tutor.analyze_image(image, note).await
    }
}
