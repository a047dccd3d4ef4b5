//! Conversation types consumed by the tutor.
//!
//! The caller owns persistence: these types only describe what a single
//! request carries (the new message, an optional [`ChatContext`], and the
//! recent [`ChatHistory`]).
//!
//! ```rust,ignore
//! use tutor_core::context::{ChatContext, ChatHistory, ChatMessage};
//!
//! let mut history = ChatHistory::new();
//! history.push(ChatMessage::user("What is photosynthesis?"));
//!
//! let ctx = ChatContext::new().with_subject("Biology");
//! let recent = history.recent(10);
//! ```

mod types;

pub use types::{ChatContext, ChatHistory, ChatMessage, Role, DEFAULT_HISTORY_WINDOW};
