//! Final reply assembly for the deterministic path.
//!
//! A deterministic reply is always:
//!
//! ```text
//! <answer body>
//!
//! <context annotation, only when the caller supplied context>
//!
//! <closing study tip>
//! ```
//!
//! Replies generated by the remote provider are returned as-is and never
//! pass through here.

use crate::context::ChatContext;

/// Closing block appended to every deterministic reply.
pub const STUDY_TIP: &str = "💡 Study tip: Review this again tomorrow and try explaining it in your own words. Teaching an idea is one of the best ways to learn it.";

/// Assembles deterministic replies and the image placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    /// Body, then the context annotation (if any), then the study tip.
    pub fn compose(&self, body: &str, context: &ChatContext) -> String {
        let mut sections = vec![body.trim_end().to_string()];
        if let Some(annotation) = self.context_annotation(context) {
            sections.push(annotation);
        }
        sections.push(STUDY_TIP.to_string());
        sections.join("\n\n")
    }

    /// The "Since you're studying ..." block, or `None` for an empty context.
    pub fn context_annotation(&self, context: &ChatContext) -> Option<String> {
        let focus = match (context.subject(), context.topic()) {
            (Some(subject), Some(topic)) => Some(format!(
                "📚 Since you're studying {} (currently on {}), try linking this back to what you've covered in class.",
                subject, topic
            )),
            (Some(subject), None) => Some(format!(
                "📚 Since you're studying {}, try linking this back to what you've covered in class.",
                subject
            )),
            (None, Some(topic)) => Some(format!(
                "📚 Since you're working on {}, try linking this back to what you've covered in class.",
                topic
            )),
            (None, None) => None,
        };

        let test = context.recent_test().map(|test| {
            format!(
                "📝 Your recent test on {} is a good place to check how well this has sunk in.",
                test
            )
        });

        match (focus, test) {
            (Some(focus), Some(test)) => Some(format!("{}\n{}", focus, test)),
            (focus, test) => focus.or(test),
        }
    }

    /// Placeholder description of an image; no real image understanding.
    ///
    /// `image_size` is the decoded payload size when the image could be read.
    pub fn describe_image(&self, image_size: Option<usize>, context: Option<&str>) -> String {
        let opening = match image_size {
            Some(size) => format!(
                "Thanks for sharing your image ({})! I can't examine its details right now, but I'm happy to help you work through it.",
                format_size(size)
            ),
            None => "Thanks for sharing your image! I wasn't able to open it, but I'm happy to help you work through what it shows.".to_string(),
        };

        let context_line = match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => format!(
                "You mentioned: \"{}\". Let's use that as our starting point.",
                context
            ),
            None => "Let me know what you'd like to learn from it.".to_string(),
        };

        let guidance = "To help me help you:\n\
                        • Describe what the image shows (a diagram, a worked problem, your notes)\n\
                        • Type out any equations or questions it contains\n\
                        • Tell me which part you're stuck on";

        [opening, context_line, guidance.to_string(), STUDY_TIP.to_string()].join("\n\n")
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
