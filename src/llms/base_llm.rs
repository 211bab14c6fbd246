//! Model invocation capability.
//!
//! Agents hold an `Arc<dyn BaseLLM>` and call it once per task. How the
//! call reaches a model (HTTP, local inference, a test stub) and whether it
//! retries are up to the implementation; the crew only sees the final text
//! or an [`InvocationError`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utilities::errors::InvocationError;

/// A single chat message sent to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMMessage {
    /// Role of the sender (`system`, `user` or `assistant`).
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Something that can turn instructions into a model response.
///
/// `call` may block on network I/O. Implementations must be shareable
/// across threads because a crew can be run from a blocking worker.
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Model identifier, used in logs.
    fn model(&self) -> &str;

    /// Provider name, used in logs.
    fn provider(&self) -> &str {
        "custom"
    }

    /// Invoke the model with the task instructions and optional context
    /// from earlier tasks. Returns the raw response text.
    fn call(&self, instructions: &str, context: Option<&str>) -> Result<String, InvocationError>;
}

/// Header placed before context from earlier tasks.
pub const CONTEXT_HEADER: &str = "This is the context you're working with:";

/// Fold optional context into the instructions as a single prompt.
pub fn format_prompt(instructions: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.trim().is_empty() => {
            format!("{}\n\n{}\n{}", instructions, CONTEXT_HEADER, ctx)
        }
        _ => instructions.to_string(),
    }
}

/// Split an agent prompt into chat messages: an optional system preamble
/// and the user prompt with context folded in.
pub fn build_messages(system: Option<&str>, instructions: &str, context: Option<&str>) -> Vec<LLMMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
        messages.push(LLMMessage::system(system));
    }
    messages.push(LLMMessage::user(format_prompt(instructions, context)));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prompt_without_context() {
        assert_eq!(format_prompt("Score the candidate", None), "Score the candidate");
        assert_eq!(format_prompt("Score the candidate", Some("  ")), "Score the candidate");
    }

    #[test]
    fn test_format_prompt_with_context() {
        let prompt = format_prompt("Score the candidate", Some("Research notes"));
        assert_eq!(
            prompt,
            "Score the candidate\n\nThis is the context you're working with:\nResearch notes"
        );
    }

    #[test]
    fn test_build_messages() {
        let messages = build_messages(Some("You are HR"), "Score", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], LLMMessage::system("You are HR"));
        assert_eq!(messages[1].role, "user");

        let messages = build_messages(None, "Score", Some("ctx"));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.ends_with("ctx"));
    }
}
