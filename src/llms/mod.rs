//! Model invocation: the [`BaseLLM`] capability and its providers.

pub mod base_llm;
pub mod providers;

pub use base_llm::{BaseLLM, LLMMessage};
pub use providers::openai::OpenAICompletion;
