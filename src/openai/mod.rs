//! OpenAI wrappers for narration and code generation.
mod client;
mod prompt;
mod snippet;

pub use client::{ChatMessage, LanguageModel, OpenAiClient};
pub use prompt::{PromptContext, PromptGenerator};
pub use snippet::request_snippet;
