//! Code-snippet requests against a coding-capable model.
use super::client::ChatMessage;
use super::prompt::PromptGenerator;
use crate::error::Result;

pub const DRY_RUN_SNIPPET: &str = "# dry-run placeholder";
const SNIPPET_SYSTEM: &str = "You generate minimal, runnable Python scripts without explanations.";
const SNIPPET_TEMPERATURE: f32 = 0.2;

/// Ask for a snippet (chart builders, ffmpeg command templates, ...).
///
/// The response is returned verbatim so callers can save or execute it.
pub fn request_snippet(generator: &PromptGenerator<'_>, instruction: &str) -> Result<String> {
    tracing::info!("requesting code snippet");
    generator.complete(
        SNIPPET_SYSTEM,
        &[ChatMessage::user(instruction)],
        SNIPPET_TEMPERATURE,
        DRY_RUN_SNIPPET,
    )
}
