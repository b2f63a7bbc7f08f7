//! Narration prompts and the dry-run aware completion front end.
use super::client::{ChatMessage, LanguageModel};
use crate::config::RuntimeContext;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

const SCRIPT_USER: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/script_user.md"
));
const SCRIPT_SYSTEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/script_system.md"
));

pub const DRY_RUN_SCRIPT: &str = "これはドライラン用のサンプル台本です。";
const SCRIPT_TEMPERATURE: f32 = 0.6;

/// Metadata used to build consistent prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub ticker: String,
    pub company_name: String,
    pub timeframe: String,
    pub call_to_action: String,
}

impl PromptContext {
    pub fn new(
        ticker: impl Into<String>,
        company_name: impl Into<String>,
        timeframe: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            company_name: company_name.into(),
            timeframe: timeframe.into(),
            call_to_action: "チャンネル登録と高評価もよろしくお願いします！".to_string(),
        }
    }
}

/// Composes prompts and fetches completions, honoring dry-run.
///
/// `model` is `None` in dry-run so no client (and no credential) is needed.
pub struct PromptGenerator<'a> {
    runtime: &'a RuntimeContext,
    model: Option<&'a dyn LanguageModel>,
    policy: RetryPolicy,
}

impl<'a> PromptGenerator<'a> {
    pub fn new(runtime: &'a RuntimeContext, model: Option<&'a dyn LanguageModel>) -> Self {
        Self {
            runtime,
            model,
            policy: RetryPolicy::language_model(),
        }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build_script_prompt(&self, context: &PromptContext, stock_summary: &str) -> String {
        let prompt = SCRIPT_USER
            .replace("{ticker}", &context.ticker)
            .replace("{company_name}", &context.company_name)
            .replace("{timeframe}", &context.timeframe)
            .replace("{stock_summary}", stock_summary)
            .replace("{call_to_action}", &context.call_to_action);
        tracing::debug!(prompt = %prompt, "built script prompt");
        prompt
    }

    /// Completion with retry; `placeholder` is returned verbatim in dry-run.
    pub fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        temperature: f32,
        placeholder: &str,
    ) -> Result<String> {
        if self.runtime.dry_run() {
            tracing::info!("[dry-run] Skipping OpenAI request; returning placeholder content");
            return Ok(placeholder.to_string());
        }
        let model = self.model.ok_or(Error::MissingConfig("OPENAI_API_KEY"))?;
        self.policy.run("openai.complete", || {
            model.complete(system, messages, temperature)
        })
    }

    pub fn generate_script(&self, context: &PromptContext, stock_summary: &str) -> Result<String> {
        let prompt = self.build_script_prompt(context, stock_summary);
        self.complete(
            SCRIPT_SYSTEM.trim(),
            &[ChatMessage::user(prompt)],
            SCRIPT_TEMPERATURE,
            DRY_RUN_SCRIPT,
        )
    }
}
