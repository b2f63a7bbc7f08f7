//! Credential and connectivity checks for the remote services.
use crate::error::Result;
use crate::notion::NotionClient;
use crate::openai::OpenAiClient;
use crate::retry::RetryPolicy;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub openai_models: usize,
    pub notion_user: String,
}

impl HealthReport {
    pub fn lines(&self) -> [String; 2] {
        [
            format!("OpenAI OK: {} models available", self.openai_models),
            format!("Notion OK: user={}", self.notion_user),
        ]
    }
}

/// Both services must answer; the first failure is returned.
pub fn check(openai: &OpenAiClient, notion: &NotionClient) -> Result<HealthReport> {
    let policy = RetryPolicy::standard();
    let openai_models = policy.run("openai.list_models", || openai.list_models())?;
    tracing::info!(models = openai_models, "OpenAI reachable");
    let user = policy.run("notion.whoami", || notion.whoami())?;
    let notion_user = user_name(&user);
    tracing::info!(user = %notion_user, "Notion reachable");
    Ok(HealthReport {
        openai_models,
        notion_user,
    })
}

/// Display name of a Notion user object, falling back to its id.
fn user_name(user: &Value) -> String {
    user.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .or_else(|| user.get("id").and_then(Value::as_str))
        .unwrap_or("unknown")
        .to_string()
}
