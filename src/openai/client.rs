//! OpenAI chat-completions client.
//!
//! Each method is a single HTTP attempt. Callers wrap them in a
//! [`crate::retry::RetryPolicy`] at the call site.
use crate::config::Settings;
use crate::error::{Error, Result, Service};
use crate::http;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text generation collaborator.
pub trait LanguageModel {
    /// One completion call: the system prompt followed by `messages`.
    fn complete(&self, system: &str, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client for `model`; fails fast when the API key is absent.
    pub fn from_settings(settings: &Settings, model: &str) -> Result<Self> {
        let api_key = settings.require_openai_key()?.to_string();
        Ok(Self {
            agent: http::agent(),
            api_key,
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Number of models visible to the key.
    pub fn list_models(&self) -> Result<usize> {
        let url = format!("{}/models", self.base_url);
        let sent = self.agent.get(&url).header("Authorization", self.bearer()).call();
        let value = http::json_response(Service::OpenAi, sent)?;
        value
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| Error::Decode {
                service: Service::OpenAi,
                message: "models response missing data array".to_string(),
            })
    }
}

impl LanguageModel for OpenAiClient {
    fn complete(&self, system: &str, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let request = build_request(&self.model, system, messages, temperature);
        tracing::info!(
            model = %self.model,
            messages = request.messages.len(),
            "requesting completion"
        );
        let url = format!("{}/chat/completions", self.base_url);
        let sent = self
            .agent
            .post(&url)
            .header("Authorization", self.bearer())
            .send_json(&request);
        let value = http::json_response(Service::OpenAi, sent)?;
        parse_completion(value)
    }
}

fn build_request<'a>(
    model: &'a str,
    system: &str,
    messages: &[ChatMessage],
    temperature: f32,
) -> ChatRequest<'a> {
    let mut all = Vec::with_capacity(messages.len() + 1);
    all.push(ChatMessage::system(system));
    all.extend(messages.iter().cloned());
    ChatRequest {
        model,
        messages: all,
        temperature,
    }
}

fn parse_completion(value: Value) -> Result<String> {
    let response: ChatResponse = serde_json::from_value(value).map_err(|err| Error::Decode {
        service: Service::OpenAi,
        message: err.to_string(),
    })?;
    let choice = response.choices.into_iter().next().ok_or_else(|| Error::Decode {
        service: Service::OpenAi,
        message: "completion returned no choices".to_string(),
    })?;
    Ok(choice.message.content.unwrap_or_default())
}
