//! Notion REST client.
//!
//! Every method is one HTTP attempt; retry and dry-run are applied by
//! [`super::Tracker`].
use super::properties::text_segments;
use crate::config::Settings;
use crate::error::{Error, Result, Service};
use crate::http;
use serde_json::{json, Map, Value};

const NOTION_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

pub type Fields = Map<String, Value>;

/// Identity of a created page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHandle {
    pub id: String,
    pub url: String,
}

impl RecordHandle {
    pub(crate) fn from_page(page: &Value) -> Result<Self> {
        let id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Decode {
                service: Service::Notion,
                message: "page object missing id".to_string(),
            })?;
        let url = page.get("url").and_then(Value::as_str).unwrap_or_default();
        Ok(Self {
            id: id.to_string(),
            url: url.to_string(),
        })
    }
}

/// Tracking-database collaborator.
pub trait TrackingDb {
    fn update_fields(&self, record_id: &str, fields: &Fields) -> Result<Value>;
    fn append_note(&self, record_id: &str, text: &str) -> Result<Value>;
    fn create_record(&self, database_id: &str, fields: &Fields) -> Result<RecordHandle>;
    fn retrieve_record(&self, record_id: &str) -> Result<Value>;
    fn query(&self, database_id: &str, body: &Value) -> Result<Value>;
}

pub struct NotionClient {
    agent: ureq::Agent,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let token = settings.require_notion_key()?.to_string();
        Ok(Self {
            agent: http::agent(),
            token,
            base_url: NOTION_BASE_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get(&self, path: &str) -> Result<Value> {
        let sent = self
            .agent
            .get(&self.url(path))
            .header("Authorization", self.bearer())
            .header("Notion-Version", NOTION_VERSION)
            .call();
        http::json_response(Service::Notion, sent)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let sent = self
            .agent
            .post(&self.url(path))
            .header("Authorization", self.bearer())
            .header("Notion-Version", NOTION_VERSION)
            .send_json(body);
        http::json_response(Service::Notion, sent)
    }

    fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        let sent = self
            .agent
            .patch(&self.url(path))
            .header("Authorization", self.bearer())
            .header("Notion-Version", NOTION_VERSION)
            .send_json(body);
        http::json_response(Service::Notion, sent)
    }

    /// The integration's bot user.
    pub fn whoami(&self) -> Result<Value> {
        self.get("users/me")
    }
}

impl TrackingDb for NotionClient {
    fn update_fields(&self, record_id: &str, fields: &Fields) -> Result<Value> {
        tracing::info!(record_id, "updating properties on Notion page");
        tracing::debug!(keys = ?fields.keys().collect::<Vec<_>>(), "properties payload keys");
        self.patch(&format!("pages/{record_id}"), &json!({"properties": fields}))
    }

    fn append_note(&self, record_id: &str, text: &str) -> Result<Value> {
        tracing::info!(record_id, "appending comment to Notion page");
        self.post("comments", &comment_body(record_id, text))
    }

    fn create_record(&self, database_id: &str, fields: &Fields) -> Result<RecordHandle> {
        tracing::info!(database_id, "creating Notion page");
        let body = json!({
            "parent": {"database_id": database_id},
            "properties": fields,
        });
        let page = self.post("pages", &body)?;
        RecordHandle::from_page(&page)
    }

    fn retrieve_record(&self, record_id: &str) -> Result<Value> {
        tracing::debug!(record_id, "retrieving Notion page");
        self.get(&format!("pages/{record_id}"))
    }

    fn query(&self, database_id: &str, body: &Value) -> Result<Value> {
        tracing::debug!(database_id, "querying Notion database");
        self.post(&format!("databases/{database_id}/query"), body)
    }
}

fn comment_body(record_id: &str, text: &str) -> Value {
    json!({
        "parent": {"page_id": record_id},
        "rich_text": text_segments(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_body_targets_page() {
        assert_eq!(
            comment_body("page-1", "boom"),
            json!({
                "parent": {"page_id": "page-1"},
                "rich_text": [{"type": "text", "text": {"content": "boom"}}]
            })
        );
    }

    #[test]
    fn record_handle_reads_id_and_url() {
        let page = json!({"object": "page", "id": "abc", "url": "https://www.notion.so/abc"});
        assert_eq!(
            RecordHandle::from_page(&page).expect("handle"),
            RecordHandle {
                id: "abc".to_string(),
                url: "https://www.notion.so/abc".to_string()
            }
        );
        assert!(RecordHandle::from_page(&json!({"object": "page"})).is_err());
    }

    #[test]
    fn client_requires_token() {
        let settings = Settings::from_lookup(|_| None);
        assert!(matches!(
            NotionClient::from_settings(&settings),
            Err(Error::MissingConfig("NOTION_API_KEY"))
        ));
    }
}
