//! Keep Notion pages in sync with pipeline progress.
//!
//! The tracker owns the call-site policies: property updates and reads retry
//! with the standard policy, comments get two attempts, page creation and
//! failure annotations get exactly one. In dry-run no mutation reaches the
//! database and a placeholder confirmation is returned instead.
use super::client::{Fields, RecordHandle, TrackingDb};
use super::properties;
use crate::config::RuntimeContext;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use serde_json::{json, Value};
use std::fmt::Display;

pub const STATUS_PROPERTY: &str = "Status";
pub const SCRIPT_PROPERTY: &str = "Script";

pub struct Tracker<'a> {
    db: Option<&'a dyn TrackingDb>,
    runtime: &'a RuntimeContext,
    update_policy: RetryPolicy,
    comment_policy: RetryPolicy,
}

impl<'a> Tracker<'a> {
    /// `db` may be `None` only when every call will be a dry-run skip.
    pub fn new(runtime: &'a RuntimeContext, db: Option<&'a dyn TrackingDb>) -> Self {
        Self {
            db,
            runtime,
            update_policy: RetryPolicy::standard(),
            comment_policy: RetryPolicy::comment(),
        }
    }

    #[cfg(test)]
    pub fn with_policies(mut self, update: RetryPolicy, comment: RetryPolicy) -> Self {
        self.update_policy = update;
        self.comment_policy = comment;
        self
    }

    fn db(&self) -> Result<&'a dyn TrackingDb> {
        self.db.ok_or(Error::MissingConfig("NOTION_API_KEY"))
    }

    /// Update one or more properties on a page.
    pub fn update_fields(&self, record_id: &str, fields: Fields) -> Result<Value> {
        if self.runtime.dry_run() {
            tracing::info!(record_id, "[dry-run] Skipping Notion property update");
            return Ok(json!({"dry_run": true, "page_id": record_id, "properties": fields}));
        }
        let db = self.db()?;
        self.update_policy
            .run("notion.update_fields", || db.update_fields(record_id, &fields))
    }

    /// Update a single property. `value` follows Notion's property schema.
    pub fn update_property(&self, record_id: &str, name: &str, value: Value) -> Result<Value> {
        tracing::info!(record_id, property = name, "updating property");
        let mut fields = Fields::new();
        fields.insert(name.to_string(), value);
        self.update_fields(record_id, fields)
    }

    pub fn update_status(&self, record_id: &str, status_name: &str) -> Result<Value> {
        tracing::info!(record_id, status = status_name, "status update");
        self.update_property(record_id, STATUS_PROPERTY, properties::status(status_name))
    }

    /// Persist a generated script back to the page.
    pub fn record_script(&self, record_id: &str, script: &str) -> Result<Value> {
        tracing::info!(record_id, "recording generated script");
        self.update_property(record_id, SCRIPT_PROPERTY, properties::rich_text(script))
    }

    pub fn comment(&self, record_id: &str, text: &str) -> Result<Value> {
        self.note(record_id, text, self.comment_policy)
    }

    fn note(&self, record_id: &str, text: &str, policy: RetryPolicy) -> Result<Value> {
        if self.runtime.dry_run() {
            tracing::info!(record_id, "[dry-run] Skipping Notion comment append");
            return Ok(json!({"dry_run": true, "page_id": record_id, "content": text}));
        }
        let db = self.db()?;
        policy.run("notion.append_note", || db.append_note(record_id, text))
    }

    /// Best-effort failure annotation: one attempt, errors logged and dropped.
    pub fn log_failure(&self, record_id: &str, failure: &dyn Display) {
        tracing::error!(record_id, error = %failure, "logging failure to Notion");
        let message = format!("run_id={}: {}", self.runtime.run_id(), failure);
        if let Err(err) = self.note(record_id, &message, RetryPolicy::single()) {
            tracing::error!(record_id, error = %err, "failed to log exception to Notion");
        }
    }

    pub fn retrieve(&self, record_id: &str) -> Result<Value> {
        let db = self.db()?;
        self.update_policy
            .run("notion.retrieve_record", || db.retrieve_record(record_id))
    }

    /// Create a row, or update the existing one whose `key_property`
    /// rich-text equals `key`. Retrying this whole call never duplicates rows.
    pub fn upsert_record(
        &self,
        database_id: &str,
        key_property: &str,
        key: &str,
        fields: Fields,
    ) -> Result<RecordHandle> {
        if self.runtime.dry_run() {
            tracing::info!(database_id, key, "[dry-run] Skipping Notion row upsert");
            return Ok(RecordHandle {
                id: format!("dry-run-{key}"),
                url: String::new(),
            });
        }
        let db = self.db()?;
        let filter = json!({
            "filter": {"property": key_property, "rich_text": {"equals": key}},
            "page_size": 1,
        });
        let found = self
            .update_policy
            .run("notion.query", || db.query(database_id, &filter))?;
        let existing = found
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first());
        match existing {
            Some(page) => {
                let handle = RecordHandle::from_page(page)?;
                tracing::info!(database_id, record_id = %handle.id, key, "updating existing row");
                self.update_policy
                    .run("notion.update_fields", || db.update_fields(&handle.id, &fields))?;
                Ok(handle)
            }
            None => {
                tracing::info!(database_id, key, "creating new row");
                RetryPolicy::single().run("notion.create_record", || {
                    db.create_record(database_id, &fields)
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
