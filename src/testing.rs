//! Recording collaborator doubles for unit tests.
use crate::error::{Error, Result, Service};
use crate::market::{Period, PriceSeries, PriceSource};
use crate::notion::{Fields, RecordHandle, TrackingDb};
use crate::openai::{ChatMessage, LanguageModel};
use crate::render::{ChartRenderer, VideoComposer};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

pub fn transient(service: Service) -> Error {
    Error::Transient {
        service,
        message: "HTTP 503: upstream unavailable".to_string(),
    }
}

pub fn unauthorized(service: Service) -> Error {
    Error::from_status(service, 401, "API token is invalid.".to_string())
}

/// Language model returning canned text after an optional run of failures.
pub struct ScriptedModel {
    reply: String,
    transient_failures: Cell<u32>,
    permanent: bool,
    calls: Cell<u32>,
    last: RefCell<Option<(String, String, f32)>>,
}

impl ScriptedModel {
    pub fn always(reply: &str) -> Self {
        Self::failing_then(reply, 0)
    }

    pub fn failing_then(reply: &str, failures: u32) -> Self {
        Self {
            reply: reply.to_string(),
            transient_failures: Cell::new(failures),
            permanent: false,
            calls: Cell::new(0),
            last: RefCell::new(None),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            permanent: true,
            ..Self::always("")
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    /// `(system, last user message, temperature)` of the latest call.
    pub fn last_request(&self) -> Option<(String, String, f32)> {
        self.last.borrow().clone()
    }
}

impl LanguageModel for ScriptedModel {
    fn complete(&self, system: &str, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        let user = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        *self.last.borrow_mut() = Some((system.to_string(), user, temperature));
        if self.permanent {
            return Err(unauthorized(Service::OpenAi));
        }
        if self.transient_failures.get() > 0 {
            self.transient_failures.set(self.transient_failures.get() - 1);
            return Err(transient(Service::OpenAi));
        }
        Ok(self.reply.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DbCall {
    UpdateFields { record_id: String, fields: Fields },
    AppendNote { record_id: String, text: String },
    CreateRecord { database_id: String, fields: Fields },
    Retrieve { record_id: String },
    Query { database_id: String, body: Value },
}

impl DbCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            DbCall::UpdateFields { .. } | DbCall::AppendNote { .. } | DbCall::CreateRecord { .. }
        )
    }
}

/// Tracking database that records every call and fails on request.
#[derive(Default)]
pub struct RecordingDb {
    calls: RefCell<Vec<DbCall>>,
    update_error: Option<fn() -> Error>,
    update_transient_failures: Cell<u32>,
    note_error: Option<fn() -> Error>,
    existing_row: Option<Value>,
}

impl RecordingDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_updates(mut self, error: fn() -> Error) -> Self {
        self.update_error = Some(error);
        self
    }

    pub fn flaky_updates(self, failures: u32) -> Self {
        self.update_transient_failures.set(failures);
        self
    }

    pub fn failing_notes(mut self, error: fn() -> Error) -> Self {
        self.note_error = Some(error);
        self
    }

    pub fn with_existing_row(mut self, page: Value) -> Self {
        self.existing_row = Some(page);
        self
    }

    pub fn calls(&self) -> Vec<DbCall> {
        self.calls.borrow().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls.borrow().iter().filter(|call| call.is_mutation()).count()
    }

    pub fn notes(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DbCall::AppendNote { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn updated_properties(&self) -> Vec<Fields> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DbCall::UpdateFields { fields, .. } => Some(fields.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: DbCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl TrackingDb for RecordingDb {
    fn update_fields(&self, record_id: &str, fields: &Fields) -> Result<Value> {
        self.record(DbCall::UpdateFields {
            record_id: record_id.to_string(),
            fields: fields.clone(),
        });
        if let Some(error) = self.update_error {
            return Err(error());
        }
        if self.update_transient_failures.get() > 0 {
            self.update_transient_failures
                .set(self.update_transient_failures.get() - 1);
            return Err(transient(Service::Notion));
        }
        Ok(json!({"object": "page", "id": record_id}))
    }

    fn append_note(&self, record_id: &str, text: &str) -> Result<Value> {
        self.record(DbCall::AppendNote {
            record_id: record_id.to_string(),
            text: text.to_string(),
        });
        match self.note_error {
            Some(error) => Err(error()),
            None => Ok(json!({"object": "comment"})),
        }
    }

    fn create_record(&self, database_id: &str, fields: &Fields) -> Result<RecordHandle> {
        self.record(DbCall::CreateRecord {
            database_id: database_id.to_string(),
            fields: fields.clone(),
        });
        Ok(RecordHandle {
            id: "new-page".to_string(),
            url: "https://www.notion.so/new-page".to_string(),
        })
    }

    fn retrieve_record(&self, record_id: &str) -> Result<Value> {
        self.record(DbCall::Retrieve {
            record_id: record_id.to_string(),
        });
        Ok(json!({"object": "page", "id": record_id, "properties": {}}))
    }

    fn query(&self, database_id: &str, body: &Value) -> Result<Value> {
        self.record(DbCall::Query {
            database_id: database_id.to_string(),
            body: body.clone(),
        });
        let results: Vec<Value> = self.existing_row.iter().cloned().collect();
        Ok(json!({"object": "list", "results": results}))
    }
}

/// Price source returning a fixed series, or `NoData` when none is set.
pub struct FakePrices {
    series: Option<PriceSeries>,
    calls: Cell<u32>,
}

impl FakePrices {
    pub fn with(series: PriceSeries) -> Self {
        Self {
            series: Some(series),
            calls: Cell::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            series: None,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl PriceSource for FakePrices {
    fn fetch(&self, ticker: &str, _period: Period) -> Result<PriceSeries> {
        self.calls.set(self.calls.get() + 1);
        self.series.clone().ok_or_else(|| Error::NoData {
            ticker: ticker.to_string(),
        })
    }
}

/// Chart renderer that writes a marker file and remembers titles.
#[derive(Default)]
pub struct RecordingChart {
    pub titles: RefCell<Vec<String>>,
}

impl ChartRenderer for RecordingChart {
    fn render(&self, series: &PriceSeries, title: &str, output: &Path) -> Result<()> {
        self.titles.borrow_mut().push(title.to_string());
        let body = format!("chart {} bars", series.bars().len());
        crate::util::write_with_parents(output, body.as_bytes())
    }
}

/// Video composer that never spawns anything.
#[derive(Default)]
pub struct RecordingComposer {
    pub calls: Cell<u32>,
    pub fail: bool,
}

impl VideoComposer for RecordingComposer {
    fn compose(&self, _image: &Path, _audio: &Path, output: &Path, _fps: u32) -> Result<PathBuf> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(Error::Render("ffmpeg exited with 1: broken".to_string()));
        }
        crate::util::write_with_parents(output, b"mp4")?;
        Ok(output.to_path_buf())
    }
}
