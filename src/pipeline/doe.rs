//! Beginner explainer for DOE (dividend on equity), stored as a script artifact row.
use super::Pipeline;
use crate::error::Result;
use crate::notion::{properties, Fields, RecordHandle};
use crate::openai::ChatMessage;
use chrono::NaiveDate;

const DOE_SYSTEM: &str = "You are a concise Japanese tutor for finance beginners.";
const DOE_PROMPT: &str = "DOEを株初心者向けに60字で説明してください。必ず60字以内の日本語で。";
const DOE_TEMPERATURE: f32 = 0.4;
const DOE_PLACEHOLDER: &str = "DOEは株主資本に対して会社がどれだけ配当を出したかを示す指標です。";
const EXPLANATION_MAX_CHARS: usize = 60;

const KEY_PROPERTY: &str = "artifact_id";

#[derive(Debug, Clone)]
pub struct DoeRequest {
    pub database_id: String,
    pub video_id: String,
    pub version: u32,
    pub date: NaiveDate,
}

impl DoeRequest {
    pub fn artifact_id(&self) -> String {
        format!("{}_script_v{}", self.video_id, self.version)
    }
}

#[derive(Debug, Clone)]
pub struct DoeOutcome {
    pub explanation: String,
    pub record: RecordHandle,
}

impl Pipeline<'_> {
    pub fn explain_doe(&self, request: &DoeRequest) -> Result<DoeOutcome> {
        let explanation = self
            .generator
            .complete(
                DOE_SYSTEM,
                &[ChatMessage::user(DOE_PROMPT)],
                DOE_TEMPERATURE,
                DOE_PLACEHOLDER,
            )?
            .trim()
            .to_string();
        let chars = explanation.chars().count();
        if chars > EXPLANATION_MAX_CHARS {
            tracing::warn!(
                chars,
                limit = EXPLANATION_MAX_CHARS,
                "explanation exceeds length limit"
            );
        }
        tracing::info!(explanation = %explanation, "DOE explanation generated");

        let artifact_id = request.artifact_id();
        let fields = doe_fields(request, &artifact_id, &explanation);
        let record = self
            .tracker
            .upsert_record(&request.database_id, KEY_PROPERTY, &artifact_id, fields)?;
        Ok(DoeOutcome {
            explanation,
            record,
        })
    }
}

fn doe_fields(request: &DoeRequest, artifact_id: &str, explanation: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(
        "Name".to_string(),
        properties::title(&format!("DOE_script_{}", request.date.format("%Y-%m-%d"))),
    );
    fields.insert(KEY_PROPERTY.to_string(), properties::rich_text(artifact_id));
    fields.insert("artifact_type".to_string(), properties::select("script"));
    fields.insert("content".to_string(), properties::rich_text(explanation));
    fields.insert("status".to_string(), properties::status("generated"));
    fields.insert("version".to_string(), properties::number(f64::from(request.version)));
    fields.insert("video_id".to_string(), properties::rich_text(&request.video_id));
    fields
}
