use super::{Pipeline, STATUS_SCRIPT_GENERATED};
use crate::artifacts::ArtifactKind;
use crate::error::Result;
use crate::market::{dry_run_summary, summarize, validate_ticker, Period};
use crate::openai::PromptContext;
use crate::util::{display_path, write_with_parents};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub ticker: String,
    pub company_name: String,
    pub period: Period,
    pub record_id: Option<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub path: PathBuf,
    pub script: String,
}

impl Pipeline<'_> {
    /// Summarize prices, ask for narration, save it and mark the page.
    pub fn generate_script(&self, request: &ScriptRequest) -> Result<ScriptOutcome> {
        let record_id = request.record_id.as_deref();
        self.step(record_id, "script", || {
            validate_ticker(&request.ticker)?;
            let summary = if self.runtime.dry_run() {
                dry_run_summary(&request.ticker, request.period)
            } else {
                let series = self.fetch_prices(&request.ticker, request.period)?;
                summarize(&series, request.period)?
            };
            let context = PromptContext::new(
                &request.ticker,
                &request.company_name,
                request.period.as_str(),
            );
            let script = self.generator.generate_script(&context, &summary)?;

            let path = self
                .artifacts
                .resolve(request.output.as_deref(), ArtifactKind::Script, &request.ticker);
            write_with_parents(&path, script.as_bytes())?;
            tracing::info!(
                ticker = %request.ticker,
                path = %display_path(&path, Some(self.artifacts.root())),
                "script written"
            );

            if let Some(record_id) = record_id {
                self.tracker.record_script(record_id, &script)?;
                self.tracker.update_status(record_id, STATUS_SCRIPT_GENERATED)?;
            }
            Ok(ScriptOutcome { path, script })
        })
    }
}
