//! Pipeline steps: script, chart, video, the full run and the DOE task.
//!
//! A step either returns its artifact or fails. When a Notion page id is
//! known, a failing step leaves exactly one annotation on that page and the
//! original error is handed back to the caller. Nothing is rolled back.
mod chart;
mod doe;
mod run;
mod script;
mod video;

use crate::artifacts::ArtifactPaths;
use crate::config::RuntimeContext;
use crate::error::{Error, Result};
use crate::market::{Period, PriceSeries, PriceSource};
use crate::notion::Tracker;
use crate::openai::PromptGenerator;
use crate::render::{ChartRenderer, VideoComposer};
use crate::retry::RetryPolicy;

pub use chart::ChartRequest;
pub use doe::DoeRequest;
pub use run::RunRequest;
pub use script::ScriptRequest;
pub use video::{VideoRequest, DEFAULT_FPS};

pub const STATUS_SCRIPT_GENERATED: &str = "Script Generated";
pub const STATUS_CHART_GENERATED: &str = "Chart Generated";
pub const STATUS_VIDEO_RENDERED: &str = "Video Rendered";

/// Collaborators shared by every step of one invocation.
///
/// Optional collaborators are only required by live runs; dry-run never
/// touches them.
pub struct Pipeline<'a> {
    runtime: &'a RuntimeContext,
    artifacts: ArtifactPaths,
    generator: PromptGenerator<'a>,
    tracker: Tracker<'a>,
    chart: &'a dyn ChartRenderer,
    prices: Option<&'a dyn PriceSource>,
    composer: Option<&'a dyn VideoComposer>,
    fetch_policy: RetryPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        runtime: &'a RuntimeContext,
        artifacts: ArtifactPaths,
        generator: PromptGenerator<'a>,
        tracker: Tracker<'a>,
        chart: &'a dyn ChartRenderer,
    ) -> Self {
        Self {
            runtime,
            artifacts,
            generator,
            tracker,
            chart,
            prices: None,
            composer: None,
            fetch_policy: RetryPolicy::standard(),
        }
    }

    pub fn with_prices(mut self, prices: &'a dyn PriceSource) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn with_composer(mut self, composer: &'a dyn VideoComposer) -> Self {
        self.composer = Some(composer);
        self
    }

    #[cfg(test)]
    pub fn with_fetch_policy(mut self, policy: RetryPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Run `op` as one named step, annotating `record_id` on failure.
    fn step<T>(
        &self,
        record_id: Option<&str>,
        name: &str,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let span = tracing::info_span!("step", step = name, run_id = self.runtime.run_id());
        let _entered = span.enter();
        match op() {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::error!(error = %err, "step failed");
                if let Some(record_id) = record_id {
                    self.tracker.log_failure(record_id, &err);
                }
                Err(err)
            }
        }
    }

    fn fetch_prices(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        let prices = self
            .prices
            .ok_or_else(|| Error::InvalidConfig("no price source configured".to_string()))?;
        let series = self
            .fetch_policy
            .run("prices.fetch", || prices.fetch(ticker, period))?;
        if series.is_empty() {
            return Err(Error::NoData {
                ticker: ticker.to_string(),
            });
        }
        tracing::debug!(ticker, bars = series.bars().len(), "fetched price history");
        Ok(series)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
