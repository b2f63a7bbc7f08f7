use super::Pipeline;
use crate::artifacts::ArtifactKind;
use crate::error::Result;
use crate::market::{validate_ticker, Period, PriceSeries};
use crate::util::display_path;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub ticker: String,
    pub period: Period,
    pub output: Option<PathBuf>,
}

impl Pipeline<'_> {
    /// Closing-price line chart for the period; returns the image path.
    pub fn create_price_chart(&self, request: &ChartRequest) -> Result<PathBuf> {
        validate_ticker(&request.ticker)?;
        let series = if self.runtime.dry_run() {
            tracing::info!(ticker = %request.ticker, "[dry-run] Using placeholder price series");
            PriceSeries::placeholder(&request.ticker, chrono::Utc::now().date_naive())
        } else {
            self.fetch_prices(&request.ticker, request.period)?
        };
        let title = format!("{} closing price ({})", request.ticker, request.period);
        let path = self
            .artifacts
            .resolve(request.output.as_deref(), ArtifactKind::Chart, &request.ticker);
        self.chart.render(&series, &title, &path)?;
        tracing::info!(
            ticker = %request.ticker,
            path = %display_path(&path, Some(self.artifacts.root())),
            "chart saved"
        );
        Ok(path)
    }
}
