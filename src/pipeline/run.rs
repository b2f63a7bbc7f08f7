use super::{
    ChartRequest, Pipeline, ScriptRequest, VideoRequest, DEFAULT_FPS, STATUS_CHART_GENERATED,
    STATUS_VIDEO_RENDERED,
};
use crate::error::Result;
use crate::market::Period;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub ticker: String,
    pub company_name: String,
    pub period: Period,
    pub audio: Option<PathBuf>,
    pub record_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub script: PathBuf,
    pub chart: PathBuf,
    pub video: Option<PathBuf>,
}

impl Pipeline<'_> {
    /// Script, chart and (with narration audio) video for one ticker.
    pub fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        let record_id = request.record_id.as_deref();
        tracing::info!(ticker = %request.ticker, run_id = self.runtime.run_id(), "starting run");

        let script = self.generate_script(&ScriptRequest {
            ticker: request.ticker.clone(),
            company_name: request.company_name.clone(),
            period: request.period,
            record_id: request.record_id.clone(),
            output: None,
        })?;

        let chart = self.step(record_id, "chart", || {
            let path = self.create_price_chart(&ChartRequest {
                ticker: request.ticker.clone(),
                period: request.period,
                output: None,
            })?;
            if let Some(record_id) = record_id {
                self.tracker.update_status(record_id, STATUS_CHART_GENERATED)?;
            }
            Ok(path)
        })?;

        let video = match &request.audio {
            Some(audio) => Some(self.step(record_id, "video", || {
                let path = self.assemble_video(&VideoRequest {
                    label: request.ticker.clone(),
                    image: chart.clone(),
                    audio: audio.clone(),
                    output: None,
                    fps: DEFAULT_FPS,
                })?;
                if let Some(record_id) = record_id {
                    self.tracker.update_status(record_id, STATUS_VIDEO_RENDERED)?;
                }
                Ok(path)
            })?),
            None => {
                tracing::info!(ticker = %request.ticker, "no narration audio; skipping video");
                None
            }
        };

        Ok(RunOutcome {
            script: script.path,
            chart,
            video,
        })
    }
}
