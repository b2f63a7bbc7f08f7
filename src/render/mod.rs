//! Local artifact renderers: chart image and video.
mod chart;
mod video;

use crate::error::Result;
use crate::market::PriceSeries;
use std::path::{Path, PathBuf};

pub use chart::PixmapChart;
pub use video::FfmpegComposer;

pub trait ChartRenderer {
    fn render(&self, series: &PriceSeries, title: &str, output: &Path) -> Result<()>;
}

pub trait VideoComposer {
    /// Loop `image` for the length of `audio` and write `output`.
    fn compose(&self, image: &Path, audio: &Path, output: &Path, fps: u32) -> Result<PathBuf>;
}
