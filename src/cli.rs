//! CLI argument parsing for the shorts pipeline.
//!
//! Global flags override the matching environment variables; everything else
//! comes from the environment or a `.env` file.
use crate::market::Period;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "shorts",
    version,
    about = "Japanese stock YouTube Shorts production pipeline",
    after_help = "Examples:\n  shorts --dry-run script 7203.T --company トヨタ自動車\n  shorts chart 7203.T --period 3mo\n  shorts video --image assets/charts/x_chart.png --audio voice.mp3\n  shorts run 7203.T --company トヨタ自動車 --audio voice.mp3 --page-id <notion page>\n  shorts doe\n  shorts snippet \"matplotlib candlestick chart for 7203.T\"\n  shorts page <notion page> --status \"Video Rendered\"\n  shorts health",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Skip paid and remote-mutating calls (overrides DRY_RUN)
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Run identifier used in artifact names (overrides RUN_ID)
    #[arg(long, global = true, value_name = "ID")]
    pub run_id: Option<String>,

    /// INFO, WARN, ERROR or DEBUG (overrides LOG_LEVEL)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Root directory for generated artifacts (overrides ASSETS_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a narration script from recent price action
    Script(ScriptArgs),
    /// Render a closing-price chart
    Chart(ChartArgs),
    /// Combine a chart image and narration audio into a video
    Video(VideoArgs),
    /// Script, chart and video in sequence, tracking status on a Notion page
    Run(RunArgs),
    /// Generate a short DOE explainer and store it in the artifacts database
    Doe(DoeArgs),
    /// Ask the coding model for a minimal runnable snippet
    Snippet(SnippetArgs),
    /// Show a tracking page, optionally setting its status or adding a comment
    Page(PageArgs),
    /// Check OpenAI and Notion credentials
    Health(HealthArgs),
}

#[derive(Parser, Debug)]
pub struct ScriptArgs {
    /// Ticker symbol, e.g. 7203.T
    pub ticker: String,

    /// Company name used in the narration (defaults to the ticker)
    #[arg(long)]
    pub company: Option<String>,

    /// Lookback window (1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max)
    #[arg(long, default_value = "1mo")]
    pub period: Period,

    /// Notion page to update with the script and status
    #[arg(long, value_name = "PAGE_ID")]
    pub page_id: Option<String>,

    /// Output path for the script (defaults to the assets layout)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ChartArgs {
    /// Ticker symbol, e.g. 7203.T
    pub ticker: String,

    /// Lookback window
    #[arg(long, default_value = "1mo")]
    pub period: Period,

    /// Output path for the chart image
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct VideoArgs {
    /// Still image shown for the whole video
    #[arg(long, value_name = "PATH")]
    pub image: PathBuf,

    /// Narration audio; the video lasts as long as this track
    #[arg(long, value_name = "PATH")]
    pub audio: PathBuf,

    /// Label for the derived output name (defaults to the image file stem)
    #[arg(long)]
    pub ticker: Option<String>,

    /// Output path for the mp4
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Frames per second
    #[arg(long, default_value_t = crate::pipeline::DEFAULT_FPS)]
    pub fps: u32,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Ticker symbol, e.g. 7203.T
    pub ticker: String,

    /// Company name used in the narration (defaults to the ticker)
    #[arg(long)]
    pub company: Option<String>,

    /// Lookback window
    #[arg(long, default_value = "1mo")]
    pub period: Period,

    /// Narration audio; without it the video step is skipped
    #[arg(long, value_name = "PATH")]
    pub audio: Option<PathBuf>,

    /// Notion page tracking this run
    #[arg(long, value_name = "PAGE_ID")]
    pub page_id: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DoeArgs {
    /// Video the explainer belongs to
    #[arg(long, default_value = "VID2025-09-001")]
    pub video_id: String,

    /// Artifact version number
    #[arg(long, default_value_t = 1)]
    pub version: u32,

    /// Artifacts database (overrides NOTION_DATABASE_ID)
    #[arg(long, value_name = "ID")]
    pub database_id: Option<String>,
}

#[derive(Parser, Debug)]
pub struct SnippetArgs {
    /// What the snippet should do
    pub instruction: String,

    /// Save the snippet here instead of printing it
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PageArgs {
    /// Notion page id
    pub page_id: String,

    /// New value for the Status property
    #[arg(long)]
    pub status: Option<String>,

    /// Comment to append to the page
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Parser, Debug)]
pub struct HealthArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
