use anyhow::{Context, Result};
use clap::Parser;

mod artifacts;
mod cli;
mod config;
mod error;
mod health;
mod http;
mod market;
mod notion;
mod openai;
mod pipeline;
mod render;
mod retry;
#[cfg(test)]
mod testing;
mod util;

use artifacts::ArtifactPaths;
use cli::{
    ChartArgs, Command, DoeArgs, HealthArgs, PageArgs, RootArgs, RunArgs, ScriptArgs, SnippetArgs,
    VideoArgs,
};
use config::{ContextOverrides, LogLevel, RuntimeContext, Settings};
use market::YahooChart;
use notion::{NotionClient, TrackingDb, Tracker};
use openai::{LanguageModel, OpenAiClient, PromptGenerator};
use pipeline::{ChartRequest, DoeRequest, Pipeline, RunRequest, ScriptRequest, VideoRequest};
use render::{FfmpegComposer, PixmapChart};
use std::path::Path;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    let _ = dotenvy::dotenv();

    let lookup = |key: &str| std::env::var(key).ok();
    let runtime = RuntimeContext::from_lookup(
        lookup,
        ContextOverrides {
            dry_run: args.dry_run.then_some(true),
            run_id: args.run_id.clone(),
            log_level: args.log_level.clone(),
        },
    )
    .context("resolve runtime context")?;
    init_tracing(runtime.log_level());

    let mut settings = Settings::from_lookup(lookup);
    if let Some(dir) = args.assets_dir {
        settings.assets_dir = dir;
    }
    tracing::debug!(?settings, "settings resolved");
    tracing::info!(run_id = runtime.run_id(), dry_run = runtime.dry_run(), "shorts starting");

    match args.command {
        Command::Script(args) => cmd_script(&runtime, &settings, args),
        Command::Chart(args) => cmd_chart(&runtime, &settings, args),
        Command::Video(args) => cmd_video(&runtime, &settings, args),
        Command::Run(args) => cmd_run(&runtime, &settings, args),
        Command::Doe(args) => cmd_doe(&runtime, &settings, args),
        Command::Snippet(args) => cmd_snippet(&runtime, &settings, args),
        Command::Page(args) => cmd_page(&runtime, &settings, args),
        Command::Health(args) => cmd_health(&settings, args),
    }
}

/// `RUST_LOG` wins when set; otherwise the run's log level. Logs go to stderr.
fn init_tracing(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Live collaborators for one command. Dry-run leaves every slot empty.
#[derive(Default)]
struct Clients {
    openai: Option<OpenAiClient>,
    notion: Option<NotionClient>,
    prices: Option<YahooChart>,
    composer: Option<FfmpegComposer>,
}

impl Clients {
    fn with_openai(mut self, settings: &Settings, model: &str) -> Result<Self> {
        let client =
            OpenAiClient::from_settings(settings, model).context("configure OpenAI client")?;
        tracing::debug!(model = client.model(), "OpenAI client ready");
        self.openai = Some(client);
        Ok(self)
    }

    fn with_notion(mut self, settings: &Settings) -> Result<Self> {
        let client = NotionClient::from_settings(settings).context("configure Notion client")?;
        self.notion = Some(client);
        Ok(self)
    }

    fn with_prices(mut self) -> Self {
        self.prices = Some(YahooChart::new());
        self
    }

    fn with_composer(mut self, settings: &Settings) -> Result<Self> {
        self.composer = Some(FfmpegComposer::from_settings(settings).context("configure ffmpeg")?);
        Ok(self)
    }

    fn generator<'a>(&'a self, runtime: &'a RuntimeContext) -> PromptGenerator<'a> {
        let model = self.openai.as_ref().map(|client| client as &dyn LanguageModel);
        PromptGenerator::new(runtime, model)
    }

    fn pipeline<'a>(
        &'a self,
        runtime: &'a RuntimeContext,
        settings: &Settings,
        chart: &'a PixmapChart,
    ) -> Pipeline<'a> {
        let db = self.notion.as_ref().map(|client| client as &dyn TrackingDb);
        let mut pipeline = Pipeline::new(
            runtime,
            ArtifactPaths::new(settings.assets_dir.clone(), runtime.run_id()),
            self.generator(runtime),
            Tracker::new(runtime, db),
            chart,
        );
        if let Some(prices) = &self.prices {
            pipeline = pipeline.with_prices(prices);
        }
        if let Some(composer) = &self.composer {
            pipeline = pipeline.with_composer(composer);
        }
        pipeline
    }
}

fn cmd_script(runtime: &RuntimeContext, settings: &Settings, args: ScriptArgs) -> Result<()> {
    let mut clients = Clients::default();
    if !runtime.dry_run() {
        clients = clients.with_openai(settings, &settings.openai_model)?.with_prices();
        if args.page_id.is_some() {
            clients = clients.with_notion(settings)?;
        }
    }
    let chart = PixmapChart::default();
    let pipeline = clients.pipeline(runtime, settings, &chart);
    let outcome = pipeline
        .generate_script(&ScriptRequest {
            company_name: args.company.unwrap_or_else(|| args.ticker.clone()),
            ticker: args.ticker,
            period: args.period,
            record_id: args.page_id,
            output: args.output,
        })
        .context("script generation failed")?;
    println!(
        "Script saved to {} ({} characters)",
        outcome.path.display(),
        outcome.script.chars().count()
    );
    Ok(())
}

fn cmd_chart(runtime: &RuntimeContext, settings: &Settings, args: ChartArgs) -> Result<()> {
    let mut clients = Clients::default();
    if !runtime.dry_run() {
        clients = clients.with_prices();
    }
    let chart = PixmapChart::default();
    let path = clients
        .pipeline(runtime, settings, &chart)
        .create_price_chart(&ChartRequest {
            ticker: args.ticker,
            period: args.period,
            output: args.output,
        })
        .context("chart rendering failed")?;
    println!("Chart saved to {}", path.display());
    Ok(())
}

fn cmd_video(runtime: &RuntimeContext, settings: &Settings, args: VideoArgs) -> Result<()> {
    let mut clients = Clients::default();
    if !runtime.dry_run() {
        clients = clients.with_composer(settings)?;
    }
    let label = args.ticker.unwrap_or_else(|| file_stem_or(&args.image, "video"));
    let chart = PixmapChart::default();
    let path = clients
        .pipeline(runtime, settings, &chart)
        .assemble_video(&VideoRequest {
            label,
            image: args.image,
            audio: args.audio,
            output: args.output,
            fps: args.fps,
        })
        .context("video assembly failed")?;
    println!("Video saved to {}", path.display());
    Ok(())
}

fn cmd_run(runtime: &RuntimeContext, settings: &Settings, args: RunArgs) -> Result<()> {
    let mut clients = Clients::default();
    if !runtime.dry_run() {
        clients = clients.with_openai(settings, &settings.openai_model)?.with_prices();
        if args.page_id.is_some() {
            clients = clients.with_notion(settings)?;
        }
        if args.audio.is_some() {
            clients = clients.with_composer(settings)?;
        }
    }
    let chart = PixmapChart::default();
    let outcome = clients
        .pipeline(runtime, settings, &chart)
        .run(&RunRequest {
            company_name: args.company.unwrap_or_else(|| args.ticker.clone()),
            ticker: args.ticker,
            period: args.period,
            audio: args.audio,
            record_id: args.page_id,
        })
        .with_context(|| format!("run {} failed", runtime.run_id()))?;
    println!("Script saved to {}", outcome.script.display());
    println!("Chart saved to {}", outcome.chart.display());
    match outcome.video {
        Some(video) => println!("Video saved to {}", video.display()),
        None => println!("Video skipped (no --audio)"),
    }
    Ok(())
}

fn cmd_doe(runtime: &RuntimeContext, settings: &Settings, args: DoeArgs) -> Result<()> {
    let mut clients = Clients::default();
    let database_id = match args.database_id {
        Some(id) => id,
        None if runtime.dry_run() => settings.notion_database_id.clone().unwrap_or_default(),
        None => settings.require_notion_database()?.to_string(),
    };
    if !runtime.dry_run() {
        clients = clients
            .with_openai(settings, &settings.openai_model)?
            .with_notion(settings)?;
    }
    let chart = PixmapChart::default();
    let outcome = clients
        .pipeline(runtime, settings, &chart)
        .explain_doe(&DoeRequest {
            database_id,
            video_id: args.video_id,
            version: args.version,
            date: chrono::Local::now().date_naive(),
        })
        .context("DOE explainer failed")?;
    println!("{}", outcome.explanation);
    if outcome.record.url.is_empty() {
        println!("Notion row: {} (not created)", outcome.record.id);
    } else {
        println!("Notion row: {}", outcome.record.url);
    }
    Ok(())
}

fn cmd_snippet(runtime: &RuntimeContext, settings: &Settings, args: SnippetArgs) -> Result<()> {
    let mut clients = Clients::default();
    if !runtime.dry_run() {
        clients = clients.with_openai(settings, &settings.openai_coding_model)?;
    }
    let snippet = openai::request_snippet(&clients.generator(runtime), &args.instruction)
        .context("snippet request failed")?;
    match args.output {
        Some(path) => {
            util::write_with_parents(&path, snippet.as_bytes())?;
            println!("Snippet saved to {}", path.display());
        }
        None => println!("{snippet}"),
    }
    Ok(())
}

fn cmd_page(runtime: &RuntimeContext, settings: &Settings, args: PageArgs) -> Result<()> {
    let notion = NotionClient::from_settings(settings).context("configure Notion client")?;
    let tracker = Tracker::new(runtime, Some(&notion));
    if let Some(status) = &args.status {
        tracker
            .update_status(&args.page_id, status)
            .context("status update failed")?;
    }
    if let Some(note) = &args.note {
        tracker.comment(&args.page_id, note).context("comment failed")?;
    }
    let page = tracker.retrieve(&args.page_id).context("retrieve page failed")?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

fn cmd_health(settings: &Settings, args: HealthArgs) -> Result<()> {
    let openai = OpenAiClient::from_settings(settings, &settings.openai_model)
        .context("configure OpenAI client")?;
    let notion = NotionClient::from_settings(settings).context("configure Notion client")?;
    let report = health::check(&openai, &notion).context("health check failed")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    Ok(())
}

fn file_stem_or(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
