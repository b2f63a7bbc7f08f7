use super::*;
use crate::config::LogLevel;
use crate::error::Service;
use crate::market::PriceBar;
use crate::notion::Fields;
use crate::render::PixmapChart;
use crate::testing::{
    unauthorized, DbCall, FakePrices, RecordingChart, RecordingComposer, RecordingDb, ScriptedModel,
};
use chrono::NaiveDate;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

const DRY_RUN_SCRIPT: &str = "これはドライラン用のサンプル台本です。";

fn fast(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(2)).expect("policy")
}

fn toyota_series() -> PriceSeries {
    let day = |d| NaiveDate::from_ymd_opt(2025, 9, d).expect("date");
    let bar = |d, close: f64| PriceBar {
        date: day(d),
        close,
        high: close,
        low: close,
    };
    PriceSeries::new("7203.T", vec![bar(3, 110.0), bar(1, 100.0), bar(2, 105.0)])
}

struct Harness {
    runtime: RuntimeContext,
    dir: TempDir,
    model: ScriptedModel,
    db: RecordingDb,
    prices: FakePrices,
    chart: RecordingChart,
    composer: RecordingComposer,
}

impl Harness {
    fn new(dry_run: bool) -> Self {
        Self {
            runtime: RuntimeContext::new(dry_run, "run42", LogLevel::Debug),
            dir: tempfile::tempdir().expect("temp dir"),
            model: ScriptedModel::always("トヨタの株価は1ヶ月で10%上昇しました。"),
            db: RecordingDb::new(),
            prices: FakePrices::with(toyota_series()),
            chart: RecordingChart::default(),
            composer: RecordingComposer::default(),
        }
    }

    fn live() -> Self {
        Self::new(false)
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(
            &self.runtime,
            ArtifactPaths::new(self.dir.path(), self.runtime.run_id()),
            PromptGenerator::new(&self.runtime, Some(&self.model)).with_policy(fast(4)),
            Tracker::new(&self.runtime, Some(&self.db)).with_policies(fast(3), fast(2)),
            &self.chart,
        )
        .with_prices(&self.prices)
        .with_composer(&self.composer)
        .with_fetch_policy(fast(3))
    }

    fn audio(&self) -> PathBuf {
        let path = self.dir.path().join("voice.mp3");
        std::fs::write(&path, b"ID3").expect("write audio");
        path
    }

    fn statuses(&self) -> Vec<String> {
        self.db
            .updated_properties()
            .iter()
            .filter_map(|fields| fields.get("Status"))
            .filter_map(|status| status["status"]["name"].as_str().map(str::to_string))
            .collect()
    }
}

fn script_request(record_id: Option<&str>) -> ScriptRequest {
    ScriptRequest {
        ticker: "7203.T".to_string(),
        company_name: "トヨタ自動車".to_string(),
        period: Period::Month1,
        record_id: record_id.map(str::to_string),
        output: None,
    }
}

fn run_request(audio: Option<PathBuf>, record_id: Option<&str>) -> RunRequest {
    RunRequest {
        ticker: "7203.T".to_string(),
        company_name: "トヨタ自動車".to_string(),
        period: Period::Month1,
        audio,
        record_id: record_id.map(str::to_string),
    }
}

#[test]
fn dry_run_script_needs_no_clients() {
    let runtime = RuntimeContext::new(true, "run42", LogLevel::Info);
    let dir = tempfile::tempdir().expect("temp dir");
    let chart = PixmapChart::default();
    let pipeline = Pipeline::new(
        &runtime,
        ArtifactPaths::new(dir.path(), "run42"),
        PromptGenerator::new(&runtime, None),
        Tracker::new(&runtime, None),
        &chart,
    );

    let outcome = pipeline
        .generate_script(&script_request(Some("page-1")))
        .expect("dry-run script");

    assert_eq!(outcome.script, DRY_RUN_SCRIPT);
    assert_eq!(outcome.path, dir.path().join("scripts/run42_7203.T_script.md"));
    assert_eq!(std::fs::read_to_string(&outcome.path).expect("read"), DRY_RUN_SCRIPT);
}

#[test]
fn dry_run_chart_renders_placeholder_series_without_clients() {
    let runtime = RuntimeContext::new(true, "run42", LogLevel::Info);
    let dir = tempfile::tempdir().expect("temp dir");
    let chart = PixmapChart::with_size(300, 200).expect("size");
    let pipeline = Pipeline::new(
        &runtime,
        ArtifactPaths::new(dir.path(), "run42"),
        PromptGenerator::new(&runtime, None),
        Tracker::new(&runtime, None),
        &chart,
    );

    let path = pipeline
        .create_price_chart(&ChartRequest {
            ticker: "7203.T".to_string(),
            period: Period::Month1,
            output: None,
        })
        .expect("dry-run chart");

    assert_eq!(path, dir.path().join("charts/run42_7203.T_chart.png"));
    let bytes = std::fs::read(&path).expect("read chart");
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[test]
fn dry_run_full_run_touches_no_collaborator() {
    let harness = Harness::new(true);
    let audio = harness.audio();
    let outcome = harness
        .pipeline()
        .run(&run_request(Some(audio), Some("page-1")))
        .expect("dry run");

    assert!(harness.db.calls().is_empty());
    assert_eq!(harness.model.calls(), 0);
    assert_eq!(harness.prices.calls(), 0);
    assert_eq!(harness.composer.calls.get(), 0);

    let video = outcome.video.expect("video placeholder");
    assert_eq!(video, harness.dir.path().join("videos/run42_7203.T_video.mp4"));
    let marker = std::fs::read_to_string(&video).expect("read marker");
    assert!(marker.starts_with("dry-run video placeholder"));
    assert_eq!(
        std::fs::read_to_string(&outcome.script).expect("read script"),
        DRY_RUN_SCRIPT
    );
}

#[test]
fn live_script_summarizes_prices_and_updates_page() {
    let harness = Harness::live();
    let outcome = harness
        .pipeline()
        .generate_script(&script_request(Some("page-1")))
        .expect("script");

    let (_, prompt, temperature) = harness.model.last_request().expect("model called");
    assert!(prompt.contains(
        "1mo closing price: 100.00 -> 110.00 (+10.00%). Highest: 110.00, Lowest: 100.00."
    ));
    assert!((temperature - 0.6).abs() < f32::EPSILON);
    assert_eq!(
        std::fs::read_to_string(&outcome.path).expect("read"),
        "トヨタの株価は1ヶ月で10%上昇しました。"
    );

    let updates = harness.db.updated_properties();
    assert_eq!(updates.len(), 2);
    assert!(updates[0].contains_key("Script"));
    assert_eq!(harness.statuses(), vec![STATUS_SCRIPT_GENERATED]);
    assert!(harness.db.notes().is_empty());
}

#[test]
fn empty_history_is_no_data_with_one_annotation() {
    let harness = Harness {
        prices: FakePrices::empty(),
        ..Harness::live()
    };
    let err = harness
        .pipeline()
        .generate_script(&script_request(Some("page-1")))
        .expect_err("no data");

    assert!(matches!(err, Error::NoData { .. }));
    assert_eq!(harness.prices.calls(), 1);
    assert_eq!(harness.model.calls(), 0);
    assert_eq!(
        harness.db.notes(),
        vec!["run_id=run42: No price data found for 7203.T".to_string()]
    );
}

#[test]
fn failed_annotation_still_returns_original_error() {
    let harness = Harness {
        prices: FakePrices::empty(),
        db: RecordingDb::new().failing_notes(|| unauthorized(Service::Notion)),
        ..Harness::live()
    };
    let err = harness
        .pipeline()
        .generate_script(&script_request(Some("page-1")))
        .expect_err("no data");

    assert!(matches!(err, Error::NoData { .. }));
    assert_eq!(harness.db.notes().len(), 1);
}

#[test]
fn failures_without_a_page_are_not_annotated() {
    let harness = Harness {
        prices: FakePrices::empty(),
        ..Harness::live()
    };
    assert!(harness.pipeline().generate_script(&script_request(None)).is_err());
    assert!(harness.db.calls().is_empty());
}

#[test]
fn invalid_ticker_is_rejected_before_fetching() {
    let harness = Harness::live();
    let request = ScriptRequest {
        ticker: "7203 T; rm".to_string(),
        ..script_request(None)
    };
    let err = harness.pipeline().generate_script(&request).expect_err("bad ticker");
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(harness.prices.calls(), 0);
}

#[test]
fn chart_uses_period_title_and_explicit_output() {
    let harness = Harness::live();
    let output = harness.dir.path().join("custom/chart.png");
    let path = harness
        .pipeline()
        .create_price_chart(&ChartRequest {
            ticker: "7203.T".to_string(),
            period: Period::Month3,
            output: Some(output.clone()),
        })
        .expect("chart");

    assert_eq!(path, output);
    assert!(path.is_file());
    assert_eq!(
        harness.chart.titles.borrow().as_slice(),
        ["7203.T closing price (3mo)".to_string()]
    );
}

#[test]
fn live_run_walks_through_every_status() {
    let harness = Harness::live();
    let audio = harness.audio();
    let outcome = harness
        .pipeline()
        .run(&run_request(Some(audio), Some("page-1")))
        .expect("run");

    assert_eq!(
        harness.statuses(),
        vec![
            STATUS_SCRIPT_GENERATED,
            STATUS_CHART_GENERATED,
            STATUS_VIDEO_RENDERED
        ]
    );
    assert_eq!(harness.composer.calls.get(), 1);
    assert_eq!(
        outcome.video.as_deref(),
        Some(harness.dir.path().join("videos/run42_7203.T_video.mp4").as_path())
    );
}

#[test]
fn video_failure_is_annotated_once_and_stops_the_run() {
    let harness = Harness {
        composer: RecordingComposer {
            fail: true,
            ..RecordingComposer::default()
        },
        ..Harness::live()
    };
    let audio = harness.audio();
    let err = harness
        .pipeline()
        .run(&run_request(Some(audio), Some("page-1")))
        .expect_err("ffmpeg failure");

    assert!(matches!(err, Error::Render(_)));
    assert_eq!(harness.db.notes().len(), 1);
    assert!(harness.db.notes()[0].starts_with("run_id=run42: "));
    assert_eq!(
        harness.statuses(),
        vec![STATUS_SCRIPT_GENERATED, STATUS_CHART_GENERATED]
    );
}

#[test]
fn run_without_audio_skips_video() {
    let harness = Harness::live();
    let outcome = harness
        .pipeline()
        .run(&run_request(None, None))
        .expect("run");
    assert!(outcome.video.is_none());
    assert_eq!(harness.composer.calls.get(), 0);
    assert!(outcome.chart.is_file());
}

#[test]
fn zero_fps_is_invalid_input() {
    let harness = Harness::live();
    let err = harness
        .pipeline()
        .assemble_video(&VideoRequest {
            label: "7203.T".to_string(),
            image: PathBuf::from("chart.png"),
            audio: PathBuf::from("voice.mp3"),
            output: None,
            fps: 0,
        })
        .expect_err("fps");
    assert!(matches!(err, Error::InvalidInput(_)));
}

fn doe_request() -> DoeRequest {
    DoeRequest {
        database_id: "artifacts-db".to_string(),
        video_id: "VID2025-09-001".to_string(),
        version: 1,
        date: NaiveDate::from_ymd_opt(2025, 9, 15).expect("date"),
    }
}

fn rich_text_content(fields: &Fields, key: &str) -> String {
    fields[key]["rich_text"][0]["text"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn doe_explainer_creates_an_artifact_row() {
    let harness = Harness {
        model: ScriptedModel::always(" DOEは配当総額を株主資本で割った指標です。\n"),
        ..Harness::live()
    };
    let outcome = harness.pipeline().explain_doe(&doe_request()).expect("doe");

    assert_eq!(outcome.explanation, "DOEは配当総額を株主資本で割った指標です。");
    assert_eq!(outcome.record.url, "https://www.notion.so/new-page");
    let (system, prompt, temperature) = harness.model.last_request().expect("model called");
    assert!(system.contains("tutor"));
    assert!(prompt.contains("60字"));
    assert!((temperature - 0.4).abs() < f32::EPSILON);

    let created = harness
        .db
        .calls()
        .into_iter()
        .find_map(|call| match call {
            DbCall::CreateRecord { fields, .. } => Some(fields),
            _ => None,
        })
        .expect("row created");
    assert_eq!(created["Name"]["title"][0]["text"]["content"], "DOE_script_2025-09-15");
    assert_eq!(rich_text_content(&created, "artifact_id"), "VID2025-09-001_script_v1");
    assert_eq!(rich_text_content(&created, "content"), outcome.explanation);
    assert_eq!(created["artifact_type"], json!({"select": {"name": "script"}}));
    assert_eq!(created["status"], json!({"status": {"name": "generated"}}));
    assert_eq!(created["version"], json!({"number": 1.0}));
    assert_eq!(rich_text_content(&created, "video_id"), "VID2025-09-001");
}

#[test]
fn doe_dry_run_skips_model_and_database() {
    let harness = Harness::new(true);
    let outcome = harness.pipeline().explain_doe(&doe_request()).expect("doe");
    assert_eq!(outcome.record.id, "dry-run-VID2025-09-001_script_v1");
    assert!(outcome.explanation.chars().count() <= 60);
    assert_eq!(harness.model.calls(), 0);
    assert!(harness.db.calls().is_empty());
}

#[test]
fn artifacts_land_under_the_assets_root() {
    let harness = Harness::live();
    let outcome = harness
        .pipeline()
        .generate_script(&script_request(None))
        .expect("script");
    assert!(outcome.path.starts_with(harness.dir.path()));
    assert_eq!(
        outcome.path.file_name().and_then(|name| name.to_str()),
        Some("run42_7203.T_script.md")
    );
    assert!(Path::new(&outcome.path).is_file());
}

#[test]
fn rejected_model_call_is_not_retried() {
    let harness = Harness {
        model: ScriptedModel::rejecting(),
        ..Harness::live()
    };
    let err = harness
        .pipeline()
        .generate_script(&script_request(Some("page-1")))
        .expect_err("401");
    assert!(matches!(err, Error::Api { status: 401, .. }));
    assert_eq!(harness.model.calls(), 1);
    assert_eq!(harness.db.notes().len(), 1);
    assert!(harness.statuses().is_empty());
}
