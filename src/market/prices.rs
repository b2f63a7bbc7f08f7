//! Daily price history from the Yahoo Finance chart API.
use crate::error::{Error, Result, Service};
use crate::http;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; stock-shorts/0.1)";
const TICKER_PATTERN: &str = r"^[A-Za-z0-9^=.\-]{1,20}$";

/// Lookback windows the chart API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    Day1,
    Day5,
    #[default]
    Month1,
    Month3,
    Month6,
    Year1,
    Year2,
    Year5,
    Year10,
    YearToDate,
    Max,
}

const PERIODS: [(Period, &str); 11] = [
    (Period::Day1, "1d"),
    (Period::Day5, "5d"),
    (Period::Month1, "1mo"),
    (Period::Month3, "3mo"),
    (Period::Month6, "6mo"),
    (Period::Year1, "1y"),
    (Period::Year2, "2y"),
    (Period::Year5, "5y"),
    (Period::Year10, "10y"),
    (Period::YearToDate, "ytd"),
    (Period::Max, "max"),
];

impl Period {
    pub fn as_str(self) -> &'static str {
        PERIODS
            .iter()
            .find(|(period, _)| *period == self)
            .map_or("1mo", |(_, label)| label)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let raw = raw.trim();
        PERIODS
            .iter()
            .find(|(_, label)| label.eq_ignore_ascii_case(raw))
            .map(|(period, _)| *period)
            .ok_or_else(|| {
                let known: Vec<&str> = PERIODS.iter().map(|(_, label)| *label).collect();
                format!("unknown period {raw:?} (expected one of {})", known.join(", "))
            })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
    pub high: f64,
    pub low: f64,
}

/// Date-ordered bars for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    /// Five flat bars (1..=5) ending at `end`, used in dry-run.
    pub fn placeholder(ticker: &str, end: NaiveDate) -> Self {
        let bars = (0..5u32)
            .filter_map(|offset| {
                let date = end.checked_sub_days(chrono::Days::new(u64::from(4 - offset)))?;
                let value = f64::from(offset + 1);
                Some(PriceBar {
                    date,
                    close: value,
                    high: value,
                    low: value,
                })
            })
            .collect();
        Self::new(ticker, bars)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    pub fn first_close(&self) -> Option<f64> {
        self.bars.first().map(|bar| bar.close)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|bar| bar.close)
    }

    pub fn highest(&self) -> Option<f64> {
        self.bars.iter().map(|bar| bar.high).reduce(f64::max)
    }

    pub fn lowest(&self) -> Option<f64> {
        self.bars.iter().map(|bar| bar.low).reduce(f64::min)
    }
}

/// Price-data collaborator. An unknown ticker or empty history is
/// [`Error::NoData`], never a transient error.
pub trait PriceSource {
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries>;
}

pub fn validate_ticker(ticker: &str) -> Result<()> {
    let pattern = Regex::new(TICKER_PATTERN)
        .map_err(|err| Error::InvalidInput(format!("ticker pattern: {err}")))?;
    if pattern.is_match(ticker) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid ticker symbol {ticker:?}")))
    }
}

pub struct YahooChart {
    agent: ureq::Agent,
    base_url: String,
}

impl YahooChart {
    pub fn new() -> Self {
        Self {
            agent: http::agent(),
            base_url: YAHOO_CHART_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for YahooChart {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceSource for YahooChart {
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        validate_ticker(ticker)?;
        tracing::info!(ticker, period = %period, "fetching price history");
        let sent = self
            .agent
            .get(&format!("{}/{}", self.base_url, ticker))
            .query("range", period.as_str())
            .query("interval", "1d")
            .header("User-Agent", USER_AGENT)
            .call();
        match http::json_response(Service::Prices, sent) {
            Err(Error::Api { status: 404, .. }) => Err(Error::NoData {
                ticker: ticker.to_string(),
            }),
            other => parse_chart(ticker, &other?),
        }
    }
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Default)]
struct ChartMeta {
    #[serde(default, rename = "gmtoffset")]
    gmt_offset: i64,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
}

/// Decode a chart response; bars with a missing close/high/low are dropped.
pub(crate) fn parse_chart(ticker: &str, value: &Value) -> Result<PriceSeries> {
    let no_data = || Error::NoData {
        ticker: ticker.to_string(),
    };
    let envelope: ChartEnvelope =
        serde_json::from_value(value.clone()).map_err(|err| Error::Decode {
            service: Service::Prices,
            message: err.to_string(),
        })?;
    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(no_data)?;
    let quote = result.indicators.quote.into_iter().next().ok_or_else(no_data)?;

    let bars: Vec<PriceBar> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(idx, ts)| {
            let date = DateTime::from_timestamp(ts + result.meta.gmt_offset, 0)?.date_naive();
            Some(PriceBar {
                date,
                close: (*quote.close.get(idx)?)?,
                high: (*quote.high.get(idx)?)?,
                low: (*quote.low.get(idx)?)?,
            })
        })
        .collect();
    if bars.is_empty() {
        return Err(no_data());
    }
    Ok(PriceSeries::new(ticker, bars))
}

#[cfg(test)]
#[path = "prices_tests.rs"]
mod tests;
