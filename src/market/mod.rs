//! Price data: retrieval, validation and summaries.
mod prices;
mod summary;

pub use prices::{validate_ticker, Period, PriceSeries, PriceSource, YahooChart};

#[cfg(test)]
pub use prices::PriceBar;
pub use summary::{dry_run_summary, summarize};
