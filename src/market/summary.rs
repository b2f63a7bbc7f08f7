use super::prices::{Period, PriceSeries};
use crate::error::{Error, Result};

/// One-line factual summary of the period's price movement.
pub fn summarize(series: &PriceSeries, period: Period) -> Result<String> {
    let no_data = || Error::NoData {
        ticker: series.ticker().to_string(),
    };
    let start = series.first_close().ok_or_else(no_data)?;
    let end = series.last_close().ok_or_else(no_data)?;
    let high = series.highest().ok_or_else(no_data)?;
    let low = series.lowest().ok_or_else(no_data)?;
    if start == 0.0 {
        return Err(Error::InvalidInput(format!(
            "{} opening close is zero; change is undefined",
            series.ticker()
        )));
    }
    let pct_change = (end - start) / start * 100.0;
    Ok(format!(
        "{period} closing price: {start:.2} -> {end:.2} ({pct_change:+.2}%). \
         Highest: {high:.2}, Lowest: {low:.2}."
    ))
}

pub fn dry_run_summary(ticker: &str, period: Period) -> String {
    format!("{ticker} ({period}) dummy summary")
}
