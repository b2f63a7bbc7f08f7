use super::*;
use serde_json::json;

fn chart_fixture() -> Value {
    json!({
        "chart": {
            "result": [{
                "meta": {"symbol": "7203.T", "currency": "JPY", "gmtoffset": 32400},
                "timestamp": [1714521600, 1714608000, 1714694400, 1714953600],
                "indicators": {
                    "quote": [{
                        "open": [2900.0, 2950.0, 3000.0, 3010.0],
                        "close": [2950.0, null, 3020.5, 3100.0],
                        "high": [2990.0, 3000.0, 3050.0, 3120.0],
                        "low": [2880.0, 2930.0, 2995.0, 3005.0],
                        "volume": [100, 200, 300, 400]
                    }]
                }
            }],
            "error": null
        }
    })
}

#[test]
fn parses_bars_and_skips_gaps() {
    let series = parse_chart("7203.T", &chart_fixture()).expect("parse chart");
    assert_eq!(series.ticker(), "7203.T");
    assert_eq!(series.bars().len(), 3);
    assert_eq!(series.first_close(), Some(2950.0));
    assert_eq!(series.last_close(), Some(3100.0));
    assert_eq!(series.highest(), Some(3120.0));
    assert_eq!(series.lowest(), Some(2880.0));
}

#[test]
fn applies_exchange_offset_to_dates() {
    let series = parse_chart("7203.T", &chart_fixture()).expect("parse chart");
    // 1714521600 is 2024-05-01T00:00Z, i.e. 09:00 JST the same day
    assert_eq!(
        series.bars()[0].date,
        NaiveDate::from_ymd_opt(2024, 5, 1).expect("date")
    );
}

#[test]
fn null_result_is_no_data() {
    let value = json!({"chart": {"result": null, "error": {"code": "Not Found"}}});
    let err = parse_chart("0000.T", &value).expect_err("no data");
    assert!(matches!(err, Error::NoData { ref ticker } if ticker == "0000.T"));
}

#[test]
fn all_null_quotes_are_no_data() {
    let value = json!({
        "chart": {"result": [{
            "meta": {},
            "timestamp": [1714521600],
            "indicators": {"quote": [{"close": [null], "high": [null], "low": [null]}]}
        }]}
    });
    assert!(matches!(parse_chart("X", &value), Err(Error::NoData { .. })));
}

#[test]
fn missing_timestamps_is_no_data() {
    let value = json!({
        "chart": {"result": [{"meta": {}, "indicators": {"quote": [{}]}}]}
    });
    assert!(matches!(parse_chart("X", &value), Err(Error::NoData { .. })));
}

#[test]
fn malformed_payload_is_decode_error() {
    let value = json!({"unexpected": true});
    assert!(matches!(parse_chart("X", &value), Err(Error::Decode { .. })));
}

#[test]
fn periods_round_trip_through_labels() {
    assert_eq!("1mo".parse::<Period>().expect("period"), Period::Month1);
    assert_eq!("YTD".parse::<Period>().expect("period"), Period::YearToDate);
    assert_eq!(Period::Year5.to_string(), "5y");
    assert_eq!(Period::default().as_str(), "1mo");
    let err = "2w".parse::<Period>().expect_err("unknown period");
    assert!(err.contains("1mo"));
}

#[test]
fn ticker_validation() {
    for ok in ["7203.T", "^N225", "AAPL", "BRK-B", "JPY=X"] {
        assert!(validate_ticker(ok).is_ok(), "{ok}");
    }
    for bad in ["", "72 03", "../etc", "A".repeat(21).as_str()] {
        assert!(validate_ticker(bad).is_err(), "{bad}");
    }
}

#[test]
fn placeholder_series_is_fixed() {
    let end = NaiveDate::from_ymd_opt(2025, 9, 1).expect("date");
    let series = PriceSeries::placeholder("7203.T", end);
    assert_eq!(series.closes(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(series.bars().last().map(|bar| bar.date), Some(end));
}
