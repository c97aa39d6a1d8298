//! Yahoo Finance chart API integration for daily futures closes.

use chrono::{DateTime, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::data::PriceSource;
use crate::domain::{Instrument, PricePoint, PriceSeries};
use crate::error::AppError;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const INTERVAL: &str = "1d";
// The chart endpoint rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub struct YahooClient {
    client: Client,
}

impl YahooClient {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn fetch_chart(&self, symbol: &str, range: &str) -> Result<ChartResponse, AppError> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/{symbol}"))
            .query(&[("range", range), ("interval", INTERVAL)])
            .send()
            .map_err(|e| AppError::data(format!("Yahoo request for {symbol} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::data(format!(
                "Yahoo request for {symbol} failed with status {}.",
                resp.status()
            )));
        }

        resp.json()
            .map_err(|e| AppError::data(format!("Failed to parse Yahoo response for {symbol}: {e}")))
    }
}

impl PriceSource for YahooClient {
    fn fetch_series(&self, instrument: &Instrument, range: &str) -> Result<PriceSeries, AppError> {
        log::info!("Fetching {} ({range}) from Yahoo", instrument.symbol);
        let body = self.fetch_chart(&instrument.symbol, range)?;
        let points = parse_chart(&instrument.symbol, body)?;
        PriceSeries::new(instrument.clone(), points)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Turn a chart payload into ascending, de-duplicated daily closes.
///
/// Missing closes are skipped. Timestamps are shifted by the exchange offset
/// before taking the calendar date. When two bars land on the same date the
/// later one wins.
fn parse_chart(symbol: &str, body: ChartResponse) -> Result<Vec<PricePoint>, AppError> {
    if let Some(err) = body.chart.error {
        return Err(AppError::data(format!(
            "Yahoo returned an error for {symbol}: {} {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AppError::data(format!("Yahoo returned no chart for {symbol}.")))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut points: Vec<PricePoint> = Vec::with_capacity(closes.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite()) else {
            continue;
        };
        let date = local_date(*ts, result.meta.gmtoffset).ok_or_else(|| {
            AppError::data(format!("Invalid Yahoo timestamp {ts} for {symbol}."))
        })?;
        points.push(PricePoint { date, close });
    }

    points.sort_by_key(|p| p.date);
    let before = points.len();
    // Keep the last bar per date.
    points.reverse();
    points.dedup_by_key(|p| p.date);
    points.reverse();
    if points.len() < before {
        log::warn!(
            "{symbol}: dropped {} duplicate daily bar(s)",
            before - points.len()
        );
    }

    if points.is_empty() {
        return Err(AppError::data(format!("No price observations for {symbol}.")));
    }
    Ok(points)
}

fn local_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmtoffset, 0).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<PricePoint>, AppError> {
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        parse_chart("GC=F", body)
    }

    #[test]
    fn parses_closes_and_skips_nulls() {
        // 2025-01-02 and 2025-01-03 at 05:00 UTC; exchange offset -5h.
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1735794000,1735880400,1735966800],
            "indicators":{"quote":[{"close":[2650.5,null,2700.25]}]}
        }],"error":null}}"#;
        let points = parse(json).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(points[0].close, 2650.5);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
    }

    #[test]
    fn duplicate_dates_keep_the_latest_bar() {
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":0},
            "timestamp":[1735776000,1735790400],
            "indicators":{"quote":[{"close":[1.0,2.0]}]}
        }],"error":null}}"#;
        let points = parse(json).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].close, 2.0);
    }

    #[test]
    fn api_error_is_a_data_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let err = parse(json).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Data);
        assert!(err.message().contains("Not Found"));
    }

    #[test]
    fn all_null_closes_is_a_data_error() {
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":0},
            "timestamp":[1735776000],
            "indicators":{"quote":[{"close":[null]}]}
        }],"error":null}}"#;
        assert!(parse(json).is_err());
    }
}
