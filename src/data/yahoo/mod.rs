/*!
[Yahoo Finance](https://finance.yahoo.com/)-specific data fetching code
*/
use super::{sort_dedup, Candle, Interval, MarketData, Period};
use crate::util::{from_unix, trading_date};
use crate::{Error, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// The public Yahoo Finance API root
pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Parse the body of a chart API response into candles.
///
/// Rows with a missing price are dropped, a missing volume counts as zero. Timestamps are shifted into the exchange's
/// current offset. Bars of a day or longer are stamped at midnight of their trading date, so only intraday bars carry
/// a time of day, and those keep the current offset even across a DST change. A chart-level error or an empty
/// `result` is a `DataUnavailable` error; an empty row set is not.
pub fn parse_chart(ticker: &str, body: &str, interval: Interval) -> Result<Vec<Candle>> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|err| Error::unavailable(ticker, format!("malformed chart response: {}", err)))?;
    if let Some(error) = response.chart.error {
        return Err(Error::unavailable(
            ticker,
            format!("{}: {}", error.code, error.description),
        ));
    }
    let data = response
        .chart
        .result
        .and_then(|result| result.into_iter().next())
        .ok_or_else(|| Error::unavailable(ticker, "empty chart result"))?;
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = data.meta.gmtoffset;
    let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();
    let mut candles = Vec::with_capacity(timestamps.len());
    for (i, &secs) in timestamps.iter().enumerate() {
        let prices = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        );
        let t = from_unix(secs, offset).and_then(|t| {
            if interval.is_intraday() {
                Some(t)
            } else {
                trading_date(&t)
            }
        });
        if let ((Some(o), Some(h), Some(l), Some(c)), Some(t)) = (prices, t) {
            candles.push(Candle {
                t,
                o,
                h,
                l,
                c,
                v: at(&quote.volume, i).unwrap_or(0.0),
            });
        }
    }
    Ok(sort_dedup(candles))
}

/// A blocking client for the Yahoo Finance chart API
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client against `base_url`. With no `timeout`, requests wait indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<YahooClient> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::InvalidArgument("base url must be set".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()?;
        Ok(YahooClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
    /// The chart URL for a request
    pub fn chart_url(&self, ticker: &str, period: Period, interval: Interval) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval={}&includePrePost=false",
            self.base_url, ticker, period, interval
        )
    }
}

impl MarketData for YahooClient {
    fn history(&self, ticker: &str, period: Period, interval: Interval) -> Result<Vec<Candle>> {
        if ticker.is_empty() || ticker.contains(|c: char| c == '/' || c == '?' || c == '#') {
            return Err(Error::InvalidArgument(format!("invalid ticker {:?}", ticker)));
        }
        let url = self.chart_url(ticker, period, interval);
        debug!(%url, "fetching chart");
        let response = self.client.get(&url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            // 404s carry a chart error body
            let body = response.text()?;
            return match parse_chart(ticker, &body, interval) {
                Err(err) => Err(err),
                Ok(_) => Err(Error::unavailable(ticker, "not found")),
            };
        }
        let body = response.error_for_status()?.text()?;
        let candles = parse_chart(ticker, &body, interval)?;
        debug!(ticker, rows = candles.len(), "parsed chart");
        Ok(candles)
    }
}
