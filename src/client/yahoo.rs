//! Yahoo Finance chart API client
//!
//! Pulls the last daily bar per symbol from the public v8 chart endpoint.
//! No API key required; the endpoint serves one bar for `range=1d`.

use crate::error::{BotError, Result};
use crate::types::DailyClose;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::PriceSource;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Client for Yahoo Finance end-of-day data
#[derive(Clone)]
pub struct YahooClient {
    http: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client against the public Yahoo endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        // Yahoo rejects the default reqwest user agent
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; pricewatch/0.1)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn chart(&self, symbol: &str) -> Result<DailyClose> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response: ChartResponse = self
            .http
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await?
            .json()
            .await?;

        parse_chart(symbol, response)
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn latest_closes(&self, symbols: &[String]) -> Result<HashMap<String, DailyClose>> {
        let mut update = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let observed = self.chart(symbol).await?;
            debug!(
                "{}: close {:.3} on {}",
                symbol, observed.close, observed.date
            );
            update.insert(symbol.clone(), observed);
        }
        Ok(update)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

// Chart payload, reduced to the fields the bot reads. Unknown fields
// (meta, volumes, adjclose) are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
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
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    close: Option<Vec<Option<f64>>>,
}

pub(crate) fn parse_chart(symbol: &str, response: ChartResponse) -> Result<DailyClose> {
    if let Some(err) = response.chart.error {
        return Err(BotError::Fetch(format!(
            "{symbol}: {} ({})",
            err.description, err.code
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| BotError::Fetch(format!("{symbol}: empty chart result")))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|q| q.close)
        .unwrap_or_default();

    // Most recent bar with a usable close; Yahoo pads the arrays with nulls
    // around holidays and the in-progress session.
    let (ts, close) = timestamps
        .iter()
        .zip(closes.iter())
        .rev()
        .find_map(|(ts, close)| close.map(|c| (*ts, c)))
        .ok_or_else(|| BotError::Fetch(format!("{symbol}: no usable close in chart")))?;

    let date = DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| BotError::Fetch(format!("{symbol}: bad bar timestamp {ts}")))?
        .date_naive();

    Ok(DailyClose { date, close })
}
