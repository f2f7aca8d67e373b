//! Price history from the Yahoo Finance chart API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PriceConfig;
use crate::error::{PipelineError, Result};

/// Date range requested from the provider; `end` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PriceWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start_timestamp(&self) -> i64 {
        self.start.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp()).unwrap_or(0)
    }

    pub fn end_timestamp(&self) -> i64 {
        self.end.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp()).unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn first(&self) -> Option<&PriceBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Percent change of the close over the whole series
    pub fn change_pct(&self) -> Option<f64> {
        let first = self.first()?.close;
        let last = self.last()?.close;
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }

    pub fn summary(&self) -> String {
        match (self.first(), self.last(), self.change_pct()) {
            (Some(first), Some(last), Some(change)) => format!(
                "{}: {} sessions from {} to {}, close {:.2} -> {:.2} ({:+.2}%)",
                self.symbol,
                self.bars.len(),
                first.date,
                last.date,
                first.close,
                last.close,
                change
            ),
            _ => format!("{}: no price data in window", self.symbol),
        }
    }

    /// Render the series as a text table for model consumption
    pub fn to_table(&self) -> String {
        let mut out = String::from("Date       | Open | High | Low | Close | Adj Close | Volume\n");
        for bar in &self.bars {
            out.push_str(&format!(
                "{} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {}\n",
                bar.date, bar.open, bar.high, bar.low, bar.close, bar.adj_close, bar.volume
            ));
        }
        out
    }
}

/// Source of historical prices for a ticker
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_history(&self, symbol: &str, window: PriceWindow) -> Result<PriceSeries>;
}

#[derive(Clone)]
pub struct YahooPriceClient {
    client: Client,
    base_url: String,
    interval: String,
}

impl YahooPriceClient {
    pub fn new(base_url: impl Into<String>, interval: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: super::provider_client()?,
            base_url: base_url.into(),
            interval: interval.into(),
        })
    }

    pub fn from_config(config: &PriceConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.interval.clone())
    }
}

#[async_trait]
impl PriceSource for YahooPriceClient {
    async fn fetch_history(&self, symbol: &str, window: PriceWindow) -> Result<PriceSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            symbol
        );
        info!("📈 [PRICES] Fetching {} from {} to {}", symbol, window.start, window.end);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", window.start_timestamp().to_string()),
                ("period2", window.end_timestamp().to_string()),
                ("interval", self.interval.clone()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        // Yahoo reports unknown symbols as a 404 carrying a chart.error body
        match parse_chart(symbol, &body) {
            Ok(series) => {
                info!("📈 [PRICES] {}", series.summary());
                Ok(series)
            }
            Err(e) if status.is_success() => Err(e),
            Err(PipelineError::PriceProvider { reason, .. }) => Err(PipelineError::PriceProvider {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), reason),
            }),
            Err(e) => Err(e),
        }
    }
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Deserialize, Default)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn column<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

/// Parse a chart API payload into a price series.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries> {
    let provider_err = |reason: String| PipelineError::PriceProvider {
        symbol: symbol.to_string(),
        reason,
    };

    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| provider_err(format!("unreadable chart payload: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(provider_err(format!("{}: {}", err.code, err.description)));
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| provider_err("chart payload has no result".to_string()))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(*ts, 0).map(|d| d.date_naive()) else {
            continue;
        };
        // Holiday and halted rows come back as nulls
        let (Some(open), Some(high), Some(low), Some(close)) = (
            column(&quote.open, i),
            column(&quote.high, i),
            column(&quote.low, i),
            column(&quote.close, i),
        ) else {
            continue;
        };
        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            adj_close: column(&adjclose, i).unwrap_or(close),
            volume: column(&quote.volume, i).unwrap_or(0),
        });
    }

    Ok(PriceSeries {
        symbol: symbol.to_string(),
        bars,
    })
}
