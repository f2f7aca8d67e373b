//! News search against the Yahoo Finance search API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::NewsConfig;
use crate::error::{PipelineError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Query that produced this item
    pub query: String,
    pub title: String,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub related_tickers: Vec<String>,
}

impl NewsItem {
    pub fn snippet(&self) -> String {
        let when = self
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        format!(
            "[{}] {} ({}, {}) {}",
            self.query,
            self.title,
            self.publisher.as_deref().unwrap_or("unknown source"),
            when,
            self.link.as_deref().unwrap_or("")
        )
    }
}

/// Backend that returns recent news for a free-text query
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>>;
}

/// Queries searched for a ticker: the ticker itself, then the secondary asset.
pub fn news_query_set(ticker: &str, secondary: &str) -> Vec<String> {
    let mut queries = vec![ticker.to_string()];
    if !ticker.trim().eq_ignore_ascii_case(secondary.trim()) {
        queries.push(secondary.to_string());
    }
    queries
}

#[derive(Clone)]
pub struct YahooNewsClient {
    client: Client,
    base_url: String,
}

impl YahooNewsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: super::provider_client()?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &NewsConfig) -> Result<Self> {
        Self::new(config.base_url.clone())
    }
}

#[async_trait]
impl NewsSource for YahooNewsClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>> {
        let url = format!("{}/v1/finance/search", self.base_url.trim_end_matches('/'));
        info!("📰 [NEWS] Searching news for {}", query);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", query.to_string()),
                ("quotesCount", "0".to_string()),
                ("newsCount", limit.to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::NewsProvider {
                query: query.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let body = resp.text().await?;
        let items = parse_search(query, &body)?;
        info!("📰 [NEWS] {} items for {}", items.len(), query);
        Ok(items)
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNews {
    title: String,
    publisher: Option<String>,
    link: Option<String>,
    provider_publish_time: Option<i64>,
    #[serde(default)]
    related_tickers: Vec<String>,
}

/// Parse a search API payload into news items tagged with their query.
pub fn parse_search(query: &str, body: &str) -> Result<Vec<NewsItem>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| PipelineError::NewsProvider {
            query: query.to_string(),
            reason: format!("unreadable search payload: {}", e),
        })?;

    Ok(response
        .news
        .into_iter()
        .map(|n| NewsItem {
            query: query.to_string(),
            title: n.title,
            publisher: n.publisher,
            link: n.link,
            published_at: n.provider_publish_time.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            related_tickers: n.related_tickers,
        })
        .collect())
}
