use async_trait::async_trait;
use std::sync::Arc;

use super::{clean_input, Tool};
use crate::data::{news_query_set, NewsSource};
use crate::error::{PipelineError, Result};

pub const NEWS_TOOL_NAME: &str = "News Search Tool";

/// Searches news for the requested ticker plus the fixed secondary asset.
pub struct NewsSearchTool {
    source: Arc<dyn NewsSource>,
    secondary_asset: String,
    num_results: usize,
    description: String,
}

impl NewsSearchTool {
    pub fn new(source: Arc<dyn NewsSource>, secondary_asset: impl Into<String>, num_results: usize) -> Self {
        let secondary_asset = secondary_asset.into();
        let description = format!(
            "Search recent news for a stock ticker. {} is always searched as well. Input: the ticker symbol.",
            secondary_asset
        );
        Self {
            source,
            secondary_asset,
            num_results,
            description,
        }
    }

    pub fn queries_for(&self, ticker: &str) -> Vec<String> {
        news_query_set(clean_input(ticker), &self.secondary_asset)
    }
}

#[async_trait]
impl Tool for NewsSearchTool {
    fn name(&self) -> &str {
        NEWS_TOOL_NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, input: &str) -> Result<String> {
        if clean_input(input).is_empty() {
            return Err(PipelineError::NewsProvider {
                query: input.to_string(),
                reason: "no ticker given to search for".to_string(),
            });
        }

        let mut out = String::new();
        for query in self.queries_for(input) {
            let items = self.source.search(&query, self.num_results).await?;
            out.push_str(&format!("## News for {} ({} results)\n", query, items.len()));
            for item in &items {
                out.push_str(&item.snippet());
                out.push('\n');
            }
            out.push('\n');
        }
        Ok(out)
    }
}
