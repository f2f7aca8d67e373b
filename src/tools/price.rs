use async_trait::async_trait;
use std::sync::Arc;

use super::{clean_input, Tool};
use crate::data::{PriceSource, PriceWindow};
use crate::error::Result;

pub const PRICE_TOOL_NAME: &str = "Yahoo Finance Tool";

/// Exposes the fixed-window price history to an agent.
pub struct PriceHistoryTool {
    source: Arc<dyn PriceSource>,
    window: PriceWindow,
    description: String,
}

impl PriceHistoryTool {
    pub fn new(source: Arc<dyn PriceSource>, window: PriceWindow) -> Self {
        let description = format!(
            "Fetch daily stock prices for a ticker from {} to {} from the Yahoo Finance API. Input: the ticker symbol.",
            window.start, window.end
        );
        Self {
            source,
            window,
            description,
        }
    }
}

#[async_trait]
impl Tool for PriceHistoryTool {
    fn name(&self) -> &str {
        PRICE_TOOL_NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, input: &str) -> Result<String> {
        let series = self.source.fetch_history(clean_input(input), self.window).await?;
        Ok(format!("{}\n\n{}", series.summary(), series.to_table()))
    }
}
