pub mod news;
pub mod prices;

use reqwest::Client;

use crate::constants;
use crate::error::Result;

pub use news::{news_query_set, NewsItem, NewsSource, YahooNewsClient};
pub use prices::{PriceBar, PriceSeries, PriceSource, PriceWindow, YahooPriceClient};

/// Shared HTTP client for the market data providers
pub(crate) fn provider_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(constants::http::PROVIDER_TIMEOUT)
        .user_agent(constants::http::USER_AGENT)
        .build()?)
}
