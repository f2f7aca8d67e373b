//! Application-wide constants and defaults
//!
//! Centralizes the values the pipeline falls back to when `config.yaml`
//! leaves a field out.

use std::time::Duration;

/// Language model defaults
pub mod llm {
    pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

    /// Bounded queue size per priority lane
    pub const DEFAULT_QUEUE_SIZE: usize = 100;

    pub const DEFAULT_MAX_CONCURRENT: usize = 4;
}

/// Crew execution limits
pub mod crew {
    /// Step cap for a single agent working on one task
    pub const AGENT_MAX_ITER: usize = 5;

    /// Manager call budget for a whole kickoff (hierarchical process)
    pub const CREW_MAX_ITER: usize = 15;

    /// How many earlier task outputs an agent recalls when memory is on
    pub const MEMORY_RECALL_LIMIT: usize = 5;
}

/// Price history provider
pub mod prices {
    pub const YAHOO_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com";

    /// Fixed one-year history window
    pub const WINDOW_START: &str = "2023-08-08";
    pub const WINDOW_END: &str = "2024-08-08";

    pub const INTERVAL: &str = "1d";
}

/// News search backend
pub mod news {
    pub const YAHOO_SEARCH_BASE_URL: &str = "https://query2.finance.yahoo.com";

    /// Asset always searched alongside the requested ticker
    pub const SECONDARY_ASSET: &str = "BTC";

    pub const NUM_RESULTS: usize = 10;
}

/// HTTP plumbing
pub mod http {
    use super::*;

    pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

    /// Yahoo rejects requests without a browser-like agent
    pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; stock-newsletter-crew/0.1)";

    pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

    pub const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(10);

    pub const KEEP_ALIVE_CRON: &str = "0 */10 * * * *";
}

/// Run log location
pub mod reporting {
    pub const DEFAULT_RUN_LOG_PATH: &str = "./data/runs.jsonl";

    pub const EVENT_BUS_CAPACITY: usize = 1000;
}
