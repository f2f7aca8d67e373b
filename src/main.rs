use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stock_newsletter_crew::api::{run_server, AppState};
use stock_newsletter_crew::config::AppConfig;
use stock_newsletter_crew::constants;
use stock_newsletter_crew::data::{YahooNewsClient, YahooPriceClient};
use stock_newsletter_crew::llm::{ChatModel, LLMClient, LLMQueue};
use stock_newsletter_crew::pipeline::NewsletterPipeline;
use stock_newsletter_crew::services::keep_alive::KeepAliveService;
use stock_newsletter_crew::services::reporting::RunReporter;
use stock_newsletter_crew::EventBus;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // .env wins over the inherited environment; loaded before RUST_LOG is read
    let dotenv = dotenvy::dotenv_override();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => info!("ℹ️ No .env loaded ({}), using process environment", e),
    }

    info!("Starting Stock Newsletter Crew...");

    let config = AppConfig::load()?;
    info!("Loaded Configuration: {:?}", config);

    if let Some(url) = &config.llm.base_url {
        info!("Using Custom OpenAI Base URL: {}", url);
    }
    info!("Using LLM Model: {}", config.llm.model);

    let llm_client: Arc<dyn ChatModel> = Arc::new(LLMClient::from_config(&config.llm));

    info!(
        "📬 Initializing LLM Queue (max concurrent: {}, size: {})...",
        config.llm_max_concurrent, config.llm_queue_size
    );
    let llm: Arc<dyn ChatModel> = Arc::new(LLMQueue::new(
        llm_client,
        config.llm_max_concurrent,
        config.llm_queue_size,
    ));

    let event_bus = EventBus::new(constants::reporting::EVENT_BUS_CAPACITY);
    let reporter = RunReporter::new(config.run_log_path.clone());
    reporter.start(&event_bus);

    let prices = Arc::new(YahooPriceClient::from_config(&config.prices)?);
    let news = Arc::new(YahooNewsClient::from_config(&config.news)?);
    let pipeline = NewsletterPipeline::build(&config, llm, prices, news, Some(event_bus))?;

    // Keeps free-tier hosting awake; disabled unless KEEP_ALIVE_URL is set.
    let _keep_alive = match std::env::var("KEEP_ALIVE_URL") {
        Ok(url) if !url.is_empty() => {
            let schedule = std::env::var("KEEP_ALIVE_CRON")
                .unwrap_or_else(|_| constants::http::KEEP_ALIVE_CRON.to_string());
            let service = KeepAliveService::new(url)?;
            match service.start(&schedule).await {
                Ok(scheduler) => Some(scheduler),
                Err(e) => {
                    warn!("⚠️ Failed to start keep-alive service: {}", e);
                    None
                }
            }
        }
        _ => {
            info!("ℹ️ KEEP_ALIVE_URL not set - keep-alive service disabled");
            None
        }
    };

    let state = AppState {
        pipeline: Arc::new(pipeline),
        reporter: Some(reporter),
    };

    info!("Initializing API Server...");
    run_server(state, &config.server.bind_addr).await?;

    Ok(())
}
