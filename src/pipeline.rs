//! The stock newsletter crew: price trend, news sentiment, newsletter.

use async_trait::async_trait;
use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::agents::{AgentSpec, CrewManager, NewsAnalyst, PriceAnalyst, SeniorWriter};
use crate::bus::EventBus;
use crate::config::AppConfig;
use crate::crew::{Crew, CrewOutput, TaskSpec};
use crate::data::{NewsSource, PriceSource, PriceWindow};
use crate::error::Result;
use crate::llm::ChatModel;
use crate::tools::{NewsSearchTool, PriceHistoryTool};

const PRICE_TASK: &str =
    "Analyze the stock {ticker} price history and create a trend analysis of up, down or sideways.";

const PRICE_EXPECTED: &str = r#"Specify the current trend stock price - up, down or sideways.
e.g. stock= 'AAPL', price UP"#;

const NEWS_TASK: &str = r#"Take the stock {ticker} and always include {secondary} with it.
Use the search tool to search each one individually.
The request date is {request_date}.
Compose the results into a helpful report."#;

const NEWS_EXPECTED: &str = r#"A summary of the overall market and one sentence summary for each requested asset.
Include a fear/greed score for each asset based on the news.
Use format:
    <STOCK ASSET>
    <SUMMARY BASED ON NEWS>
    <TREND PREDICTION>
    <FEAR/GREED SCORE>"#;

const WRITE_TASK: &str = r#"Use the stock price trend and the stock news report to create an analysis and write the newsletter
about the {ticker} company that is brief and highlights the most important points.
Focus on the stock price trend, news and fear/greed score. What are the near future considerations?
Include the previous analysis of stock trend and news summary."#;

const WRITE_EXPECTED: &str = r#"An eloquent 3 paragraph newsletter formatted as markdown in an easy readable manner. It should contain:
    - 3 bullets executive summary.
    - Introduction - set the overall picture and spike up the interest.
    - Main part - provides the meat of the analysis including the news summary and fear/greed scores.
    - Summary - key facts and concrete future trend prediction - up, down or sideways."#;

/// Something that turns a ticker into a finished newsletter.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn run(&self, ticker: &str) -> Result<CrewOutput>;
}

pub struct NewsletterPipeline {
    crew: Crew,
    secondary_asset: String,
}

impl NewsletterPipeline {
    /// Assemble agents, tools and tasks; the crew is built once and reused.
    pub fn build(
        config: &AppConfig,
        llm: Arc<dyn ChatModel>,
        prices: Arc<dyn PriceSource>,
        news: Arc<dyn NewsSource>,
        events: Option<EventBus>,
    ) -> Result<Self> {
        let crew_cfg = &config.crew;
        let window = PriceWindow::new(config.prices.start, config.prices.end);

        let price_analyst = AgentSpec::new(&PriceAnalyst, llm.clone())
            .tool(Arc::new(PriceHistoryTool::new(prices, window)))
            .allow_delegation(false)
            .memory(crew_cfg.memory)
            .max_iter(crew_cfg.agent_max_iter)
            .verbose(crew_cfg.verbose);

        let news_analyst = AgentSpec::new(&NewsAnalyst, llm.clone())
            .tool(Arc::new(NewsSearchTool::new(
                news,
                config.news.secondary_asset.clone(),
                config.news.num_results,
            )))
            .allow_delegation(false)
            .memory(crew_cfg.memory)
            .max_iter(crew_cfg.agent_max_iter)
            .verbose(crew_cfg.verbose);

        let writer = AgentSpec::new(&SeniorWriter, llm.clone())
            .allow_delegation(true)
            .memory(crew_cfg.memory)
            .max_iter(crew_cfg.agent_max_iter)
            .verbose(crew_cfg.verbose);

        let manager = AgentSpec::new(&CrewManager, llm).verbose(crew_cfg.verbose);

        let price_role = price_analyst.role.clone();
        let news_role = news_analyst.role.clone();
        let writer_role = writer.role.clone();

        let mut builder = Crew::builder(crew_cfg.process);
        builder
            .agent(price_analyst)
            .agent(news_analyst)
            .agent(writer)
            .manager(manager)
            .max_iter(crew_cfg.max_iter)
            .memory(crew_cfg.memory)
            .verbose(crew_cfg.verbose);
        if let Some(bus) = events {
            builder.events(bus);
        }

        let price_task = builder.task(TaskSpec::new(PRICE_TASK, PRICE_EXPECTED, price_role))?;
        let news_task = builder.task(TaskSpec::new(NEWS_TASK, NEWS_EXPECTED, news_role))?;
        builder.task(
            TaskSpec::new(WRITE_TASK, WRITE_EXPECTED, writer_role).with_context([price_task, news_task]),
        )?;

        let crew = builder.build()?;
        info!(
            "🧩 Newsletter crew ready ({:?}, {} agents, {} tasks)",
            crew.process(),
            crew.agents().len(),
            crew.tasks().len()
        );

        Ok(Self {
            crew,
            secondary_asset: config.news.secondary_asset.clone(),
        })
    }

    pub fn crew(&self) -> &Crew {
        &self.crew
    }

    pub fn inputs(&self, ticker: &str) -> HashMap<String, String> {
        HashMap::from([
            ("ticker".to_string(), ticker.to_string()),
            ("secondary".to_string(), self.secondary_asset.clone()),
            (
                "request_date".to_string(),
                Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        ])
    }
}

#[async_trait]
impl Pipeline for NewsletterPipeline {
    async fn run(&self, ticker: &str) -> Result<CrewOutput> {
        self.crew.kickoff(self.inputs(ticker)).await
    }
}
