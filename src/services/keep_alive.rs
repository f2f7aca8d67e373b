//! Periodic self-ping so free-tier hosting does not put the web service to sleep.

use reqwest::Client;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::constants;
use crate::error::{PipelineError, Result};

pub struct KeepAliveService {
    base_url: String,
    client: Client,
}

impl KeepAliveService {
    /// `base_url` is the public address of this service, e.g. "https://myapp.onrender.com".
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(constants::http::KEEP_ALIVE_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }

    /// Schedule the ping on a six-field cron expression.
    /// The scheduler is returned so the caller controls its lifetime.
    pub async fn start(&self, cron_expression: &str) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

        let url = self.health_url();
        let client = self.client.clone();

        let job = Job::new_async(cron_expression, move |_uuid, _l| {
            let url = url.clone();
            let client = client.clone();

            Box::pin(async move {
                match Self::ping(&url, &client).await {
                    Ok(()) => info!("🏓 [KEEP-ALIVE] Pinged {}", url),
                    Err(e) => warn!("⚠️ [KEEP-ALIVE] Ping failed: {}", e),
                }
            })
        })
        .map_err(scheduler_error)?;

        scheduler.add(job).await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;

        info!(
            "🔔 [KEEP-ALIVE] Pinging {} on schedule {}",
            self.health_url(),
            cron_expression
        );
        Ok(scheduler)
    }

    async fn ping(url: &str, client: &Client) -> Result<()> {
        let response = client.get(url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(PipelineError::Config(format!(
                "keep-alive ping to {} returned {}",
                url,
                response.status()
            )))
        }
    }
}

fn scheduler_error(e: tokio_cron_scheduler::JobSchedulerError) -> PipelineError {
    PipelineError::Config(format!("keep-alive scheduler: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url_strips_trailing_slash() {
        let service = KeepAliveService::new("http://localhost:3000/").unwrap();
        assert_eq!(service.health_url(), "http://localhost:3000/health");
    }

    #[tokio::test]
    async fn test_ping_unreachable_host_fails() {
        let client = Client::new();
        let result = KeepAliveService::ping("http://127.0.0.1:9/health", &client).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_cron_is_rejected() {
        let service = KeepAliveService::new("http://localhost:3000").unwrap();
        let result = service.start("not a cron").await;
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
