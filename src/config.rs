use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants;
use crate::crew::Process;
use crate::error::{PipelineError, Result};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: constants::http::DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: constants::llm::DEFAULT_MODEL.to_string(),
            temperature: None,
        }
    }
}

// Keeps the credential out of the startup log line.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CrewConfig {
    pub process: Process,
    /// Manager call budget for one kickoff
    pub max_iter: usize,
    /// Step cap for each agent
    pub agent_max_iter: usize,
    pub memory: bool,
    pub verbose: bool,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            process: Process::Hierarchical,
            max_iter: constants::crew::CREW_MAX_ITER,
            agent_max_iter: constants::crew::AGENT_MAX_ITER,
            memory: true,
            verbose: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub base_url: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: String,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            base_url: constants::prices::YAHOO_CHART_BASE_URL.to_string(),
            start: parse_default_date(constants::prices::WINDOW_START),
            end: parse_default_date(constants::prices::WINDOW_END),
            interval: constants::prices::INTERVAL.to_string(),
        }
    }
}

fn parse_default_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub base_url: String,
    pub secondary_asset: String,
    pub num_results: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: constants::news::YAHOO_SEARCH_BASE_URL.to_string(),
            secondary_asset: constants::news::SECONDARY_ASSET.to_string(),
            num_results: constants::news::NUM_RESULTS,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub llm_queue_size: usize,
    pub llm_max_concurrent: usize,
    pub crew: CrewConfig,
    pub prices: PriceConfig,
    pub news: NewsConfig,

    /// YAML map of secret name -> value, used by hosted deployments
    pub secrets_file: Option<PathBuf>,
    pub run_log_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            llm_queue_size: constants::llm::DEFAULT_QUEUE_SIZE,
            llm_max_concurrent: constants::llm::DEFAULT_MAX_CONCURRENT,
            crew: CrewConfig::default(),
            prices: PriceConfig::default(),
            news: NewsConfig::default(),
            secrets_file: None,
            run_log_path: PathBuf::from(constants::reporting::DEFAULT_RUN_LOG_PATH),
        }
    }
}

impl AppConfig {
    /// Load `config.yaml` (optional), then process environment, then secrets.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file("config.yaml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.resolve_api_key()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("ℹ️ {} not found - using built-in defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_VAR).filter(|v| !v.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|v| !v.is_empty()) {
            self.llm.base_url = Some(url);
        }
        if let Some(model) = lookup("OPENAI_MODEL_NAME").filter(|v| !v.is_empty()) {
            self.llm.model = model;
        }
        if let Some(addr) = lookup("BIND_ADDR").filter(|v| !v.is_empty()) {
            self.server.bind_addr = addr;
        }
    }

    /// Fall back to the secrets file when the environment carries no key.
    pub fn resolve_api_key(&mut self) -> Result<()> {
        if self.llm.api_key.is_some() {
            return Ok(());
        }
        let Some(path) = &self.secrets_file else {
            warn!("⚠️ {} is not set and no secrets_file configured", API_KEY_VAR);
            return Ok(());
        };
        let secrets = load_secrets(path)?;
        match secrets.get(API_KEY_VAR) {
            Some(key) => {
                info!("🔑 Loaded {} from {}", API_KEY_VAR, path.display());
                self.llm.api_key = Some(key.clone());
                Ok(())
            }
            None => Err(PipelineError::Secrets(format!(
                "{} missing from {}",
                API_KEY_VAR,
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prices.start >= self.prices.end {
            return Err(PipelineError::Config(format!(
                "price window start {} must be before end {}",
                self.prices.start, self.prices.end
            )));
        }
        if self.llm_max_concurrent == 0 || self.llm_queue_size == 0 {
            return Err(PipelineError::Config(
                "llm_max_concurrent and llm_queue_size must be positive".to_string(),
            ));
        }
        if self.crew.agent_max_iter == 0 {
            return Err(PipelineError::Config("crew.agent_max_iter must be positive".to_string()));
        }
        Ok(())
    }
}

pub fn load_secrets(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| PipelineError::Secrets(format!("{}: {}", path.display(), e)))?;
    let secrets: HashMap<String, String> = serde_yaml::from_str(&content)?;
    Ok(secrets)
}
