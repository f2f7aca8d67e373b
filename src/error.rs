//! Custom error types for the newsletter pipeline
//!
//! Every failure below the form handler travels as a `PipelineError`; the
//! handler is the only place that turns one into a user-visible message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Secrets error: {0}")]
    Secrets(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Price provider error for {symbol}: {reason}")]
    PriceProvider { symbol: String, reason: String },

    #[error("News provider error for {query}: {reason}")]
    NewsProvider { query: String, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Agent {agent} asked for unknown tool: {tool}")]
    UnknownTool { agent: String, tool: String },

    #[error("Unknown agent: {role}")]
    UnknownAgent { role: String },

    #[error("Task {task} uses task {dependency} as context before it exists")]
    InvalidContext { task: usize, dependency: usize },

    #[error("Crew has no tasks")]
    EmptyCrew,
}

impl From<async_openai::error::OpenAIError> for PipelineError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        PipelineError::Llm(err.to_string())
    }
}
