//! Stock newsletter crew - LLM agents that research a ticker and write a newsletter.
//!
//! A price analyst reads the ticker's price history, a news analyst reads
//! recent headlines for the ticker and a secondary asset, and a writer turns
//! both reports into a short markdown newsletter. The crew engine, the data
//! providers and the web form are exposed for reuse and testing.

pub mod agents;
pub mod api;
pub mod bus;
pub mod config;
pub mod constants;
pub mod crew;
pub mod data;
pub mod error;
pub mod events;
pub mod llm;
pub mod pipeline;
pub mod services;
pub mod tools;

// Re-export commonly used types
pub use bus::EventBus;
pub use config::AppConfig;
pub use crew::{Crew, CrewOutput, Process};
pub use error::{PipelineError, Result};
pub use events::CrewEvent;
pub use pipeline::{NewsletterPipeline, Pipeline};
