pub mod queue;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};

pub use queue::{LLMQueue, Priority};

/// Anything that can answer a system + user prompt pair.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, system_prompt: &str, user_input: &str, priority: Priority) -> Result<String>;
}

#[derive(Clone)]
pub struct LLMClient {
    pub client: Client<OpenAIConfig>,
    pub model: String,
    pub temperature: Option<f32>,
}

impl LLMClient {
    pub fn new(api_key: String, base_url: Option<String>, model: String) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        let client = Client::with_config(config);
        Self {
            client,
            model,
            temperature: None,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let mut client = Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
            config.model.clone(),
        );
        client.temperature = config.temperature;
        client
    }

    pub async fn complete(&self, system_prompt: &str, user_input: &str) -> Result<String> {
        info!("🤖 Sending request to LLM (Model: {})...", self.model);

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages([
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_input)
                    .build()?,
            ),
        ]);
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let request = args.build()?;

        let response = self.client.chat().create(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "🤖 Token usage: prompt={} completion={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }
        info!("🤖 LLM Response received.");

        response
            .choices
            .first()
            .map(|c| c.message.content.clone().unwrap_or_default())
            .ok_or_else(|| PipelineError::Llm("response contained no choices".to_string()))
    }
}

#[async_trait]
impl ChatModel for LLMClient {
    async fn chat(&self, system_prompt: &str, user_input: &str, _priority: Priority) -> Result<String> {
        self.complete(system_prompt, user_input).await
    }
}
