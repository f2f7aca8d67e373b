use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, info};

use super::ChatModel;
use crate::error::{PipelineError, Result};

/// Scheduling class of a model call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Agent steps inside a task that is already running
    High,
    /// Manager planning and review calls
    Normal,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
        }
    }
}

struct ChatJob {
    system_prompt: String,
    user_input: String,
    reply: oneshot::Sender<Result<String>>,
}

/// Bounded front for a chat model: at most `max_concurrent` calls in flight,
/// and queued agent steps always go before queued manager calls.
#[derive(Clone)]
pub struct LLMQueue {
    high_tx: mpsc::Sender<ChatJob>,
    normal_tx: mpsc::Sender<ChatJob>,
}

impl LLMQueue {
    pub fn new(model: Arc<dyn ChatModel>, max_concurrent: usize, queue_size: usize) -> Self {
        let (high_tx, high_rx) = mpsc::channel(queue_size);
        let (normal_tx, normal_rx) = mpsc::channel(queue_size);
        let slots = Arc::new(Semaphore::new(max_concurrent));

        tokio::spawn(Self::dispatch(model, slots, high_rx, normal_rx));

        Self { high_tx, normal_tx }
    }

    async fn dispatch(
        model: Arc<dyn ChatModel>,
        slots: Arc<Semaphore>,
        mut high_rx: mpsc::Receiver<ChatJob>,
        mut normal_rx: mpsc::Receiver<ChatJob>,
    ) {
        info!(
            "📬 [QUEUE] LLM dispatcher started (max concurrent: {})",
            slots.available_permits()
        );

        loop {
            // Take a slot before picking a lane.
            let Ok(permit) = slots.clone().acquire_owned().await else {
                break;
            };

            let (job, priority) = tokio::select! {
                biased;

                Some(job) = high_rx.recv() => (job, Priority::High),
                Some(job) = normal_rx.recv() => (job, Priority::Normal),
                else => break,
            };

            debug!(
                "📬 [QUEUE] Dispatching {} call, {} slots left",
                priority.as_str(),
                slots.available_permits()
            );

            let model = model.clone();
            tokio::spawn(async move {
                let result = model.chat(&job.system_prompt, &job.user_input, priority).await;
                // The caller may have given up; nothing to do then.
                let _ = job.reply.send(result);
                drop(permit);
            });
        }

        info!("📬 [QUEUE] LLM dispatcher stopped");
    }

    pub async fn submit(&self, system_prompt: &str, user_input: &str, priority: Priority) -> Result<String> {
        let (reply, response) = oneshot::channel();
        let job = ChatJob {
            system_prompt: system_prompt.to_string(),
            user_input: user_input.to_string(),
            reply,
        };

        let lane = match priority {
            Priority::High => &self.high_tx,
            Priority::Normal => &self.normal_tx,
        };
        lane.send(job)
            .await
            .map_err(|_| PipelineError::Llm("LLM queue is closed".to_string()))?;

        response
            .await
            .map_err(|_| PipelineError::Llm("LLM request was cancelled".to_string()))?
    }
}

#[async_trait]
impl ChatModel for LLMQueue {
    async fn chat(&self, system_prompt: &str, user_input: &str, priority: Priority) -> Result<String> {
        self.submit(system_prompt, user_input, priority).await
    }
}
