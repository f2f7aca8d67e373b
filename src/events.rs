use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::crew::TaskId;

/// Progress of a crew kickoff, published on the event bus.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrewEvent {
    KickoffStarted {
        run_id: Uuid,
        inputs: HashMap<String, String>,
    },
    TaskStarted {
        run_id: Uuid,
        task: TaskId,
        agent: String,
    },
    ToolUsed {
        run_id: Uuid,
        agent: String,
        tool: String,
        input: String,
    },
    Delegated {
        run_id: Uuid,
        from: String,
        to: String,
    },
    TaskCompleted {
        run_id: Uuid,
        task: TaskId,
        agent: String,
        output_chars: usize,
    },
    KickoffFinished {
        run_id: Uuid,
        elapsed_ms: u64,
    },
    KickoffFailed {
        run_id: Uuid,
        error: String,
    },
}

impl CrewEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            CrewEvent::KickoffStarted { run_id, .. }
            | CrewEvent::TaskStarted { run_id, .. }
            | CrewEvent::ToolUsed { run_id, .. }
            | CrewEvent::Delegated { run_id, .. }
            | CrewEvent::TaskCompleted { run_id, .. }
            | CrewEvent::KickoffFinished { run_id, .. }
            | CrewEvent::KickoffFailed { run_id, .. } => *run_id,
        }
    }
}
