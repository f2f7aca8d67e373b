use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{bus::EventBus, error::Result, events::CrewEvent};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub ticker: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub elapsed_ms: Option<u64>,
    pub tasks_completed: u32,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_runs: u64,
    pub succeeded: u64,
    pub failed: u64,

    /// Kickoffs per requested ticker
    pub per_ticker: HashMap<String, u64>,

    /// Calls per tool name
    pub tool_calls: HashMap<String, u64>,

    pub delegations: u64,

    pub last_run: Option<RunRecord>,
}

#[derive(Default)]
struct ReporterState {
    summary: RunSummary,
    in_flight: HashMap<Uuid, RunRecord>,
}

/// Listens to crew events, appends them to a JSONL log and keeps a running summary.
#[derive(Clone)]
pub struct RunReporter {
    state: Arc<Mutex<ReporterState>>,
    log_path: PathBuf,
}

impl RunReporter {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReporterState::default())),
            log_path,
        }
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    pub fn summary(&self) -> RunSummary {
        self.lock().summary.clone()
    }

    pub fn start(&self, event_bus: &EventBus) {
        let mut rx = event_bus.subscribe();
        let reporter = self.clone();

        tokio::spawn(async move {
            info!("📈 RunReporter started (log: {})", reporter.log_path.display());

            loop {
                match rx.recv().await {
                    Ok(event) => {
                        reporter.record(&event);
                        if let Err(e) = reporter.append_jsonl(&event) {
                            error!("RunReporter failed to append event: {}", e);
                        }
                        if matches!(event, CrewEvent::KickoffFinished { .. } | CrewEvent::KickoffFailed { .. }) {
                            if let Err(e) = reporter.flush_summary() {
                                error!("RunReporter failed to flush summary: {}", e);
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("RunReporter lagged, {} events dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Fold one event into the summary.
    pub fn record(&self, event: &CrewEvent) {
        let mut state = self.lock();
        match event {
            CrewEvent::KickoffStarted { run_id, inputs } => {
                let ticker = inputs.get("ticker").cloned();
                state.summary.total_runs += 1;
                if let Some(t) = &ticker {
                    *state.summary.per_ticker.entry(t.clone()).or_insert(0) += 1;
                }
                state.in_flight.insert(
                    *run_id,
                    RunRecord {
                        run_id: *run_id,
                        ticker,
                        started_at: Utc::now().to_rfc3339(),
                        finished_at: None,
                        status: RunStatus::Running,
                        elapsed_ms: None,
                        tasks_completed: 0,
                        error: None,
                    },
                );
            }
            CrewEvent::ToolUsed { tool, .. } => {
                *state.summary.tool_calls.entry(tool.clone()).or_insert(0) += 1;
            }
            CrewEvent::Delegated { .. } => state.summary.delegations += 1,
            CrewEvent::TaskCompleted { run_id, .. } => {
                if let Some(run) = state.in_flight.get_mut(run_id) {
                    run.tasks_completed += 1;
                }
            }
            CrewEvent::KickoffFinished { run_id, elapsed_ms } => {
                state.summary.succeeded += 1;
                if let Some(mut run) = state.in_flight.remove(run_id) {
                    run.status = RunStatus::Succeeded;
                    run.elapsed_ms = Some(*elapsed_ms);
                    run.finished_at = Some(Utc::now().to_rfc3339());
                    state.summary.last_run = Some(run);
                }
            }
            CrewEvent::KickoffFailed { run_id, error } => {
                state.summary.failed += 1;
                if let Some(mut run) = state.in_flight.remove(run_id) {
                    run.status = RunStatus::Failed;
                    run.error = Some(error.clone());
                    run.finished_at = Some(Utc::now().to_rfc3339());
                    state.summary.last_run = Some(run);
                }
            }
            CrewEvent::TaskStarted { .. } => {}
        }
    }

    fn append_jsonl(&self, event: &CrewEvent) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let mut line = serde_json::to_value(event)?;
        if let Some(obj) = line.as_object_mut() {
            obj.insert("ts".to_string(), serde_json::Value::String(Utc::now().to_rfc3339()));
        }
        writeln!(f, "{}", line)?;
        Ok(())
    }

    fn flush_summary(&self) -> Result<()> {
        let summary_path = self.log_path.with_file_name("run_summary.json");
        let summary = self.summary();
        std::fs::write(summary_path, serde_json::to_vec_pretty(&summary)?)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
