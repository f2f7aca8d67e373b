//! Crew runner: agents working through an ordered list of tasks.
//!
//! A crew runs either sequentially (each task on its owning agent) or
//! hierarchically, where a manager model picks the coworker for every task,
//! briefs it and reviews the result. Task context may only point backwards,
//! so walking the task list in order always has every upstream output ready.

mod executor;
pub mod memory;
pub mod protocol;
pub mod task;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::agents::AgentSpec;
use crate::bus::EventBus;
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::events::CrewEvent;

pub use task::{TaskId, TaskOutput, TaskSpec};

use executor::Execution;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    Sequential,
    Hierarchical,
}

#[derive(Clone, Debug, Serialize)]
pub struct CrewOutput {
    pub run_id: Uuid,
    pub final_output: String,
    pub tasks_output: Vec<TaskOutput>,
}

pub struct Crew {
    agents: Vec<AgentSpec>,
    tasks: Vec<TaskSpec>,
    process: Process,
    manager: Option<AgentSpec>,
    max_iter: usize,
    memory: bool,
    verbose: bool,
    events: Option<EventBus>,
}

impl Crew {
    pub fn builder(process: Process) -> CrewBuilder {
        CrewBuilder {
            agents: Vec::new(),
            tasks: Vec::new(),
            process,
            manager: None,
            max_iter: constants::crew::CREW_MAX_ITER,
            memory: false,
            verbose: false,
            events: None,
        }
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn agents(&self) -> &[AgentSpec] {
        &self.agents
    }

    pub fn agent(&self, role: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.is(role))
    }

    /// Run every task once with the given template inputs.
    pub async fn kickoff(&self, inputs: HashMap<String, String>) -> Result<CrewOutput> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            "🚀 [CREW] Kickoff {} ({:?}, {} tasks, inputs: {:?})",
            run_id,
            self.process,
            self.tasks.len(),
            inputs
        );
        self.emit(CrewEvent::KickoffStarted {
            run_id,
            inputs: inputs.clone(),
        });

        let execution = Execution::new(self, inputs, run_id);
        match execution.run().await {
            Ok(tasks_output) => {
                let final_output = tasks_output.last().map(|o| o.raw.clone()).unwrap_or_default();
                let elapsed_ms = started.elapsed().as_millis() as u64;
                info!("🏁 [CREW] Kickoff {} finished in {} ms", run_id, elapsed_ms);
                self.emit(CrewEvent::KickoffFinished { run_id, elapsed_ms });
                Ok(CrewOutput {
                    run_id,
                    final_output,
                    tasks_output,
                })
            }
            Err(e) => {
                error!("❌ [CREW] Kickoff {} failed: {}", run_id, e);
                self.emit(CrewEvent::KickoffFailed {
                    run_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn emit(&self, event: CrewEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event).ok();
        }
    }
}

pub struct CrewBuilder {
    agents: Vec<AgentSpec>,
    tasks: Vec<TaskSpec>,
    process: Process,
    manager: Option<AgentSpec>,
    max_iter: usize,
    memory: bool,
    verbose: bool,
    events: Option<EventBus>,
}

impl CrewBuilder {
    pub fn agent(&mut self, agent: AgentSpec) -> &mut Self {
        self.agents.push(agent);
        self
    }

    /// Add a task; its context must name tasks added before it.
    pub fn task(&mut self, task: TaskSpec) -> Result<TaskId> {
        let id = self.tasks.len();
        if let Some(&dependency) = task.context.iter().find(|&&c| c >= id) {
            return Err(PipelineError::InvalidContext { task: id, dependency });
        }
        if !self.agents.iter().any(|a| a.is(&task.agent)) {
            return Err(PipelineError::UnknownAgent { role: task.agent });
        }
        self.tasks.push(task);
        Ok(id)
    }

    pub fn manager(&mut self, manager: AgentSpec) -> &mut Self {
        self.manager = Some(manager);
        self
    }

    pub fn max_iter(&mut self, max_iter: usize) -> &mut Self {
        self.max_iter = max_iter;
        self
    }

    pub fn memory(&mut self, memory: bool) -> &mut Self {
        self.memory = memory;
        self
    }

    pub fn verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    pub fn events(&mut self, bus: EventBus) -> &mut Self {
        self.events = Some(bus);
        self
    }

    pub fn build(self) -> Result<Crew> {
        if self.tasks.is_empty() {
            return Err(PipelineError::EmptyCrew);
        }
        if self.process == Process::Hierarchical && self.manager.is_none() {
            return Err(PipelineError::Config(
                "hierarchical process needs a manager agent".to_string(),
            ));
        }
        Ok(Crew {
            agents: self.agents,
            tasks: self.tasks,
            process: self.process,
            manager: self.manager,
            max_iter: self.max_iter,
            memory: self.memory,
            verbose: self.verbose,
            events: self.events,
        })
    }
}

#[cfg(test)]
mod crew_tests;
