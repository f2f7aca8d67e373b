use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::memory::ShortTermMemory;
use super::protocol::{parse_action, parse_plan, parse_review, AgentAction, ManagerReview};
use super::task::{interpolate, render_task_prompt, TaskId, TaskOutput, TaskSpec};
use super::{Crew, Process};
use crate::agents::AgentSpec;
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::events::CrewEvent;
use crate::llm::Priority;

const FORCE_FINAL: &str =
    "\n\nYou have used all of your steps. Give your best complete final answer now, as plain text.";

const NO_DELEGATION: &str =
    "Delegation is not available here. Continue with your own tools or give your final answer.";

/// State of one kickoff.
pub(super) struct Execution<'a> {
    crew: &'a Crew,
    inputs: HashMap<String, String>,
    run_id: Uuid,
}

impl<'a> Execution<'a> {
    pub(super) fn new(crew: &'a Crew, inputs: HashMap<String, String>, run_id: Uuid) -> Self {
        Self { crew, inputs, run_id }
    }

    pub(super) async fn run(&self) -> Result<Vec<TaskOutput>> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.crew.tasks.len());
        let mut memory = ShortTermMemory::new();
        let mut budget = self.crew.max_iter;

        for (id, task) in self.crew.tasks.iter().enumerate() {
            let owner = self
                .crew
                .agent(&task.agent)
                .ok_or_else(|| PipelineError::UnknownAgent { role: task.agent.clone() })?;
            let context: Vec<&TaskOutput> = task.context.iter().filter_map(|&c| outputs.get(c)).collect();

            let output = match self.crew.process {
                Process::Sequential => self.perform(id, task, owner, &context, None, &memory).await?,
                Process::Hierarchical => {
                    self.manage(id, task, owner, &context, &mut budget, &memory).await?
                }
            };

            if self.crew.memory {
                memory.remember(&output.agent, &output.description, &output.raw);
            }
            outputs.push(output);
        }

        Ok(outputs)
    }

    /// Hierarchical step: the manager briefs a coworker and reviews its work.
    async fn manage(
        &self,
        id: TaskId,
        task: &TaskSpec,
        owner: &AgentSpec,
        context: &[&TaskOutput],
        budget: &mut usize,
        memory: &ShortTermMemory,
    ) -> Result<TaskOutput> {
        let manager = self
            .crew
            .manager
            .as_ref()
            .ok_or_else(|| PipelineError::Config("hierarchical process needs a manager agent".to_string()))?;

        if *budget == 0 {
            warn!("🧭 [MANAGER] Budget exhausted, {} runs task {} as assigned", owner.role, id);
            return self.perform(id, task, owner, context, None, memory).await;
        }

        let system = self.manager_system_prompt(manager);

        *budget -= 1;
        let plan_reply = manager
            .llm
            .chat(&system, &self.plan_prompt(task), Priority::Normal)
            .await?;

        let (agent, instructions) = match parse_plan(&plan_reply) {
            Some(plan) => match self.crew.agent(&plan.coworker) {
                Some(agent) => (agent, Some(plan.instructions)),
                None => {
                    warn!(
                        "🧭 [MANAGER] No coworker named {:?}, falling back to {}",
                        plan.coworker, owner.role
                    );
                    (owner, Some(plan.instructions))
                }
            },
            None => {
                warn!("🧭 [MANAGER] Unreadable plan for task {}, falling back to {}", id, owner.role);
                (owner, None)
            }
        };

        info!("🧭 [MANAGER] Task {} delegated to {}", id, agent.role);
        self.emit(CrewEvent::Delegated {
            run_id: self.run_id,
            from: manager.role.clone(),
            to: agent.role.clone(),
        });

        let mut output = self
            .perform(id, task, agent, context, instructions.as_deref(), memory)
            .await?;

        while *budget > 0 {
            *budget -= 1;
            let review_reply = manager
                .llm
                .chat(&system, &self.review_prompt(task, &output), Priority::Normal)
                .await?;

            match parse_review(&review_reply) {
                ManagerReview::Accept => {
                    info!("🧭 [MANAGER] Accepted task {} from {}", id, agent.role);
                    break;
                }
                ManagerReview::Revise(feedback) => {
                    info!("🧭 [MANAGER] Asked {} to revise task {}", agent.role, id);
                    let note = format!(
                        "{}\n\nYour previous answer was:\n{}\n\nRevise it according to this feedback:\n{}",
                        instructions.as_deref().unwrap_or(""),
                        output.raw.trim(),
                        feedback.trim()
                    );
                    output = self.perform(id, task, agent, context, Some(&note), memory).await?;
                }
            }
        }

        Ok(output)
    }

    async fn perform(
        &self,
        id: TaskId,
        task: &TaskSpec,
        agent: &AgentSpec,
        context: &[&TaskOutput],
        instructions: Option<&str>,
        memory: &ShortTermMemory,
    ) -> Result<TaskOutput> {
        let description = interpolate(&task.description, &self.inputs);
        let expected = interpolate(&task.expected_output, &self.inputs);
        let recalled = if self.crew.memory && agent.memory && !memory.is_empty() {
            Some(memory.recall(constants::crew::MEMORY_RECALL_LIMIT))
        } else {
            None
        };
        let prompt = render_task_prompt(&description, &expected, context, recalled.as_deref(), instructions);

        self.emit(CrewEvent::TaskStarted {
            run_id: self.run_id,
            task: id,
            agent: agent.role.clone(),
        });
        info!("📋 [TASK] {} working on task {}", agent.role, id);

        let raw = self.work(agent, prompt).await?;

        self.emit(CrewEvent::TaskCompleted {
            run_id: self.run_id,
            task: id,
            agent: agent.role.clone(),
            output_chars: raw.chars().count(),
        });

        Ok(TaskOutput {
            task: id,
            agent: agent.role.clone(),
            description,
            raw,
        })
    }

    /// Agent loop: tool calls and delegation until a final answer or `max_iter`.
    async fn work(&self, agent: &AgentSpec, prompt: String) -> Result<String> {
        let coworkers: Vec<&AgentSpec> = if agent.allow_delegation {
            self.crew.agents.iter().filter(|a| !a.is(&agent.role)).collect()
        } else {
            Vec::new()
        };
        let system = agent.system_prompt(&self.inputs, &coworkers);
        let mut transcript = prompt;

        for step in 1..=agent.max_iter {
            let reply = agent.llm.chat(&system, &transcript, Priority::High).await?;
            self.trace(agent, &format!("step {}/{}: {}", step, agent.max_iter, reply));

            let observation = match parse_action(&reply) {
                AgentAction::FinalAnswer(answer) => return Ok(answer),
                AgentAction::UseTool { tool, input } => self.use_tool(agent, &tool, &input).await?,
                AgentAction::Delegate { coworker, task, context } => {
                    match coworkers.iter().find(|c| c.is(&coworker)) {
                        Some(c) => self.consult(agent, c, &task, &context).await?,
                        None if coworkers.is_empty() => NO_DELEGATION.to_string(),
                        None => format!(
                            "There is no coworker named {}. Available coworkers: {}",
                            coworker,
                            coworkers.iter().map(|c| c.role.as_str()).collect::<Vec<_>>().join(", ")
                        ),
                    }
                }
            };
            transcript.push_str(&format!("\n\n{}\nObservation:\n{}", reply.trim(), observation));
        }

        self.force_final(agent, &system, transcript).await
    }

    /// A coworker answers a delegated question; coworkers cannot delegate again.
    async fn consult(&self, from: &AgentSpec, coworker: &AgentSpec, question: &str, context: &str) -> Result<String> {
        info!("🤝 [DELEGATE] {} -> {}: {}", from.role, coworker.role, question);
        self.emit(CrewEvent::Delegated {
            run_id: self.run_id,
            from: from.role.clone(),
            to: coworker.role.clone(),
        });

        let system = coworker.system_prompt(&self.inputs, &[]);
        let mut transcript = format!("{}\n\nContext from {}:\n{}", question.trim(), from.role, context.trim());

        for step in 1..=coworker.max_iter {
            let reply = coworker.llm.chat(&system, &transcript, Priority::High).await?;
            self.trace(coworker, &format!("delegated step {}/{}: {}", step, coworker.max_iter, reply));

            let observation = match parse_action(&reply) {
                AgentAction::FinalAnswer(answer) => return Ok(answer),
                AgentAction::UseTool { tool, input } => self.use_tool(coworker, &tool, &input).await?,
                AgentAction::Delegate { .. } => NO_DELEGATION.to_string(),
            };
            transcript.push_str(&format!("\n\n{}\nObservation:\n{}", reply.trim(), observation));
        }

        self.force_final(coworker, &system, transcript).await
    }

    async fn use_tool(&self, agent: &AgentSpec, tool: &str, input: &str) -> Result<String> {
        let found = agent.tools.get(tool).ok_or_else(|| PipelineError::UnknownTool {
            agent: agent.role.clone(),
            tool: tool.to_string(),
        })?;

        info!("🔧 [TOOL] {} -> {} ({})", agent.role, found.name(), input);
        self.emit(CrewEvent::ToolUsed {
            run_id: self.run_id,
            agent: agent.role.clone(),
            tool: found.name().to_string(),
            input: input.to_string(),
        });

        found.call(input).await
    }

    async fn force_final(&self, agent: &AgentSpec, system: &str, mut transcript: String) -> Result<String> {
        warn!("⏱️ [AGENT] {} reached max_iter ({}), asking for a final answer", agent.role, agent.max_iter);
        transcript.push_str(FORCE_FINAL);
        let reply = agent.llm.chat(system, &transcript, Priority::High).await?;
        Ok(match parse_action(&reply) {
            AgentAction::FinalAnswer(answer) => answer,
            _ => reply.trim().to_string(),
        })
    }

    fn manager_system_prompt(&self, manager: &AgentSpec) -> String {
        format!(
            "You are {}.\n{}\n\nYour personal goal is: {}\n\nYou never do the work yourself. You choose which coworker handles each task, brief them and review what they deliver.\n",
            manager.role,
            interpolate(&manager.backstory, &self.inputs),
            interpolate(&manager.goal, &self.inputs)
        )
    }

    fn plan_prompt(&self, task: &TaskSpec) -> String {
        let coworkers = self
            .crew
            .agents
            .iter()
            .map(|a| format!("- {}: {}", a.role, interpolate(&a.goal, &self.inputs)))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Task: {}\n\nExpected output: {}\n\nSuggested coworker: {}\n\nCoworkers:\n{}\n\nPick the coworker best suited for this task and brief them. Reply with exactly one JSON object:\n{{\"coworker\": \"<coworker role>\", \"instructions\": \"<extra guidance for the coworker>\"}}\n",
            interpolate(&task.description, &self.inputs).trim(),
            interpolate(&task.expected_output, &self.inputs).trim(),
            task.agent,
            coworkers
        )
    }

    fn review_prompt(&self, task: &TaskSpec, output: &TaskOutput) -> String {
        format!(
            "Task: {}\n\nExpected output: {}\n\nAnswer from {}:\n{}\n\nDoes this answer fully meet the expected output? Reply with exactly one JSON object:\n{{\"decision\": \"accept\"}} or {{\"decision\": \"revise\", \"feedback\": \"<what to change>\"}}\n",
            output.description.trim(),
            interpolate(&task.expected_output, &self.inputs).trim(),
            output.agent,
            output.raw.trim()
        )
    }

    fn trace(&self, agent: &AgentSpec, message: &str) {
        if self.crew.verbose || agent.verbose {
            info!("🤖 [AGENT] {}: {}", agent.role, message);
        } else {
            debug!("🤖 [AGENT] {}: {}", agent.role, message);
        }
    }

    fn emit(&self, event: CrewEvent) {
        self.crew.emit(event);
    }
}
