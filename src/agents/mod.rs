pub mod manager;
pub mod news_analyst;
pub mod price_analyst;
pub mod writer;

use std::collections::HashMap;
use std::sync::Arc;

use crate::constants;
use crate::crew::task::interpolate;
use crate::llm::ChatModel;
use crate::tools::{Tool, ToolBox};

pub use manager::CrewManager;
pub use news_analyst::NewsAnalyst;
pub use price_analyst::PriceAnalyst;
pub use writer::SeniorWriter;

/// Static text that steers an agent: who it is and what it wants.
pub trait Persona {
    fn role(&self) -> &str;
    fn goal(&self) -> &str;
    fn backstory(&self) -> &str;
}

/// An agent as the crew sees it: persona text plus its model, tools and flags.
#[derive(Clone)]
pub struct AgentSpec {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub llm: Arc<dyn ChatModel>,
    pub tools: ToolBox,
    pub allow_delegation: bool,
    pub memory: bool,
    pub max_iter: usize,
    pub verbose: bool,
}

impl std::fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSpec")
            .field("role", &self.role)
            .field("tools", &self.tools.names())
            .field("allow_delegation", &self.allow_delegation)
            .field("memory", &self.memory)
            .field("max_iter", &self.max_iter)
            .finish()
    }
}

impl AgentSpec {
    pub fn new(persona: &dyn Persona, llm: Arc<dyn ChatModel>) -> Self {
        Self {
            role: persona.role().to_string(),
            goal: persona.goal().to_string(),
            backstory: persona.backstory().to_string(),
            llm,
            tools: ToolBox::new(),
            allow_delegation: false,
            memory: false,
            max_iter: constants::crew::AGENT_MAX_ITER,
            verbose: false,
        }
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.add(tool);
        self
    }

    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role.trim())
    }

    /// System prompt for one task: persona, tools, coworkers and the reply protocol.
    pub fn system_prompt(&self, inputs: &HashMap<String, String>, coworkers: &[&AgentSpec]) -> String {
        let mut prompt = format!(
            "You are {}.\n{}\n\nYour personal goal is: {}\n",
            interpolate(&self.role, inputs),
            interpolate(&self.backstory, inputs),
            interpolate(&self.goal, inputs)
        );

        if !self.tools.is_empty() {
            prompt.push_str("\nYou have access to the following tools:\n");
            prompt.push_str(&self.tools.describe());
            prompt.push('\n');
        }

        if !coworkers.is_empty() {
            prompt.push_str("\nYou can delegate work or ask questions to these coworkers:\n");
            for c in coworkers {
                prompt.push_str(&format!("- {}: {}\n", c.role, interpolate(&c.goal, inputs)));
            }
        }

        prompt.push_str("\nReply with exactly one JSON object and nothing else. Allowed replies:\n");
        if !self.tools.is_empty() {
            prompt.push_str(
                r#"{"action": "use_tool", "tool": "<tool name>", "input": "<tool input>"}"#,
            );
            prompt.push('\n');
        }
        if !coworkers.is_empty() {
            prompt.push_str(
                r#"{"action": "delegate", "coworker": "<coworker role>", "task": "<what you need>", "context": "<everything they need to know>"}"#,
            );
            prompt.push('\n');
        }
        prompt.push_str(r#"{"action": "final_answer", "answer": "<your complete final answer>"}"#);
        prompt.push('\n');
        prompt
    }
}
