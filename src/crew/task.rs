use serde::Serialize;
use std::collections::HashMap;

/// Position of a task in its crew.
pub type TaskId = usize;

#[derive(Clone, Debug)]
pub struct TaskSpec {
    pub description: String,
    pub expected_output: String,
    /// Role of the owning agent
    pub agent: String,
    /// Upstream tasks whose outputs this task reads
    pub context: Vec<TaskId>,
}

impl TaskSpec {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl IntoIterator<Item = TaskId>) -> Self {
        self.context = context.into_iter().collect();
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TaskOutput {
    pub task: TaskId,
    pub agent: String,
    pub description: String,
    pub raw: String,
}

/// Replace every `{key}` with its input value; unknown placeholders stay as is.
pub fn interpolate(template: &str, inputs: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    // Single pass; substituted values are never scanned again.
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        if let Some(close) = after.find('}') {
            if let Some(value) = inputs.get(&after[..close]) {
                out.push_str(value);
                rest = &after[close + 1..];
                continue;
            }
        }
        out.push('{');
        rest = after;
    }

    out.push_str(rest);
    out
}

/// User message for an agent working on a task.
pub fn render_task_prompt(
    description: &str,
    expected_output: &str,
    context: &[&TaskOutput],
    memory: Option<&str>,
    instructions: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\nYou MUST return the actual complete content as the final answer, not a summary.\n",
        description.trim(),
        expected_output.trim()
    );

    if !context.is_empty() {
        prompt.push_str("\nThis is the context you're working with:\n");
        for output in context {
            prompt.push_str(&format!("### {} ({})\n{}\n\n", output.description.trim(), output.agent, output.raw.trim()));
        }
    }

    if let Some(memory) = memory.filter(|m| !m.is_empty()) {
        prompt.push_str("\nThings you remember from earlier in this run:\n");
        prompt.push_str(memory);
        prompt.push('\n');
    }

    if let Some(instructions) = instructions.filter(|i| !i.trim().is_empty()) {
        prompt.push_str("\nAdditional instructions from your manager:\n");
        prompt.push_str(instructions.trim());
        prompt.push('\n');
    }

    prompt
}
