/// Short-term memory shared by the agents of one kickoff.
#[derive(Clone, Debug, Default)]
pub struct ShortTermMemory {
    entries: Vec<MemoryEntry>,
}

#[derive(Clone, Debug)]
pub struct MemoryEntry {
    pub agent: String,
    pub task: String,
    pub output: String,
}

impl ShortTermMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, agent: &str, task: &str, output: &str) {
        self.entries.push(MemoryEntry {
            agent: agent.to_string(),
            task: task.trim().to_string(),
            output: output.trim().to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent `limit` entries, oldest first
    pub fn recall(&self, limit: usize) -> String {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries
            .iter()
            .skip(skip)
            .map(|e| format!("- {} finished \"{}\":\n{}", e.agent, first_line(&e.task), e.output))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
