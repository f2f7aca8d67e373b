pub mod news;
pub mod price;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

pub use news::NewsSearchTool;
pub use price::PriceHistoryTool;

/// A capability an agent can invoke with a single text argument.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, input: &str) -> Result<String>;
}

/// Named set of tools an agent is allowed to use.
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.add(tool);
        self
    }

    pub fn add(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Exact match first, then case-insensitive
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let name = name.trim();
        self.tools.get(name).cloned().or_else(|| {
            self.tools
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, t)| t.clone())
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// One line per tool, in registration order
    pub fn describe(&self) -> String {
        self.order
            .iter()
            .filter_map(|n| self.tools.get(n))
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Models like to wrap arguments in quotes.
pub(crate) fn clean_input(input: &str) -> &str {
    input.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "Upper Tool"
        }
        fn description(&self) -> &str {
            "Uppercases its input."
        }
        async fn call(&self, input: &str) -> Result<String> {
            Ok(input.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_toolbox_lookup_is_case_insensitive() {
        let tools = ToolBox::new().with(Arc::new(Upper));

        let tool = tools.get("upper tool").unwrap();
        assert_eq!(tool.call("abc").await.unwrap(), "ABC");
        assert!(tools.get("Lower Tool").is_none());
    }

    #[test]
    fn test_describe_lists_tools() {
        let tools = ToolBox::new().with(Arc::new(Upper));
        assert_eq!(tools.describe(), "- Upper Tool: Uppercases its input.");
        assert_eq!(tools.names(), vec!["Upper Tool"]);
    }

    #[test]
    fn test_clean_input() {
        assert_eq!(clean_input("  \"AAPL\" "), "AAPL");
        assert_eq!(clean_input("'TSLA'"), "TSLA");
        assert_eq!(clean_input("MSFT"), "MSFT");
    }
}
