//! Unit tests for crew assembly and kickoff, driven by scripted models.

#[cfg(test)]
mod crew_tests {
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::agents::{AgentSpec, CrewManager, NewsAnalyst, PriceAnalyst, SeniorWriter};
    use crate::bus::EventBus;
    use crate::crew::{Crew, Process, TaskSpec};
    use crate::error::{PipelineError, Result};
    use crate::events::CrewEvent;
    use crate::llm::{ChatModel, Priority};
    use crate::tools::Tool;

    /// Replies from a fixed script and records every prompt it saw.
    struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn user_prompt(&self, i: usize) -> String {
            self.prompts.lock().unwrap()[i].1.clone()
        }

        fn system_prompt(&self, i: usize) -> String {
            self.prompts.lock().unwrap()[i].0.clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, system_prompt: &str, user_input: &str, _priority: Priority) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_input.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| PipelineError::Llm("script exhausted".to_string()))
        }
    }

    struct CountingTool {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl CountingTool {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Returns canned data."
        }
        async fn call(&self, input: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("data for {}", input))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "Broken Tool"
        }
        fn description(&self) -> &str {
            "Always fails."
        }
        async fn call(&self, input: &str) -> Result<String> {
            Err(PipelineError::PriceProvider {
                symbol: input.to_string(),
                reason: "provider outage".to_string(),
            })
        }
    }

    fn inputs(ticker: &str) -> HashMap<String, String> {
        HashMap::from([("ticker".to_string(), ticker.to_string())])
    }

    fn final_answer(text: &str) -> String {
        serde_json::json!({"action": "final_answer", "answer": text}).to_string()
    }

    /// Three-task crew shaped like the newsletter pipeline.
    fn three_task_crew(
        process: Process,
        price: Arc<ScriptedModel>,
        news: Arc<ScriptedModel>,
        writer: Arc<ScriptedModel>,
        manager: Option<Arc<ScriptedModel>>,
        max_iter: usize,
    ) -> Crew {
        let mut builder = Crew::builder(process);
        builder
            .agent(AgentSpec::new(&PriceAnalyst, price).tool(CountingTool::new("Yahoo Finance Tool")))
            .agent(AgentSpec::new(&NewsAnalyst, news))
            .agent(AgentSpec::new(&SeniorWriter, writer))
            .max_iter(max_iter);
        if let Some(m) = manager {
            builder.manager(AgentSpec::new(&CrewManager, m));
        }
        let t1 = builder
            .task(TaskSpec::new("Analyze {ticker} prices", "up, down or sideways", "Senior Stock Price Analyst"))
            .unwrap();
        let t2 = builder
            .task(TaskSpec::new("Summarize {ticker} news", "fear/greed score", "Stock News Analyst"))
            .unwrap();
        builder
            .task(TaskSpec::new("Write about {ticker}", "a newsletter", "Senior Writer").with_context([t1, t2]))
            .unwrap();
        builder.build().unwrap()
    }

    // ============= Builder Tests =============

    #[test]
    fn test_builder_rejects_forward_context() {
        let mut builder = Crew::builder(Process::Sequential);
        builder.agent(AgentSpec::new(&SeniorWriter, ScriptedModel::new(&[])));

        let err = builder
            .task(TaskSpec::new("d", "e", "Senior Writer").with_context([0]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidContext { task: 0, dependency: 0 }));

        builder.task(TaskSpec::new("d", "e", "Senior Writer")).unwrap();
        let err = builder
            .task(TaskSpec::new("d", "e", "Senior Writer").with_context([0, 5]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidContext { task: 1, dependency: 5 }));
    }

    #[test]
    fn test_builder_rejects_unknown_agent() {
        let mut builder = Crew::builder(Process::Sequential);
        builder.agent(AgentSpec::new(&SeniorWriter, ScriptedModel::new(&[])));

        let err = builder.task(TaskSpec::new("d", "e", "Ghost Writer")).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownAgent { .. }));
    }

    #[test]
    fn test_builder_requires_tasks_and_manager() {
        let builder = Crew::builder(Process::Sequential);
        assert!(matches!(builder.build(), Err(PipelineError::EmptyCrew)));

        let mut builder = Crew::builder(Process::Hierarchical);
        builder.agent(AgentSpec::new(&SeniorWriter, ScriptedModel::new(&[])));
        builder.task(TaskSpec::new("d", "e", "Senior Writer")).unwrap();
        assert!(matches!(builder.build(), Err(PipelineError::Config(_))));
    }

    // ============= Sequential Kickoff Tests =============

    #[tokio::test]
    async fn test_sequential_kickoff_passes_context_to_writer() {
        let price = ScriptedModel::new(&[
            r#"{"action": "use_tool", "tool": "Yahoo Finance Tool", "input": "AAPL"}"#,
            final_answer("stock= 'AAPL', price UP").as_str(),
        ]);
        let news = ScriptedModel::new(&[final_answer("AAPL greed 72; BTC fear 30").as_str()]);
        let writer = ScriptedModel::new(&["# AAPL Weekly\n\nPrices are up."]);
        let crew = three_task_crew(Process::Sequential, price.clone(), news.clone(), writer.clone(), None, 15);

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();

        assert_eq!(out.tasks_output.len(), 3);
        assert_eq!(out.tasks_output[0].raw, "stock= 'AAPL', price UP");
        assert_eq!(out.tasks_output[0].description, "Analyze AAPL prices");
        assert_eq!(out.final_output, "# AAPL Weekly\n\nPrices are up.");

        // tool observation fed back on the second price step
        assert!(price.user_prompt(1).contains("Observation:\ndata for AAPL"));

        let writer_prompt = writer.user_prompt(0);
        assert!(writer_prompt.contains("Current Task: Write about AAPL"));
        assert!(writer_prompt.contains("stock= 'AAPL', price UP"));
        assert!(writer_prompt.contains("AAPL greed 72; BTC fear 30"));
    }

    #[tokio::test]
    async fn test_agent_forced_to_answer_after_max_iter() {
        let tool_call = r#"{"action": "use_tool", "tool": "Yahoo Finance Tool", "input": "TSLA"}"#;
        let price = ScriptedModel::new(&[tool_call, tool_call, "sideways, I think"]);

        let mut builder = Crew::builder(Process::Sequential);
        builder.agent(
            AgentSpec::new(&PriceAnalyst, price.clone())
                .tool(CountingTool::new("Yahoo Finance Tool"))
                .max_iter(2),
        );
        builder.task(TaskSpec::new("Analyze {ticker}", "trend", "Senior Stock Price Analyst")).unwrap();
        let crew = builder.build().unwrap();

        let out = crew.kickoff(inputs("TSLA")).await.unwrap();

        assert_eq!(out.final_output, "sideways, I think");
        assert_eq!(price.calls(), 3);
        assert!(price.user_prompt(2).contains("You have used all of your steps"));
    }

    #[tokio::test]
    async fn test_tool_error_propagates_and_emits_failure() {
        let price = ScriptedModel::new(&[r#"{"action": "use_tool", "tool": "Broken Tool", "input": "XYZ"}"#]);
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let mut builder = Crew::builder(Process::Sequential);
        builder
            .agent(AgentSpec::new(&PriceAnalyst, price).tool(Arc::new(BrokenTool)))
            .events(bus.clone());
        builder.task(TaskSpec::new("Analyze {ticker}", "trend", "Senior Stock Price Analyst")).unwrap();
        let crew = builder.build().unwrap();

        let err = crew.kickoff(inputs("XYZ")).await.unwrap_err();
        assert!(err.to_string().contains("provider outage"));

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let CrewEvent::KickoffFailed { error, .. } = event {
                assert!(error.contains("provider outage"));
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let price = ScriptedModel::new(&[r#"{"action": "use_tool", "tool": "Crystal Ball", "input": "AAPL"}"#]);

        let mut builder = Crew::builder(Process::Sequential);
        builder.agent(AgentSpec::new(&PriceAnalyst, price));
        builder.task(TaskSpec::new("Analyze", "trend", "Senior Stock Price Analyst")).unwrap();
        let crew = builder.build().unwrap();

        let err = crew.kickoff(inputs("AAPL")).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTool { .. }));
    }

    #[tokio::test]
    async fn test_writer_delegates_question_to_coworker() {
        let news = ScriptedModel::new(&[final_answer("BTC fear/greed is 30").as_str()]);
        let writer = ScriptedModel::new(&[
            r#"{"action": "delegate", "coworker": "stock news analyst", "task": "What is the BTC score?", "context": "drafting"}"#,
            final_answer("Newsletter with BTC at 30").as_str(),
        ]);

        let mut builder = Crew::builder(Process::Sequential);
        builder
            .agent(AgentSpec::new(&NewsAnalyst, news.clone()))
            .agent(AgentSpec::new(&SeniorWriter, writer.clone()).allow_delegation(true));
        builder.task(TaskSpec::new("Write", "newsletter", "Senior Writer")).unwrap();
        let crew = builder.build().unwrap();

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();

        assert_eq!(out.final_output, "Newsletter with BTC at 30");
        assert!(news.user_prompt(0).starts_with("What is the BTC score?"));
        assert!(news.user_prompt(0).contains("Context from Senior Writer:\ndrafting"));
        // coworker is not offered delegation
        assert!(!news.system_prompt(0).contains(r#""action": "delegate""#));
        assert!(writer.user_prompt(1).contains("Observation:\nBTC fear/greed is 30"));
    }

    #[tokio::test]
    async fn test_delegation_refused_when_not_allowed() {
        let writer = ScriptedModel::new(&[
            r#"{"action": "delegate", "coworker": "Stock News Analyst", "task": "help", "context": ""}"#,
            final_answer("done alone").as_str(),
        ]);
        let news = ScriptedModel::new(&[]);

        let mut builder = Crew::builder(Process::Sequential);
        builder
            .agent(AgentSpec::new(&NewsAnalyst, news.clone()))
            .agent(AgentSpec::new(&SeniorWriter, writer.clone()));
        builder.task(TaskSpec::new("Write", "newsletter", "Senior Writer")).unwrap();
        let crew = builder.build().unwrap();

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();
        assert_eq!(out.final_output, "done alone");
        assert_eq!(news.calls(), 0);
        assert!(writer.user_prompt(1).contains("Delegation is not available"));
    }

    #[tokio::test]
    async fn test_memory_recalls_earlier_outputs() {
        let first = ScriptedModel::new(&[final_answer("first result").as_str()]);
        let second = ScriptedModel::new(&[final_answer("second result").as_str()]);

        let mut builder = Crew::builder(Process::Sequential);
        builder
            .agent(AgentSpec::new(&PriceAnalyst, first))
            .agent(AgentSpec::new(&NewsAnalyst, second.clone()).memory(true))
            .memory(true);
        builder.task(TaskSpec::new("One", "x", "Senior Stock Price Analyst")).unwrap();
        builder.task(TaskSpec::new("Two", "y", "Stock News Analyst")).unwrap();
        let crew = builder.build().unwrap();

        crew.kickoff(inputs("AAPL")).await.unwrap();

        let prompt = second.user_prompt(0);
        assert!(prompt.contains("Things you remember"));
        assert!(prompt.contains("Senior Stock Price Analyst finished \"One\":\nfirst result"));
    }

    // ============= Hierarchical Kickoff Tests =============

    #[tokio::test]
    async fn test_hierarchical_manager_delegates_and_reviews() {
        let manager = ScriptedModel::new(&[
            r#"{"coworker": "Senior Stock Price Analyst", "instructions": "Use the last year"}"#,
            r#"{"decision": "accept"}"#,
            r#"{"coworker": "Stock News Analyst", "instructions": "Include BTC"}"#,
            r#"{"decision": "accept"}"#,
            r#"{"coworker": "Senior Writer", "instructions": "Markdown please"}"#,
            r#"{"decision": "accept"}"#,
        ]);
        let price = ScriptedModel::new(&[final_answer("price UP").as_str()]);
        let news = ScriptedModel::new(&[final_answer("greed 70").as_str()]);
        let writer = ScriptedModel::new(&[final_answer("## Newsletter").as_str()]);
        let crew = three_task_crew(
            Process::Hierarchical,
            price.clone(),
            news.clone(),
            writer.clone(),
            Some(manager.clone()),
            15,
        );

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();

        assert_eq!(out.final_output, "## Newsletter");
        assert_eq!(manager.calls(), 6);
        assert!(manager.user_prompt(0).contains("Task: Analyze AAPL prices"));
        assert!(manager.user_prompt(1).contains("Answer from Senior Stock Price Analyst:\nprice UP"));
        assert!(price.user_prompt(0).contains("Additional instructions from your manager:\nUse the last year"));
        assert!(writer.user_prompt(0).contains("price UP"));
        assert!(writer.user_prompt(0).contains("greed 70"));
    }

    #[tokio::test]
    async fn test_hierarchical_revision_round() {
        let manager = ScriptedModel::new(&[
            r#"{"coworker": "Stock News Analyst", "instructions": ""}"#,
            r#"{"decision": "revise", "feedback": "Add a fear/greed score"}"#,
            r#"{"decision": "accept"}"#,
        ]);
        let news = ScriptedModel::new(&[final_answer("news summary").as_str(), final_answer("news summary, score 55").as_str()]);

        let mut builder = Crew::builder(Process::Hierarchical);
        builder
            .agent(AgentSpec::new(&NewsAnalyst, news.clone()))
            .manager(AgentSpec::new(&CrewManager, manager.clone()));
        builder.task(TaskSpec::new("News for {ticker}", "summary", "Stock News Analyst")).unwrap();
        let crew = builder.build().unwrap();

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();

        assert_eq!(out.final_output, "news summary, score 55");
        let second = news.user_prompt(1);
        assert!(second.contains("Your previous answer was:\nnews summary"));
        assert!(second.contains("Add a fear/greed score"));
    }

    #[tokio::test]
    async fn test_hierarchical_budget_bounds_manager_calls() {
        // Budget of 1: one plan call, no reviews, later tasks go straight to owners.
        let manager = ScriptedModel::new(&[r#"{"coworker": "Senior Stock Price Analyst", "instructions": "go"}"#]);
        let price = ScriptedModel::new(&[final_answer("price UP").as_str()]);
        let news = ScriptedModel::new(&[final_answer("greed 70").as_str()]);
        let writer = ScriptedModel::new(&[final_answer("newsletter").as_str()]);
        let crew = three_task_crew(
            Process::Hierarchical,
            price,
            news,
            writer,
            Some(manager.clone()),
            1,
        );

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();

        assert_eq!(manager.calls(), 1);
        assert_eq!(out.final_output, "newsletter");
        assert_eq!(out.tasks_output[1].agent, "Stock News Analyst");
    }

    #[tokio::test]
    async fn test_hierarchical_unknown_coworker_falls_back_to_owner() {
        let manager = ScriptedModel::new(&[
            r#"{"coworker": "Intern", "instructions": "try hard"}"#,
            r#"{"decision": "accept"}"#,
        ]);
        let writer = ScriptedModel::new(&[final_answer("written by owner").as_str()]);

        let mut builder = Crew::builder(Process::Hierarchical);
        builder
            .agent(AgentSpec::new(&SeniorWriter, writer))
            .manager(AgentSpec::new(&CrewManager, manager));
        builder.task(TaskSpec::new("Write", "newsletter", "Senior Writer")).unwrap();
        let crew = builder.build().unwrap();

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();
        assert_eq!(out.tasks_output[0].agent, "Senior Writer");
        assert_eq!(out.final_output, "written by owner");
    }

    #[tokio::test]
    async fn test_kickoff_event_sequence() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let price = ScriptedModel::new(&[
            r#"{"action": "use_tool", "tool": "Yahoo Finance Tool", "input": "AAPL"}"#,
            final_answer("UP").as_str(),
        ]);

        let mut builder = Crew::builder(Process::Sequential);
        builder
            .agent(AgentSpec::new(&PriceAnalyst, price).tool(CountingTool::new("Yahoo Finance Tool")))
            .events(bus.clone());
        builder.task(TaskSpec::new("Analyze", "trend", "Senior Stock Price Analyst")).unwrap();
        let crew = builder.build().unwrap();

        let out = crew.kickoff(inputs("AAPL")).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.run_id(), out.run_id);
            kinds.push(match event {
                CrewEvent::KickoffStarted { .. } => "started",
                CrewEvent::TaskStarted { .. } => "task",
                CrewEvent::ToolUsed { .. } => "tool",
                CrewEvent::Delegated { .. } => "delegated",
                CrewEvent::TaskCompleted { .. } => "completed",
                CrewEvent::KickoffFinished { .. } => "finished",
                CrewEvent::KickoffFailed { .. } => "failed",
            });
        }
        assert_eq!(kinds, vec!["started", "task", "tool", "completed", "finished"]);
    }
}
