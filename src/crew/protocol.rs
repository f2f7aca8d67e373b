//! JSON reply protocol spoken by agents and the manager.

use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum AgentAction {
    UseTool { tool: String, input: String },
    Delegate { coworker: String, task: String, context: String },
    FinalAnswer(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ManagerPlan {
    pub coworker: String,
    pub instructions: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ManagerReview {
    Accept,
    Revise(String),
}

/// Slice from the first `{` to the last `}`, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn value_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[derive(Deserialize)]
struct RawAction {
    action: String,
    tool: Option<String>,
    input: Option<Value>,
    coworker: Option<String>,
    task: Option<String>,
    context: Option<Value>,
    answer: Option<Value>,
}

/// A reply that is not a recognizable action is the final answer as written.
pub fn parse_action(reply: &str) -> AgentAction {
    let verbatim = || AgentAction::FinalAnswer(reply.trim().to_string());

    let Some(raw) = extract_json(reply).and_then(|j| serde_json::from_str::<RawAction>(j).ok()) else {
        return verbatim();
    };

    match raw.action.trim().to_lowercase().as_str() {
        "use_tool" | "tool" => match raw.tool {
            Some(tool) => AgentAction::UseTool {
                tool,
                input: value_text(raw.input),
            },
            None => verbatim(),
        },
        "delegate" | "delegate_work" | "ask_question" => match (raw.coworker, raw.task) {
            (Some(coworker), Some(task)) => AgentAction::Delegate {
                coworker,
                task,
                context: value_text(raw.context),
            },
            _ => verbatim(),
        },
        "final_answer" | "final" => match raw.answer {
            Some(answer) => AgentAction::FinalAnswer(value_text(Some(answer))),
            None => verbatim(),
        },
        _ => verbatim(),
    }
}

#[derive(Deserialize)]
struct RawPlan {
    coworker: String,
    #[serde(default)]
    instructions: Option<Value>,
}

pub fn parse_plan(reply: &str) -> Option<ManagerPlan> {
    let raw: RawPlan = serde_json::from_str(extract_json(reply)?).ok()?;
    Some(ManagerPlan {
        coworker: raw.coworker,
        instructions: value_text(raw.instructions),
    })
}

#[derive(Deserialize)]
struct RawReview {
    decision: String,
    #[serde(default)]
    feedback: Option<Value>,
}

/// Anything other than an explicit revise request accepts the work.
pub fn parse_review(reply: &str) -> ManagerReview {
    let Some(raw) = extract_json(reply).and_then(|j| serde_json::from_str::<RawReview>(j).ok()) else {
        return ManagerReview::Accept;
    };
    if raw.decision.trim().eq_ignore_ascii_case("revise") {
        let feedback = value_text(raw.feedback);
        if !feedback.trim().is_empty() {
            return ManagerReview::Revise(feedback);
        }
    }
    ManagerReview::Accept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call_inside_prose() {
        let reply = "Let me check.\n```json\n{\"action\": \"use_tool\", \"tool\": \"Yahoo Finance Tool\", \"input\": \"AAPL\"}\n```";
        assert_eq!(
            parse_action(reply),
            AgentAction::UseTool {
                tool: "Yahoo Finance Tool".to_string(),
                input: "AAPL".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tool_call_with_object_input() {
        let reply = r#"{"action": "use_tool", "tool": "News Search Tool", "input": {"ticker": "AAPL"}}"#;
        match parse_action(reply) {
            AgentAction::UseTool { input, .. } => assert_eq!(input, r#"{"ticker":"AAPL"}"#),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_delegate() {
        let reply = r#"{"action": "delegate", "coworker": "Stock News Analyst", "task": "What is the BTC score?", "context": "newsletter draft"}"#;
        assert_eq!(
            parse_action(reply),
            AgentAction::Delegate {
                coworker: "Stock News Analyst".to_string(),
                task: "What is the BTC score?".to_string(),
                context: "newsletter draft".to_string()
            }
        );
    }

    #[test]
    fn test_parse_final_answer() {
        let reply = r#"{"action": "final_answer", "answer": "stock= 'AAPL', price UP"}"#;
        assert_eq!(parse_action(reply), AgentAction::FinalAnswer("stock= 'AAPL', price UP".to_string()));
    }

    #[test]
    fn test_plain_text_is_final_answer_verbatim() {
        let reply = "  # Newsletter\n\nMarkets were {calm}.  ";
        assert_eq!(
            parse_action(reply),
            AgentAction::FinalAnswer("# Newsletter\n\nMarkets were {calm}.".to_string())
        );
    }

    #[test]
    fn test_incomplete_tool_call_is_final_answer() {
        let reply = r#"{"action": "use_tool", "input": "AAPL"}"#;
        assert!(matches!(parse_action(reply), AgentAction::FinalAnswer(_)));
    }

    #[test]
    fn test_parse_plan() {
        let plan = parse_plan(r#"Plan: {"coworker": "Senior Writer", "instructions": "Keep it short"}"#).unwrap();
        assert_eq!(plan.coworker, "Senior Writer");
        assert_eq!(plan.instructions, "Keep it short");
        assert!(parse_plan("I will ask the writer").is_none());
    }

    #[test]
    fn test_parse_review() {
        assert_eq!(parse_review(r#"{"decision": "accept"}"#), ManagerReview::Accept);
        assert_eq!(
            parse_review(r#"{"decision": "revise", "feedback": "Add the fear/greed score"}"#),
            ManagerReview::Revise("Add the fear/greed score".to_string())
        );
        assert_eq!(parse_review(r#"{"decision": "revise"}"#), ManagerReview::Accept);
        assert_eq!(parse_review("looks good"), ManagerReview::Accept);
    }

    #[test]
    fn test_extract_json_bounds() {
        assert_eq!(extract_json("x {\"a\":1} y"), Some("{\"a\":1}"));
        assert_eq!(extract_json("} nothing {"), None);
        assert_eq!(extract_json("none"), None);
    }
}
