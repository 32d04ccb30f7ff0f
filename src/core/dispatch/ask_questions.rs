use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::tool_handler::{CallContext, ToolCallHandler};
use crate::core::setup::SetupConfig;
use crate::core::tools::{parse_request, Args, OpSpec, ToolError, ToolSpec, ASK_QUESTIONS_TOOL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    YesNo,
    Single,
    Multiple,
}

impl Default for QuestionKind {
    fn default() -> Self {
        QuestionKind::Text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub q: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    questions: Vec<Question>,
}

fn check_questions(questions: &[Question]) -> Result<(), ToolError> {
    for (i, question) in questions.iter().enumerate() {
        if question.q.trim().is_empty() {
            return Err(ToolError::invalid(
                format!("questions[{}].q", i),
                "question text is empty",
            ));
        }
        let choice = matches!(question.kind, QuestionKind::Single | QuestionKind::Multiple);
        if choice && question.options.len() < 2 {
            return Err(ToolError::invalid(
                format!("questions[{}].options", i),
                "choice questions need at least two options",
            ));
        }
    }
    Ok(())
}

/// `ask_questions`: hands structured questions to the host UI.
pub struct AskQuestionsTool;

#[async_trait]
impl ToolCallHandler for AskQuestionsTool {
    fn spec(&self) -> &'static ToolSpec {
        &ASK_QUESTIONS_TOOL
    }

    fn check(&self, _setup: &SetupConfig, op: &OpSpec, args: &Args) -> Result<(), ToolError> {
        let request: AskRequest = parse_request(op, args)?;
        check_questions(&request.questions)
    }

    async fn execute(
        &self,
        _ctx: &CallContext<'_>,
        op: &OpSpec,
        args: &Args,
    ) -> Result<String, ToolError> {
        let request: AskRequest = parse_request(op, args)?;
        check_questions(&request.questions)?;
        let mut out = vec!["❓ Questions sent to the user:".to_string()];
        for (i, question) in request.questions.iter().enumerate() {
            let line = match question.kind {
                QuestionKind::Text => format!("{}. {}", i + 1, question.q),
                QuestionKind::YesNo => format!("{}. {} (yes/no)", i + 1, question.q),
                QuestionKind::Single => {
                    format!("{}. {} (pick one: {})", i + 1, question.q, question.options.join(", "))
                }
                QuestionKind::Multiple => format!(
                    "{}. {} (pick any: {})",
                    i + 1,
                    question.q,
                    question.options.join(", ")
                ),
            };
            out.push(line);
        }
        out.push("\nWait for the answers before continuing.".to_string());
        Ok(out.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn choice_questions_need_options() {
        let args = json!({"questions": [{"q": "Frequency?", "type": "single", "options": ["daily"]}]});
        let err = AskQuestionsTool
            .check(
                &SetupConfig::default(),
                ASK_QUESTIONS_TOOL.op("ask").unwrap(),
                args.as_object().unwrap(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("options"));
    }

    #[test]
    fn single_question_object_is_accepted() {
        let args = json!({"questions": {"q": "Which site?"}});
        AskQuestionsTool
            .check(
                &SetupConfig::default(),
                ASK_QUESTIONS_TOOL.op("ask").unwrap(),
                args.as_object().unwrap(),
            )
            .unwrap();
    }
}
