use super::retry_on_transient;
use crate::evaluators::pyright::PARSE_FAILURE_PREFIX;
use crate::evaluators::{EvalResult, Evaluator, PyrightEvaluator};
use crate::llm::{ChatResponse, ToolSpec};
use crate::message::MessagesState;
use crate::reflection::Verdict;
use crate::tools::strip_code_fences;
use crate::{Agent, Ctx, Outcome, StepResult};
use serde_json::json;
use tracing::info;

const EXTRACT_CODE: &str = "ExtractPythonCode";
const NO_CODE: &str = "NoCode";

const EXTRACTION_PROMPT: &str = "\
The conversation below is you helping a user write some Python code. Your final \
response is the last message in the list.

Sometimes you answer with code, sometimes with a question.

If there is code, extract it into a single Python script using ExtractPythonCode.

If there is no code to extract, call NoCode.";

const UNPARSEABLE_FEEDBACK: &str = "\
I tried to validate the code with Pyright, but encountered an issue. Please review \
the code for syntax errors, type issues, and best practices. Make sure the code is \
complete and can be executed as a standalone script.";

/// Judge for coding assistants: pulls the script out of the latest answer
/// and type-checks it.
///
/// Answers without code are approved, so a generator that asks a clarifying
/// question ends the loop and hands the question to the user.
pub struct CodeJudge {
    evaluator: Box<dyn Evaluator>,
    model: Option<String>,
}

impl Default for CodeJudge {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeJudge {
    pub fn new() -> Self {
        Self::with_evaluator(PyrightEvaluator::new())
    }

    pub fn with_evaluator(evaluator: impl Evaluator) -> Self {
        Self {
            evaluator: Box::new(evaluator),
            model: None,
        }
    }

    /// Model used for the extraction call.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

fn extraction_tools() -> [ToolSpec; 2] {
    [
        ToolSpec::new(
            EXTRACT_CODE,
            "Extract the Python code. The python_code field is the code to be extracted.",
            json!({
                "type": "object",
                "properties": {"python_code": {"type": "string"}},
                "required": ["python_code"]
            }),
        ),
        ToolSpec::new(
            NO_CODE,
            "Indicate that the final response contains no code.",
            json!({
                "type": "object",
                "properties": {"no_code": {"type": "boolean"}},
                "required": ["no_code"]
            }),
        ),
    ]
}

/// The script the model extracted, if it called `ExtractPythonCode`.
///
/// Models that ignore the tools and answer with a bare fenced block are
/// taken at their word: the block is the script.
pub fn extracted_code(reply: &ChatResponse) -> Option<String> {
    match reply.tool_calls.first() {
        Some(call) if call.name == EXTRACT_CODE => call
            .arguments
            .get("python_code")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        Some(_) => None,
        None if reply.content.trim_start().starts_with("```") => {
            let code = strip_code_fences(&reply.content);
            (!code.is_empty()).then_some(code)
        }
        None => None,
    }
}

/// Feedback for the generator after a Pyright run.
pub fn pyright_feedback(result: &EvalResult) -> Verdict {
    if result.score {
        return Verdict::Approved;
    }
    let comment = result.comment.as_deref().unwrap_or("Unknown error");
    if comment.starts_with(PARSE_FAILURE_PREFIX) {
        return Verdict::NeedsRevision(UNPARSEABLE_FEEDBACK.to_string());
    }
    Verdict::NeedsRevision(format!(
        "I ran pyright and found this: {comment}\n\n\
         Try to fix it. Make sure to regenerate the entire code snippet. \
         If you are not sure what is wrong, or think there is a mistake, \
         you can ask me a question rather than generating code"
    ))
}

impl<S: MessagesState> Agent<S> for CodeJudge {
    fn name(&self) -> &'static str {
        "try_running"
    }

    fn run(&mut self, mut state: S, ctx: &mut Ctx) -> StepResult<S> {
        let mut request = ctx.llm();
        if let Some(model) = &self.model {
            request = request.model(model.clone());
        }
        for tool in extraction_tools() {
            request = request.tool(tool);
        }

        let reply = match request
            .system(EXTRACTION_PROMPT)
            .messages(state.messages())
            .send_chat()
        {
            Ok(reply) => reply,
            Err(err) => return retry_on_transient(state, err),
        };

        let verdict = match extracted_code(&reply) {
            None => {
                ctx.log("code judge: no code to validate");
                Verdict::Approved
            }
            Some(code) => {
                ctx.log(format!("code judge: extracted {} chars", code.len()));
                pyright_feedback(&self.evaluator.evaluate(&code, ctx)?)
            }
        };

        info!(approved = verdict == Verdict::Approved, "code judge verdict");
        verdict.apply(&mut state);
        Ok((state, Outcome::Done))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::pyright::PYRIGHT_KEY;
    use crate::llm::ToolCall;

    fn reply_with(name: &str, arguments: serde_json::Value) -> ChatResponse {
        ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                name: name.to_string(),
                arguments,
            }],
        }
    }

    #[test]
    fn extracts_code_from_tool_call() {
        let reply = reply_with(EXTRACT_CODE, json!({"python_code": "print('hi')"}));
        assert_eq!(extracted_code(&reply).as_deref(), Some("print('hi')"));
    }

    #[test]
    fn no_code_or_no_call_means_nothing_to_check() {
        assert_eq!(extracted_code(&reply_with(NO_CODE, json!({"no_code": true}))), None);
        assert_eq!(extracted_code(&ChatResponse::default()), None);
    }

    #[test]
    fn fenced_plain_reply_is_treated_as_code() {
        let reply = ChatResponse {
            content: "```python\nx: int = \"one\"\n```".to_string(),
            tool_calls: vec![],
        };
        assert_eq!(extracted_code(&reply).as_deref(), Some("x: int = \"one\""));
    }

    #[test]
    fn prose_or_empty_fence_is_not_code() {
        let prose = ChatResponse {
            content: "Which Python version are you on?".to_string(),
            tool_calls: vec![],
        };
        assert_eq!(extracted_code(&prose), None);

        let empty = ChatResponse {
            content: "```\n```".to_string(),
            tool_calls: vec![],
        };
        assert_eq!(extracted_code(&empty), None);
    }

    #[test]
    fn clean_run_approves() {
        assert_eq!(pyright_feedback(&EvalResult::pass(PYRIGHT_KEY)), Verdict::Approved);
    }

    #[test]
    fn errors_are_quoted_back_to_the_generator() {
        let verdict = pyright_feedback(&EvalResult::fail(PYRIGHT_KEY, "line 2: \"x\" is not defined"));
        let Verdict::NeedsRevision(feedback) = verdict else {
            panic!("expected revision");
        };
        assert!(feedback.starts_with("I ran pyright and found this: line 2: \"x\" is not defined"));
        assert!(feedback.contains("regenerate the entire code snippet"));
    }

    #[test]
    fn unparseable_output_asks_for_general_review() {
        let result = EvalResult::fail(PYRIGHT_KEY, format!("{PARSE_FAILURE_PREFIX}: "));
        assert_eq!(
            pyright_feedback(&result),
            Verdict::NeedsRevision(UNPARSEABLE_FEEDBACK.to_string())
        );
    }

    #[test]
    fn missing_comment_reads_unknown_error() {
        let result = EvalResult {
            key: PYRIGHT_KEY.into(),
            score: false,
            comment: None,
        };
        let Verdict::NeedsRevision(feedback) = pyright_feedback(&result) else {
            panic!("expected revision");
        };
        assert!(feedback.contains("found this: Unknown error"));
    }
}
