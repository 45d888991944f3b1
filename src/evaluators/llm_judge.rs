use super::{EvalResult, Evaluator};
use crate::tools::extract_json;
use crate::{Ctx, StepError};
use tracing::debug;

/// Grades output with a second model call.
///
/// The prompt is a template: `{outputs}` is replaced with the text under
/// review and `{inputs}` with the optional input that produced it. The model
/// is asked for `{"reasoning": ..., "<feedback_key>": true|false}`; the
/// boolean becomes the score and the reasoning the comment.
pub struct LlmAsJudge {
    prompt: String,
    feedback_key: String,
    model: Option<String>,
    inputs: Option<String>,
}

impl LlmAsJudge {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            feedback_key: "pass".to_string(),
            model: None,
            inputs: None,
        }
    }

    pub fn feedback_key(mut self, key: impl Into<String>) -> Self {
        self.feedback_key = key.into();
        self
    }

    /// Grade with a different model than the one the context is configured with.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn inputs(mut self, inputs: impl Into<String>) -> Self {
        self.inputs = Some(inputs.into());
        self
    }

    fn render(&self, outputs: &str) -> String {
        self.prompt
            .replace("{outputs}", outputs)
            .replace("{inputs}", self.inputs.as_deref().unwrap_or(""))
    }

    fn response_format(&self) -> String {
        format!(
            "Respond with only a JSON object of the form \
             {{\"reasoning\": \"<your critique>\", \"{}\": true or false}}.",
            self.feedback_key
        )
    }

    fn parse(&self, reply: &str) -> Result<EvalResult, StepError> {
        let value = extract_json(reply)
            .ok_or_else(|| StepError::invalid(format!("judge reply was not JSON: {reply}")))?;
        let score = value
            .get(&self.feedback_key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| {
                StepError::invalid(format!("judge reply has no boolean '{}'", self.feedback_key))
            })?;
        let comment = value
            .get("reasoning")
            .or_else(|| value.get("comment"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(EvalResult {
            key: self.feedback_key.clone(),
            score,
            comment,
        })
    }
}

impl Evaluator for LlmAsJudge {
    fn evaluate(&self, outputs: &str, ctx: &mut Ctx) -> Result<EvalResult, StepError> {
        let mut request = ctx.llm();
        if let Some(model) = &self.model {
            request = request.model(model.clone());
        }
        let reply = request
            .system(self.render(outputs))
            .user(self.response_format())
            .send()?;

        let result = self.parse(&reply)?;
        debug!(key = %result.key, score = result.score, "llm judge");
        Ok(result)
    }
}
