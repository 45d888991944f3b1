use super::retry_on_transient;
use crate::evaluators::{EvalResult, Evaluator, LlmAsJudge};
use crate::message::MessagesState;
use crate::reflection::Verdict;
use crate::{Agent, Ctx, Outcome, StepResult};
use tracing::info;

pub const CRITIQUE_PROMPT: &str = "\
You are an expert judge evaluating AI responses. Critique the assistant's latest \
response below.

Evaluate it against these criteria:
1. Accuracy - Is the information correct and factual?
2. Completeness - Does it fully address the user's query?
3. Clarity - Is the explanation clear and well-structured?
4. Helpfulness - Does it provide actionable and useful information?
5. Safety - Does it avoid harmful or inappropriate content?

Only if the response meets ALL criteria, set pass to true.

If you find ANY issue, set pass to false and put specific, constructive feedback \
in your reasoning so the assistant knows exactly how to improve.

<response>
{outputs}
</response>";

const FALLBACK_FEEDBACK: &str = "The response did not meet the review criteria. Please improve it.";

/// Judge for general assistants: grades the latest message with
/// [`LlmAsJudge`] and feeds the critique back on failure.
pub struct ResponseJudge {
    judge: LlmAsJudge,
}

impl Default for ResponseJudge {
    fn default() -> Self {
        Self::new(LlmAsJudge::new(CRITIQUE_PROMPT))
    }
}

impl ResponseJudge {
    pub fn new(judge: LlmAsJudge) -> Self {
        Self { judge }
    }
}

fn verdict_for(result: EvalResult) -> Verdict {
    if result.score {
        Verdict::Approved
    } else {
        Verdict::NeedsRevision(
            result
                .comment
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_FEEDBACK.to_string()),
        )
    }
}

impl<S: MessagesState> Agent<S> for ResponseJudge {
    fn name(&self) -> &'static str {
        "judge_response"
    }

    fn run(&mut self, mut state: S, ctx: &mut Ctx) -> StepResult<S> {
        let Some(latest) = state.last_message().map(|m| m.content.clone()) else {
            return Ok((state, Outcome::Done));
        };

        let result = match self.judge.evaluate(&latest, ctx) {
            Ok(result) => result,
            Err(err) => return retry_on_transient(state, err),
        };

        let verdict = verdict_for(result);
        if verdict == Verdict::Approved {
            info!("response approved by judge");
            ctx.log("response judge: approved");
        } else {
            info!("judge requested improvements");
            ctx.log("response judge: requested improvements");
        }
        verdict.apply(&mut state);
        Ok((state, Outcome::Done))
    }
}
