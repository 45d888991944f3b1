//! Ready-made generator and judge agents backed by [`crate::Ctx::llm`].

mod chat;
mod code_judge;
mod response_judge;

pub use chat::ChatModel;
pub use code_judge::{CodeJudge, extracted_code, pyright_feedback};
pub use response_judge::{CRITIQUE_PROMPT, ResponseJudge};

use crate::message::MessagesState;
use crate::{Agent, Outcome, RetryHint, Runner, StepError, StepResult, Workflow, WorkflowError};

/// Wrap one agent as a `START -> agent -> END` subgraph.
pub fn single_step<S, A>(name: &'static str, agent: A) -> Result<Runner<S>, WorkflowError>
where
    S: MessagesState,
    A: Agent<S>,
{
    Ok(Runner::new(Workflow::builder(name).register(agent).build()?))
}

/// Turn a transient model failure into a retry of the same step.
fn retry_on_transient<S>(state: S, err: StepError) -> StepResult<S> {
    if err.is_transient() {
        Ok((state, Outcome::Retry(RetryHint::new(err.to_string()))))
    } else {
        Err(err)
    }
}
