//! Evaluators score a piece of model output. Judges turn the score into a
//! [`crate::Verdict`].

pub mod llm_judge;
pub mod pyright;

pub use llm_judge::LlmAsJudge;
pub use pyright::PyrightEvaluator;

use crate::{Ctx, StepError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResult {
    /// What was measured, e.g. `pyright_succeeded` or `pass`.
    pub key: String,
    pub score: bool,
    pub comment: Option<String>,
}

impl EvalResult {
    pub fn pass(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            score: true,
            comment: None,
        }
    }

    pub fn fail(key: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            score: false,
            comment: Some(comment.into()),
        }
    }
}

pub trait Evaluator: Send + 'static {
    fn evaluate(&self, outputs: &str, ctx: &mut Ctx) -> Result<EvalResult, StepError>;
}
