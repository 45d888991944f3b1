use crate::ctx::Ctx;
use std::fmt;

/// The result of running a step: a new state plus what to do next.
pub type StepResult<S> = Result<(S, Outcome), StepError>;

/// A sync agent that transforms state one step at a time.
///
/// Register agents into a [`crate::Workflow`]; a generator or judge is
/// usually a one-node workflow wrapped in a [`crate::Runner`].
pub trait Agent<S>: Send + 'static {
    /// A unique name for this agent, used for routing with [`Outcome::Next`]
    /// and for branch targets.
    fn name(&self) -> &'static str;

    /// Run one step. Returns the updated state and an [`Outcome`] that tells
    /// the runner what to do next.
    fn run(&mut self, state: S, ctx: &mut Ctx) -> StepResult<S>;
}

/// Control flow for the runner.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Follow the node's branch if it has one, otherwise its `.then()` edge.
    Continue,
    /// Workflow complete, return the final state.
    Done,
    /// Jump to a specific agent by name.
    Next(&'static str),
    /// Re-run the current agent (counted against `max_retries`).
    Retry(RetryHint),
    /// Stop the workflow with an error.
    Fail(String),
}

/// Why an agent asked for [`Outcome::Retry`].
#[derive(Debug, Clone)]
pub struct RetryHint {
    pub reason: String,
}

impl RetryHint {
    /// Create a new hint with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Error type for agent steps, with variants designed around what the caller
/// can do about them.
#[derive(Debug)]
pub enum StepError {
    /// Bad input, bad configuration, or a malformed model reply. Don't retry.
    Invalid(String),
    /// Transient failure (network, rate limit, 5xx). Retrying might help.
    Transient(String),
    /// Agent decided to fail explicitly via Outcome::Fail.
    Failed(String),
    /// Everything else. Inspect the message for details.
    Other(String),
}

impl From<ureq::Error> for StepError {
    fn from(e: ureq::Error) -> Self {
        StepError::Transient(e.to_string())
    }
}

impl From<std::io::Error> for StepError {
    fn from(e: std::io::Error) -> Self {
        StepError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for StepError {
    fn from(e: serde_json::Error) -> Self {
        StepError::Invalid(format!("json: {e}"))
    }
}

impl StepError {
    /// Create an [`Invalid`](StepError::Invalid) error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        StepError::Invalid(msg.into())
    }

    /// Create an [`Other`](StepError::Other) error.
    pub fn other(msg: impl Into<String>) -> Self {
        StepError::Other(msg.into())
    }

    /// Create a [`Transient`](StepError::Transient) error.
    pub fn transient(msg: impl Into<String>) -> Self {
        StepError::Transient(msg.into())
    }

    /// Whether retrying the same step could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StepError::Transient(_))
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
            Self::Transient(msg) => write!(f, "transient: {msg}"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

impl std::error::Error for StepError {}
