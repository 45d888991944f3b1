use crate::workflow::Route;
use crate::{Ctx, Outcome, StepError, Workflow};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Passed to the `on_step` hook after each successful agent step.
pub struct StepEvent<'a> {
    pub workflow: &'a str,
    pub agent: &'a str,
    pub outcome: &'a Outcome,
    pub duration: Duration,
    pub step_number: usize,
    pub retries: usize,
}

/// Passed to the `on_error` hook when an agent errors or a limit is exceeded.
pub struct ErrorEvent<'a> {
    pub workflow: &'a str,
    pub agent: &'a str,
    pub error: &'a StepError,
    pub step_number: usize,
}

type StepHook = Box<dyn FnMut(&StepEvent) + Send>;
type ErrorHook = Box<dyn FnMut(&ErrorEvent) + Send>;

pub struct Runner<S: Clone + 'static> {
    wf: Workflow<S>,
    max_steps: usize,
    max_retries: usize,
    on_step: Option<StepHook>,
    on_error: Option<ErrorHook>,
}

impl<S: Clone + 'static> Runner<S> {
    pub fn new(wf: Workflow<S>) -> Self {
        Self {
            wf,
            max_steps: 10_000,
            max_retries: 3,
            on_step: None,
            on_error: None,
        }
    }

    /// Prevent accidental infinite loops.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub(crate) fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps;
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn on_step(mut self, cb: impl FnMut(&StepEvent) + Send + 'static) -> Self {
        self.on_step = Some(Box::new(cb));
        self
    }

    pub fn on_error(mut self, cb: impl FnMut(&ErrorEvent) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(cb));
        self
    }

    /// Log every step transition and error through `tracing`.
    pub fn with_tracing(self) -> Self {
        self.on_step(|e| {
            info!(
                workflow = e.workflow,
                step = e.step_number,
                agent = e.agent,
                outcome = ?e.outcome,
                elapsed_ms = e.duration.as_millis() as u64,
                "step finished"
            );
        })
        .on_error(|e| {
            warn!(
                workflow = e.workflow,
                step = e.step_number,
                agent = e.agent,
                error = %e.error,
                "step failed"
            );
        })
    }

    pub fn name(&self) -> &'static str {
        self.wf.name()
    }

    fn report(&mut self, agent: &str, error: &StepError, step_number: usize) {
        if let Some(cb) = &mut self.on_error {
            cb(&ErrorEvent {
                workflow: self.wf.name(),
                agent,
                error,
                step_number,
            });
        }
    }

    pub fn run(&mut self, mut state: S, ctx: &mut Ctx) -> Result<S, StepError> {
        let mut current = self.wf.start();
        let mut retries: usize = 0;
        let mut step_number: usize = 0;

        for _ in 0..self.max_steps {
            step_number += 1;
            debug!(workflow = self.wf.name(), step = step_number, agent = current, "running step");

            let agent = self
                .wf
                .agent_mut(current)
                .ok_or_else(|| StepError::other(format!("unknown step: {current}")))?;

            let start = Instant::now();
            let result = agent.run(state.clone(), ctx);
            let duration = start.elapsed();

            let (next_state, outcome) = match result {
                Ok(ok) => ok,
                Err(err) => {
                    self.report(current, &err, step_number);
                    return Err(err);
                }
            };

            if let Some(cb) = &mut self.on_step {
                cb(&StepEvent {
                    workflow: self.wf.name(),
                    agent: current,
                    outcome: &outcome,
                    duration,
                    step_number,
                    retries,
                });
            }

            state = next_state;

            match outcome {
                Outcome::Done => return Ok(state),
                Outcome::Fail(msg) => {
                    let err = StepError::Failed(msg);
                    self.report(current, &err, step_number);
                    return Err(err);
                }
                Outcome::Next(step) => {
                    current = step;
                    retries = 0;
                }
                Outcome::Continue => {
                    let next = if let Some(branch) = self.wf.branch(current) {
                        match branch.route(&state) {
                            Route::End => return Ok(state),
                            Route::To(step) if branch.allows(step) => step,
                            Route::To(step) => {
                                let err = StepError::other(format!(
                                    "branch from '{current}' picked undeclared step '{step}'"
                                ));
                                self.report(current, &err, step_number);
                                return Err(err);
                            }
                        }
                    } else if let Some(step) = self.wf.default_next(current) {
                        step
                    } else {
                        return Err(StepError::other(format!(
                            "step '{current}' returned Continue but no default next step is configured"
                        )));
                    };
                    current = next;
                    retries = 0;
                }
                Outcome::Retry(hint) => {
                    retries += 1;
                    if retries > self.max_retries {
                        let err = StepError::other(format!(
                            "step '{}' exceeded max retries ({}): {}",
                            current, self.max_retries, hint.reason
                        ));
                        self.report(current, &err, step_number);
                        return Err(err);
                    }
                    debug!(agent = current, retries, reason = %hint.reason, "retrying step");
                }
            }
        }

        let err = StepError::other(format!(
            "max_steps exceeded (possible infinite loop) in workflow {}",
            self.wf.name()
        ));
        self.report(current, &err, step_number);
        Err(err)
    }
}
