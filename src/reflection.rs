//! Generator/judge reflection loops.
//!
//! ```text
//! START -> generator -> judge --(last message is human, budget >= 2)--> generator
//!                            \--(otherwise)--> END
//! ```
//!
//! The judge approves by leaving the conversation alone, or asks for another
//! pass by appending a human message with its critique. Each completed
//! generator -> judge traversal spends one unit of the step budget.

use crate::graph::Subgraph;
use crate::message::{Message, MessagesState};
use crate::runner::{ErrorEvent, StepEvent};
use crate::schema::{Schema, SchemaError, StateSchema};
use crate::workflow::{Route, WorkflowError};
use crate::{Agent, Ctx, Outcome, Runner, StepError, StepResult, Workflow};
use std::fmt;
use tracing::{debug, info};

/// Step budget used by [`Subgraph::invoke`] on a [`ReflectionGraph`].
pub const DEFAULT_REMAINING_STEPS: usize = 5;

/// Node name of the generator inside the composed workflow.
pub const GENERATOR: &str = "generator";
/// Node name of the judge inside the composed workflow.
pub const JUDGE: &str = "judge";

// ---------------------------------------------------------------------------
// Loop controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Route back to the generator.
    Continue,
    /// End the loop. Terminal.
    Stop,
}

/// Decide whether the loop goes round again.
///
/// Stops when fewer than two steps remain or there is no conversation.
/// Otherwise continues only when the last message is human, i.e. feedback
/// the generator has not answered yet.
pub fn decide(messages: &[Message], remaining_steps: usize) -> Decision {
    if remaining_steps < 2 {
        return Decision::Stop;
    }
    match messages.last() {
        Some(last) if last.is_human() => Decision::Continue,
        _ => Decision::Stop,
    }
}

/// [`decide`] applied to a running loop's state.
pub fn end_or_reflect<S: MessagesState>(state: &Reflected<S>) -> Decision {
    decide(state.state.messages(), state.remaining_steps)
}

// ---------------------------------------------------------------------------
// State and verdicts
// ---------------------------------------------------------------------------

/// A caller state plus the loop's step budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflected<S> {
    pub state: S,
    pub remaining_steps: usize,
}

impl<S> Reflected<S> {
    /// Wrap a state with a step budget.
    pub fn new(state: S, remaining_steps: usize) -> Self {
        Self {
            state,
            remaining_steps,
        }
    }

    /// Drop the budget and return the caller's state.
    pub fn into_inner(self) -> S {
        self.state
    }
}

/// What a judge concluded about the latest answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    NeedsRevision(String),
}

impl Verdict {
    /// Record the verdict the way the loop reads it: approval leaves the
    /// conversation untouched, a revision request becomes a human message.
    pub fn apply<S: MessagesState>(self, state: &mut S) {
        if let Verdict::NeedsRevision(feedback) = self {
            state.push_message(Message::human(feedback));
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

struct GeneratorNode<S> {
    inner: Box<dyn Subgraph<S>>,
}

impl<S: MessagesState> Agent<Reflected<S>> for GeneratorNode<S> {
    fn name(&self) -> &'static str {
        GENERATOR
    }

    fn run(&mut self, input: Reflected<S>, ctx: &mut Ctx) -> StepResult<Reflected<S>> {
        let Reflected {
            state,
            remaining_steps,
        } = input;
        debug!(subgraph = self.inner.name(), remaining_steps, "generator pass");
        let state = self.inner.invoke(state, ctx)?;
        Ok((Reflected::new(state, remaining_steps), Outcome::Continue))
    }
}

struct JudgeNode<S> {
    inner: Box<dyn Subgraph<S>>,
}

impl<S: MessagesState> Agent<Reflected<S>> for JudgeNode<S> {
    fn name(&self) -> &'static str {
        JUDGE
    }

    fn run(&mut self, input: Reflected<S>, ctx: &mut Ctx) -> StepResult<Reflected<S>> {
        let Reflected {
            state,
            remaining_steps,
        } = input;
        let before = state.messages().len();
        let state = self.inner.invoke(state, ctx)?;
        let feedback = state.messages().len() > before;

        let next = Reflected::new(state, remaining_steps.saturating_sub(1));
        let decision = end_or_reflect(&next);
        debug!(
            subgraph = self.inner.name(),
            feedback,
            remaining_steps = next.remaining_steps,
            ?decision,
            "judge pass"
        );
        ctx.log(format!(
            "judge: {} ({} steps left)",
            if feedback { "requested revision" } else { "approved" },
            next.remaining_steps
        ));
        Ok((next, Outcome::Continue))
    }
}

// ---------------------------------------------------------------------------
// ReflectionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectionError {
    Schema(SchemaError),
    Workflow(WorkflowError),
}

impl fmt::Display for ReflectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "invalid state schema: {e}"),
            Self::Workflow(e) => write!(f, "invalid reflection workflow: {e}"),
        }
    }
}

impl std::error::Error for ReflectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::Workflow(e) => Some(e),
        }
    }
}

impl From<SchemaError> for ReflectionError {
    fn from(e: SchemaError) -> Self {
        ReflectionError::Schema(e)
    }
}

impl From<WorkflowError> for ReflectionError {
    fn from(e: WorkflowError) -> Self {
        ReflectionError::Workflow(e)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

type StepHook = Box<dyn FnMut(&StepEvent) + Send>;
type ErrorHook = Box<dyn FnMut(&ErrorEvent) + Send>;

/// Configures a [`ReflectionGraph`]. Created with [`ReflectionGraph::builder`].
pub struct ReflectionBuilder<S> {
    generator: Box<dyn Subgraph<S>>,
    judge: Box<dyn Subgraph<S>>,
    state_schema: Option<Schema>,
    config_schema: Option<Schema>,
    default_budget: usize,
    max_steps: Option<usize>,
    tracing: bool,
    on_step: Option<StepHook>,
    on_error: Option<ErrorHook>,
}

impl<S: MessagesState + StateSchema> ReflectionBuilder<S> {
    /// Validate against this schema instead of the one `S` declares.
    pub fn state_schema(mut self, schema: Schema) -> Self {
        self.state_schema = Some(schema);
        self
    }

    /// Context keys that must be set on the [`Ctx`] passed to each run.
    pub fn config_schema(mut self, schema: Schema) -> Self {
        self.config_schema = Some(schema);
        self
    }

    /// Budget used when the graph is invoked through [`Subgraph::invoke`].
    pub fn default_budget(mut self, remaining_steps: usize) -> Self {
        self.default_budget = remaining_steps;
        self
    }

    /// Hard cap on runner steps per invocation, overriding the cap derived
    /// from the budget. Each generator -> judge traversal takes two steps.
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Log generator and judge transitions through `tracing`. Hooks set with
    /// `on_step`/`on_error` take the place of the logging ones.
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Called after every generator and judge step.
    pub fn on_step(mut self, cb: impl FnMut(&StepEvent) + Send + 'static) -> Self {
        self.on_step = Some(Box::new(cb));
        self
    }

    /// Called when the generator or judge fails.
    pub fn on_error(mut self, cb: impl FnMut(&ErrorEvent) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(cb));
        self
    }

    /// Validate the state schema and wire `generator -> judge -> (generator | END)`.
    pub fn build(self) -> Result<ReflectionGraph<S>, ReflectionError> {
        let schema = self.state_schema.unwrap_or_else(Schema::of::<S>);
        schema.validate_for_reflection()?;

        let wf = Workflow::builder("reflection")
            .register(GeneratorNode {
                inner: self.generator,
            })
            .register(JudgeNode { inner: self.judge })
            .start_at(GENERATOR)
            .then(JUDGE)
            .branch(JUDGE, &[GENERATOR], |state: &Reflected<S>| {
                match end_or_reflect(state) {
                    Decision::Continue => Route::To(GENERATOR),
                    Decision::Stop => Route::End,
                }
            })
            .build()?;

        let mut runner = Runner::new(wf);
        if self.tracing {
            runner = runner.with_tracing();
        }
        if let Some(cb) = self.on_step {
            runner = runner.on_step(cb);
        }
        if let Some(cb) = self.on_error {
            runner = runner.on_error(cb);
        }

        Ok(ReflectionGraph {
            runner,
            max_steps: self.max_steps,
            config_schema: self.config_schema,
            default_budget: self.default_budget,
        })
    }
}

// ---------------------------------------------------------------------------
// ReflectionGraph
// ---------------------------------------------------------------------------

/// A generator and a judge wired into a budgeted loop. Itself a
/// [`Subgraph`], so it can be nested wherever a generator or judge fits.
pub struct ReflectionGraph<S: MessagesState> {
    runner: Runner<Reflected<S>>,
    max_steps: Option<usize>,
    config_schema: Option<Schema>,
    default_budget: usize,
}

impl<S: MessagesState + StateSchema> ReflectionGraph<S> {
    /// Start composing `generator` and `judge`.
    pub fn builder(
        generator: impl Subgraph<S>,
        judge: impl Subgraph<S>,
    ) -> ReflectionBuilder<S> {
        ReflectionBuilder {
            generator: Box::new(generator),
            judge: Box::new(judge),
            state_schema: None,
            config_schema: None,
            default_budget: DEFAULT_REMAINING_STEPS,
            max_steps: None,
            tracing: false,
            on_step: None,
            on_error: None,
        }
    }
}

impl<S: MessagesState> ReflectionGraph<S> {
    /// Budget used by [`Subgraph::invoke`].
    pub fn default_budget(&self) -> usize {
        self.default_budget
    }

    /// Run the loop with an explicit step budget and return the final state
    /// together with what is left of the budget.
    pub fn invoke_with_budget(
        &mut self,
        state: S,
        remaining_steps: usize,
        ctx: &mut Ctx,
    ) -> Result<Reflected<S>, StepError> {
        if let Some(schema) = &self.config_schema
            && let Some(missing) = schema.fields().iter().find(|key| !ctx.contains(key))
        {
            return Err(StepError::invalid(format!("missing config key '{missing}'")));
        }

        let max_steps = self
            .max_steps
            .unwrap_or_else(|| runner_steps_for(remaining_steps));
        self.runner.set_max_steps(max_steps);

        info!(remaining_steps, messages = state.messages().len(), "reflection started");
        let result = self.runner.run(Reflected::new(state, remaining_steps), ctx)?;
        info!(
            remaining_steps = result.remaining_steps,
            messages = result.state.messages().len(),
            "reflection finished"
        );
        Ok(result)
    }
}

impl<S: MessagesState> Subgraph<S> for ReflectionGraph<S> {
    fn name(&self) -> &str {
        self.runner.name()
    }

    fn invoke(&mut self, state: S, ctx: &mut Ctx) -> Result<S, StepError> {
        let budget = self.default_budget;
        self.invoke_with_budget(state, budget, ctx)
            .map(Reflected::into_inner)
    }
}

/// Runner steps needed to spend `remaining_steps`: one generator and one
/// judge step per traversal, at least one traversal, plus slack for the
/// final routing.
fn runner_steps_for(remaining_steps: usize) -> usize {
    remaining_steps.max(1).saturating_mul(2).saturating_add(2)
}

/// Compose a generator and a judge with the defaults: the schema `S`
/// declares, no config schema, a budget of [`DEFAULT_REMAINING_STEPS`].
pub fn create_reflection_graph<S: MessagesState + StateSchema>(
    generator: impl Subgraph<S>,
    judge: impl Subgraph<S>,
) -> Result<ReflectionGraph<S>, ReflectionError> {
    ReflectionGraph::builder(generator, judge).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::from_fn;
    use crate::message::Conversation;
    use crate::schema::{MESSAGES, REMAINING_STEPS};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn convo(messages: Vec<Message>) -> Conversation {
        Conversation::new(messages)
    }

    /// Appends one AI answer per call and counts the calls.
    fn answering(calls: Arc<AtomicUsize>) -> impl Subgraph<Conversation> {
        from_fn("assistant", move |mut state: Conversation, _ctx: &mut Ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            state.push_message(Message::ai(format!("draft {n}")));
            Ok(state)
        })
    }

    fn approving() -> impl Subgraph<Conversation> {
        from_fn("approve", |state: Conversation, _ctx: &mut Ctx| Ok(state))
    }

    fn critiquing() -> impl Subgraph<Conversation> {
        from_fn("critique", |mut state: Conversation, _ctx: &mut Ctx| {
            Verdict::NeedsRevision("add type hints".into()).apply(&mut state);
            Ok(state)
        })
    }

    // --- loop controller ---

    #[test]
    fn low_budget_always_stops() {
        let samples = [
            vec![],
            vec![Message::human("q")],
            vec![Message::human("q"), Message::ai("a")],
        ];
        for budget in [0, 1] {
            for messages in &samples {
                assert_eq!(decide(messages, budget), Decision::Stop);
            }
        }
    }

    #[test]
    fn empty_conversation_stops() {
        for budget in [2, 5, 100] {
            assert_eq!(decide(&[], budget), Decision::Stop);
        }
    }

    #[test]
    fn trailing_human_message_continues() {
        let messages = [Message::human("q"), Message::ai("a"), Message::human("fix it")];
        for budget in [2, 3, 50] {
            assert_eq!(decide(&messages, budget), Decision::Continue);
        }
    }

    #[test]
    fn trailing_ai_message_stops() {
        let messages = [Message::human("q"), Message::ai("a")];
        for budget in [2, 3, 50] {
            assert_eq!(decide(&messages, budget), Decision::Stop);
        }
    }

    #[test]
    fn system_message_counts_as_not_human() {
        assert_eq!(decide(&[Message::system("rules")], 5), Decision::Stop);
    }

    // --- composition errors ---

    #[derive(Clone)]
    struct Shadowing(Conversation);

    impl MessagesState for Shadowing {
        fn messages(&self) -> &[Message] {
            self.0.messages()
        }
        fn push_message(&mut self, message: Message) {
            self.0.push_message(message)
        }
    }

    impl StateSchema for Shadowing {
        fn fields() -> &'static [&'static str] {
            &[MESSAGES, REMAINING_STEPS]
        }
    }

    #[test]
    fn state_declaring_budget_field_is_rejected() {
        let noop = |s: Shadowing, _ctx: &mut Ctx| -> Result<Shadowing, StepError> { Ok(s) };
        let err = create_reflection_graph::<Shadowing>(from_fn("g", noop), from_fn("j", noop))
            .err()
            .unwrap();
        assert_eq!(err, ReflectionError::Schema(SchemaError::ShadowedField(REMAINING_STEPS)));
    }

    #[test]
    fn schema_without_messages_is_rejected() {
        let err = ReflectionGraph::builder(answering(Arc::default()), approving())
            .state_schema(Schema::new(["notes"]))
            .build()
            .err()
            .unwrap();
        assert_eq!(err, ReflectionError::Schema(SchemaError::MissingField(MESSAGES)));
        assert!(err.to_string().contains("missing required key 'messages'"));
    }

    // --- end to end ---

    #[test]
    fn approving_judge_runs_one_generator_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = create_reflection_graph(answering(calls.clone()), approving()).unwrap();

        let result = graph
            .invoke_with_budget(convo(vec![Message::human("write fizzbuzz")]), 5, &mut Ctx::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.remaining_steps, 4);
        assert_eq!(result.state.messages().len(), 2);
        assert_eq!(result.state.last_message(), Some(&Message::ai("draft 1")));
    }

    #[test]
    fn critiquing_judge_loops_until_budget_runs_low() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = Arc::new(Mutex::new(Vec::new()));
        let steps_clone = Arc::clone(&steps);

        let mut graph = ReflectionGraph::builder(answering(calls.clone()), critiquing())
            .on_step(move |e| steps_clone.lock().unwrap().push(e.agent.to_string()))
            .build()
            .unwrap();

        let result = graph
            .invoke_with_budget(convo(vec![Message::human("write fizzbuzz")]), 5, &mut Ctx::new())
            .unwrap();

        // 5 -> 4 -> 3 -> 2 keep looping; the fourth judge pass leaves 1.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.remaining_steps, 1);
        assert_eq!(result.state.messages().len(), 1 + 4 * 2);
        assert!(result.state.last_message().unwrap().is_human());

        let steps = steps.lock().unwrap();
        assert_eq!(steps.len(), 8);
        assert!(steps.chunks(2).all(|pair| pair == [GENERATOR, JUDGE]));
    }

    #[test]
    fn budget_decrements_once_per_traversal() {
        for budget in 2..8 {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut graph = create_reflection_graph(answering(calls.clone()), critiquing()).unwrap();
            let result = graph
                .invoke_with_budget(convo(vec![Message::human("q")]), budget, &mut Ctx::new())
                .unwrap();

            let passes = calls.load(Ordering::SeqCst);
            assert_eq!(passes, budget - 1);
            assert_eq!(result.remaining_steps, budget - passes);
        }
    }

    #[test]
    fn large_budget_is_not_cut_short_by_the_runner() {
        // Only the latest answer is kept so each step's state clone stays small.
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let forgetful = from_fn("assistant", move |mut state: Conversation, _ctx: &mut Ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            state.messages.clear();
            state.push_message(Message::ai("draft"));
            Ok(state)
        });
        let mut graph = create_reflection_graph(forgetful, critiquing()).unwrap();

        let result = graph
            .invoke_with_budget(convo(vec![Message::human("q")]), 6000, &mut Ctx::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 5999);
        assert_eq!(result.remaining_steps, 1);
    }

    #[test]
    fn explicit_max_steps_still_caps_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = ReflectionGraph::builder(answering(calls.clone()), critiquing())
            .max_steps(4)
            .build()
            .unwrap();

        let err = graph
            .invoke_with_budget(convo(vec![Message::human("q")]), 5, &mut Ctx::new())
            .unwrap_err();

        assert!(err.to_string().contains("max_steps exceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn runner_cap_covers_every_traversal() {
        assert_eq!(runner_steps_for(0), 4);
        assert_eq!(runner_steps_for(5), 12);
        assert_eq!(runner_steps_for(usize::MAX), usize::MAX);
    }

    #[test]
    fn exhausted_budget_still_runs_the_first_pass() {
        for budget in [0, 1] {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut graph = create_reflection_graph(answering(calls.clone()), critiquing()).unwrap();
            let result = graph
                .invoke_with_budget(convo(vec![Message::human("q")]), budget, &mut Ctx::new())
                .unwrap();

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(result.remaining_steps, 0);
        }
    }

    #[test]
    fn judge_that_relents_stops_after_approval() {
        let rounds = Arc::new(AtomicUsize::new(0));
        let judge = from_fn("picky", move |mut state: Conversation, _ctx: &mut Ctx| {
            if rounds.fetch_add(1, Ordering::SeqCst) == 0 {
                Verdict::NeedsRevision("too short".into()).apply(&mut state);
            } else {
                Verdict::Approved.apply(&mut state);
            }
            Ok(state)
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = create_reflection_graph(answering(calls.clone()), judge).unwrap();
        let result = graph
            .invoke_with_budget(convo(vec![Message::human("q")]), 5, &mut Ctx::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.remaining_steps, 3);
        assert_eq!(result.state.last_message(), Some(&Message::ai("draft 2")));
    }

    #[test]
    fn subgraph_invoke_uses_default_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = ReflectionGraph::builder(answering(calls.clone()), critiquing())
            .default_budget(3)
            .build()
            .unwrap();

        let state = Subgraph::invoke(&mut graph, convo(vec![Message::human("q")]), &mut Ctx::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.messages().len(), 5);
        assert_eq!(graph.default_budget(), 3);
    }

    #[test]
    fn generator_errors_propagate() {
        let failing = from_fn("down", |_s: Conversation, _ctx: &mut Ctx| {
            Err(StepError::transient("model unavailable"))
        });
        let mut graph = create_reflection_graph(failing, approving()).unwrap();

        let err = graph
            .invoke_with_budget(convo(vec![Message::human("q")]), 5, &mut Ctx::new())
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn missing_config_key_is_rejected_before_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = ReflectionGraph::builder(answering(calls.clone()), approving())
            .config_schema(Schema::new(["thread_id"]))
            .build()
            .unwrap();

        let err = graph
            .invoke_with_budget(convo(vec![Message::human("q")]), 5, &mut Ctx::new())
            .unwrap_err();
        assert!(err.to_string().contains("missing config key 'thread_id'"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut ctx = Ctx::new();
        ctx.set("thread_id", "t-1");
        assert!(graph.invoke_with_budget(convo(vec![Message::human("q")]), 5, &mut ctx).is_ok());
    }

    #[test]
    fn judge_outcomes_are_logged_to_ctx() {
        let mut graph =
            create_reflection_graph(answering(Arc::default()), approving()).unwrap();
        let mut ctx = Ctx::new();
        graph
            .invoke_with_budget(convo(vec![Message::human("q")]), 5, &mut ctx)
            .unwrap();

        assert_eq!(ctx.logs(), ["judge: approved (4 steps left)"]);
    }
}
