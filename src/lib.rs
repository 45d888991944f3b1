//! Self-correcting agent loops: a generator answers, a judge reviews, and
//! the judge's critique goes back to the generator until the judge is happy
//! or the step budget runs low.
//!
//! Generators and judges are ordinary [`Subgraph`]s: a [`Runner`] over a
//! [`Workflow`] of [`Agent`]s, or just a function wrapped with [`from_fn`].
//! A judge approves by leaving the conversation alone and asks for another
//! pass by appending a human message (see [`Verdict`]).
//!
//! # Quick start
//!
//! ```rust
//! use reflect_line::{
//!     create_reflection_graph, from_fn, Conversation, Ctx, Message, MessagesState, Verdict,
//! };
//!
//! let generator = from_fn("assistant", |mut state: Conversation, _ctx: &mut Ctx| {
//!     let draft = state.messages().len();
//!     state.push_message(Message::ai(format!("draft {draft}")));
//!     Ok(state)
//! });
//!
//! let judge = from_fn("judge", |mut state: Conversation, _ctx: &mut Ctx| {
//!     if state.messages().len() < 4 {
//!         Verdict::NeedsRevision("add an example".into()).apply(&mut state);
//!     }
//!     Ok(state)
//! });
//!
//! let mut graph = create_reflection_graph(generator, judge).unwrap();
//! let mut ctx = Ctx::new();
//! let result = graph
//!     .invoke_with_budget(Conversation::from(vec![Message::human("explain fusion")]), 5, &mut ctx)
//!     .unwrap();
//!
//! assert_eq!(result.state.messages().len(), 4);
//! assert_eq!(result.remaining_steps, 3);
//! ```

mod agent;
pub mod agents;
pub mod config;
mod ctx;
pub mod evaluators;
mod graph;
pub mod llm;
mod message;
mod reflection;
mod runner;
pub mod schema;
pub mod tools;
mod workflow;

pub use agent::{Agent, Outcome, RetryHint, StepError, StepResult};
pub use config::{ConfigError, LlmConfig, Provider};
pub use ctx::Ctx;
pub use graph::{FnGraph, Subgraph, from_fn};
pub use message::{Conversation, Message, MessagesState, Role};
pub use reflection::{
    DEFAULT_REMAINING_STEPS, Decision, GENERATOR, JUDGE, ReflectionBuilder, ReflectionError,
    ReflectionGraph, Reflected, Verdict, create_reflection_graph, decide, end_or_reflect,
};
pub use runner::{ErrorEvent, Runner, StepEvent};
pub use schema::{Schema, SchemaError, StateSchema};
pub use workflow::{Route, Workflow, WorkflowBuilder, WorkflowError};
