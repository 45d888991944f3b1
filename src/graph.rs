use crate::{Ctx, Runner, StepError};

/// Anything that takes a state and runs it to completion: a [`Runner`], a
/// plain function, or a composed [`crate::ReflectionGraph`].
pub trait Subgraph<S>: Send + 'static {
    fn name(&self) -> &str;

    fn invoke(&mut self, state: S, ctx: &mut Ctx) -> Result<S, StepError>;
}

impl<S: Clone + 'static> Subgraph<S> for Runner<S> {
    fn name(&self) -> &str {
        Runner::name(self)
    }

    fn invoke(&mut self, state: S, ctx: &mut Ctx) -> Result<S, StepError> {
        self.run(state, ctx)
    }
}

/// A subgraph made from a single function.
pub struct FnGraph<F> {
    name: &'static str,
    f: F,
}

/// Wrap a function as a one-step subgraph.
pub fn from_fn<S, F>(name: &'static str, f: F) -> FnGraph<F>
where
    F: FnMut(S, &mut Ctx) -> Result<S, StepError> + Send + 'static,
{
    FnGraph { name, f }
}

impl<S, F> Subgraph<S> for FnGraph<F>
where
    F: FnMut(S, &mut Ctx) -> Result<S, StepError> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn invoke(&mut self, state: S, ctx: &mut Ctx) -> Result<S, StepError> {
        (self.f)(state, ctx)
    }
}
