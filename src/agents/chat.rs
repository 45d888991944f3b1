use super::retry_on_transient;
use crate::message::{Message, MessagesState};
use crate::{Agent, Ctx, Outcome, StepResult};

/// Generator that sends the conversation to the model and appends the reply.
pub struct ChatModel {
    name: &'static str,
    model: Option<String>,
    system: Option<String>,
}

impl ChatModel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            model: None,
            system: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }
}

impl<S: MessagesState> Agent<S> for ChatModel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&mut self, mut state: S, ctx: &mut Ctx) -> StepResult<S> {
        let mut request = ctx.llm();
        if let Some(model) = &self.model {
            request = request.model(model.clone());
        }
        if let Some(system) = &self.system {
            request = request.system(system.clone());
        }

        let reply = match request.messages(state.messages()).send() {
            Ok(reply) => reply,
            Err(err) => return retry_on_transient(state, err),
        };

        ctx.log(format!("{}: answered ({} chars)", self.name, reply.len()));
        state.push_message(Message::ai(reply));
        Ok((state, Outcome::Done))
    }
}
