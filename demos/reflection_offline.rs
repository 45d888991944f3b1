// Reflection loop with stub agents; no network needed.
//
// The writer drafts a sentence, the proofreader flags typos as user feedback,
// and the writer fixes them on the next pass.
//
// Run: cargo run --example reflection_offline

use reflect_line::{
    Agent, Conversation, Ctx, Message, MessagesState, Outcome, ReflectionGraph, Runner,
    StepResult, Verdict, Workflow,
};

const TYPOS: [(&str, &str); 2] = [("wrold", "world"), ("dcument", "document")];

struct Writer {
    revision: u32,
}

impl Agent<Conversation> for Writer {
    fn name(&self) -> &'static str {
        "writer"
    }
    fn run(&mut self, mut state: Conversation, ctx: &mut Ctx) -> StepResult<Conversation> {
        self.revision += 1;
        ctx.log(format!("writer: producing revision {}", self.revision));

        let mut text = "Hello wrold! This is a dcument.".to_string();
        // Apply every fix the proofreader has asked for so far.
        for feedback in state.messages().iter().skip(1).filter(|m| m.is_human()) {
            for (typo, fix) in TYPOS {
                if feedback.content.contains(typo) {
                    text = text.replace(typo, fix);
                }
            }
        }

        state.push_message(Message::ai(text));
        Ok((state, Outcome::Done))
    }
}

struct Proofreader;

impl Agent<Conversation> for Proofreader {
    fn name(&self) -> &'static str {
        "proofreader"
    }
    fn run(&mut self, mut state: Conversation, ctx: &mut Ctx) -> StepResult<Conversation> {
        let draft = state.last_message().map(|m| m.content.clone()).unwrap_or_default();

        // One typo per round, so the loop takes a few passes.
        let verdict = match TYPOS.iter().find(|(typo, _)| draft.contains(typo)) {
            Some((typo, fix)) => {
                ctx.log(format!("proofreader: '{typo}' should be '{fix}'"));
                Verdict::NeedsRevision(format!("typo: '{typo}' should be '{fix}'"))
            }
            None => {
                ctx.log("proofreader: all checks passed");
                Verdict::Approved
            }
        };

        verdict.apply(&mut state);
        Ok((state, Outcome::Done))
    }
}

fn main() {
    let writer = Runner::new(
        Workflow::builder("writer")
            .register(Writer { revision: 0 })
            .build()
            .unwrap(),
    );
    let proofreader = Runner::new(
        Workflow::builder("proofreader")
            .register(Proofreader)
            .build()
            .unwrap(),
    );

    let mut graph = ReflectionGraph::builder(writer, proofreader).build().unwrap();

    for budget in [5, 2] {
        println!("=== Budget {budget} ===");
        let mut ctx = Ctx::new();
        let start = Conversation::from(vec![Message::human("Write a greeting.")]);

        match graph.invoke_with_budget(start, budget, &mut ctx) {
            Ok(result) => {
                let last = result.state.last_message().map(|m| m.content.as_str());
                println!("  Last message: {last:?}");
                println!("  Steps left:   {}", result.remaining_steps);
            }
            Err(e) => println!("  Error: {e}"),
        }

        println!("  Log:");
        for entry in ctx.logs() {
            println!("    {entry}");
        }
        println!();
    }
}
