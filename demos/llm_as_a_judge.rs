// General assistant reviewed by a second model.
//
// The judge grades the latest answer for accuracy, completeness, clarity,
// helpfulness and safety. A failing grade sends its critique back to the
// assistant as a new user message.
//
// Set JUDGE_MODEL to grade with a different model (default: o3-mini).
//
// Run: cargo run --example llm_as_a_judge

use reflect_line::agents::{CRITIQUE_PROMPT, ChatModel, ResponseJudge, single_step};
use reflect_line::evaluators::LlmAsJudge;
use reflect_line::{Conversation, Ctx, LlmConfig, Message, MessagesState, ReflectionGraph, Subgraph};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut ctx = Ctx::new().with_llm(LlmConfig::from_env()?);
    let judge_model = std::env::var("JUDGE_MODEL").unwrap_or_else(|_| "o3-mini".to_string());

    let assistant = single_step("assistant", ChatModel::new("call_model"))?;
    let judge = single_step(
        "judge",
        ResponseJudge::new(LlmAsJudge::new(CRITIQUE_PROMPT).model(judge_model)),
    )?;

    let mut app = ReflectionGraph::builder(assistant, judge)
        .with_tracing()
        .build()?;

    println!("Running example with reflection...");
    let query = Conversation::from(vec![Message::human(
        "Explain how nuclear fusion works and why it's important for clean energy",
    )]);
    let result = app.invoke(query, &mut ctx)?;

    match result.last_message() {
        Some(answer) => println!("=== Final answer ===\n{}", answer.content),
        None => println!("(no answer)"),
    }
    Ok(())
}
