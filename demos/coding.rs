// Coding assistant with a type-checking judge.
//
// The assistant answers; the judge extracts the Python script from the answer
// and runs Pyright on it. Type errors go back to the assistant as a new user
// message until the code is clean or the step budget runs low.
//
// Needs `pyright` on PATH and either Azure OpenAI settings
// (AZURE_OPENAI_API_KEY, AZURE_OPENAI_ENDPOINT, optional
// AZURE_OPENAI_API_VERSION / AZURE_OPENAI_DEPLOYMENT) or OPENAI_API_KEY,
// in the environment or a .env file.
//
// Run: cargo run --example coding

use reflect_line::agents::{ChatModel, CodeJudge, single_step};
use reflect_line::{
    DEFAULT_REMAINING_STEPS, Conversation, Ctx, LlmConfig, Message, MessagesState, ReflectionGraph,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut ctx = Ctx::new().with_llm(LlmConfig::from_env()?);

    let assistant = single_step("assistant", ChatModel::new("call_model"))?;
    let judge = single_step("judge", CodeJudge::new())?;

    let mut app = ReflectionGraph::builder(assistant, judge)
        .with_tracing()
        .build()?;

    println!("Running example with reflection...");
    let query = Conversation::from(vec![Message::human("Write a LangGraph RAG app")]);
    let result = app.invoke_with_budget(query, DEFAULT_REMAINING_STEPS, &mut ctx)?;

    println!("=== Result ({} steps left) ===", result.remaining_steps);
    for message in result.state.messages() {
        println!("[{:?}]\n{}\n", message.role, message.content);
    }

    println!("=== Log ===");
    for entry in ctx.logs() {
        println!("  {entry}");
    }
    Ok(())
}
