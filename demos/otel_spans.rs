// Export each step of a reflection loop as an OpenTelemetry span.
//
// The composed graph's on_step hook turns every generator and judge pass into
// a span printed by the stdout exporter.
//
// Run: cargo run --example otel_spans

use opentelemetry::KeyValue;
use opentelemetry::trace::{Span, Tracer, TracerProvider as _};
use opentelemetry_sdk::trace::SdkTracerProvider;
use reflect_line::{Conversation, Ctx, Message, MessagesState, ReflectionGraph, Verdict, from_fn};

fn main() {
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();
    let tracer = provider.tracer("reflect-line");

    let generator = from_fn("drafter", |mut state: Conversation, _ctx: &mut Ctx| {
        let n = state.messages().len() / 2 + 1;
        state.push_message(Message::ai(format!("draft {n}")));
        Ok(state)
    });
    let judge = from_fn("critic", |mut state: Conversation, _ctx: &mut Ctx| {
        if state.messages().len() < 6 {
            Verdict::NeedsRevision("tighten the wording".into()).apply(&mut state);
        }
        Ok(state)
    });

    let mut graph = ReflectionGraph::builder(generator, judge)
        .on_step(move |e| {
            let mut span = tracer.start(e.agent.to_string());
            span.set_attribute(KeyValue::new("workflow", e.workflow.to_string()));
            span.set_attribute(KeyValue::new("step", e.step_number as i64));
            span.set_attribute(KeyValue::new("retries", e.retries as i64));
            span.set_attribute(KeyValue::new("outcome", format!("{:?}", e.outcome)));
            span.set_attribute(KeyValue::new("duration_ms", e.duration.as_millis() as i64));
            span.end();
        })
        .build()
        .unwrap();

    let mut ctx = Ctx::new();
    let result = graph
        .invoke_with_budget(Conversation::from(vec![Message::human("Summarize the RFC")]), 5, &mut ctx)
        .unwrap();

    println!(
        "finished with {} messages, {} steps left",
        result.state.messages().len(),
        result.remaining_steps
    );

    if let Err(e) = provider.shutdown() {
        eprintln!("failed to shut down tracer provider: {e}");
    }
}
