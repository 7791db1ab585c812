mod support;

use std::sync::{Arc, Mutex};
use unillm::events::{EventContext, EventEmitter};
use unillm::prelude::*;

use support::*;

#[derive(Default)]
struct Collector {
    seen: Mutex<Vec<String>>,
}

impl Collector {
    fn push(&self, event: String) {
        self.seen.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl EventEmitter for Collector {
    fn init_success(&self, ctx: EventContext<'_>) {
        self.push(format!("init:{}/{}", ctx.provider, ctx.model_id));
    }

    fn init_error(&self, _ctx: EventContext<'_>, _error: &LlmError) {
        self.push("init_error".to_string());
    }

    fn tool_call_detected(&self, _ctx: EventContext<'_>, call: &ToolCall) {
        self.push(format!("tool:{}", call.name()));
    }

    fn generation_success(&self, _ctx: EventContext<'_>, response: &ContentResponse) {
        self.push(format!("ok:{}", response.tool_calls().len()));
    }

    fn generation_error(&self, _ctx: EventContext<'_>, error: &LlmError) {
        self.push(format!("error:{:?}", error.category()));
    }
}

#[tokio::test]
async fn lifecycle_events_follow_the_call() {
    let collector = Arc::new(Collector::default());
    let model = ScriptedModel::builder(PROVIDER, MODEL)
        .emitter(collector.clone())
        .turn(parallel_calls())
        .turn(vec![VendorEvent::error(Some(429), "rate limited")])
        .build()
        .unwrap();
    let ctx = RequestContext::background();
    let messages = [ChatMessage::human("Weather?")];

    model.generate(&ctx, &messages, &CallOptions::new()).await.unwrap();
    model.generate(&ctx, &messages, &CallOptions::new()).await.unwrap_err();

    let events = collector.events();
    assert_eq!(events[0], "init:openai/gpt-4o");
    assert_eq!(&events[1..3], ["tool:get_weather", "tool:get_weather"]);
    assert_eq!(events[3], "ok:2");
    assert!(events[4].starts_with("error:"));
    assert_eq!(events.len(), 5);
}

#[test]
fn failed_construction_is_reported() {
    let collector = Arc::new(Collector::default());
    let result = ScriptedModel::builder("", MODEL)
        .emitter(collector.clone())
        .build();
    assert!(result.is_err());
    assert_eq!(collector.events(), vec!["init_error".to_string()]);
}
