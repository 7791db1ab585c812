//! Tool-call round trips through the scripted adapter

mod support;

use unillm::prelude::*;
use unillm::roundtrip::{
    RequiredArguments, append_round_trip, assistant_message, check_required_arguments,
    validate_history,
};

use support::*;

#[tokio::test]
async fn read_file_round_trip_keeps_ids_and_signature() {
    let model = scripted(vec![read_file_call(), final_answer("go.mod declares module example.com/app.")]);
    let ctx = RequestContext::background();
    let options = CallOptions::new().tools(vec![read_file_tool()]);
    let mut history = vec![
        ChatMessage::system("You can read files."),
        ChatMessage::human("What module does go.mod declare?"),
    ];

    let first = model.generate(&ctx, &history, &options).await.unwrap();
    let choice = first.first().unwrap();
    let call = &choice.tool_calls[0];
    assert_eq!(call.name(), "read_file");
    assert_eq!(call.thought_signature.as_deref(), Some("sig-abc123"));
    assert_eq!(
        check_required_arguments(MODEL, &read_file_tool(), call).unwrap(),
        RequiredArguments::Satisfied
    );

    append_round_trip(
        &mut history,
        assistant_message(choice),
        vec![ContentPart::tool_response(
            call.id.clone(),
            "read_file",
            "module example.com/app\n\ngo 1.22\n",
        )],
    )
    .unwrap();

    // The assistant turn is resent verbatim, signature included.
    let resent: Vec<&ToolCall> = history[2].tool_calls().collect();
    assert_eq!(resent, vec![call]);
    assert_eq!(history[3].role, MessageRole::Tool);
    validate_history(&history).unwrap();

    let second = model.generate(&ctx, &history, &options).await.unwrap();
    assert_eq!(second.content(), "go.mod declares module example.com/app.");
    assert_eq!(model.live_calls(), 2);
}

#[tokio::test]
async fn parallel_results_travel_in_one_message_in_call_order() {
    let model = scripted(vec![parallel_calls(), final_answer("Paris 18C, Tokyo 24C.")]);
    let ctx = RequestContext::background();
    let options = CallOptions::new().tools(vec![weather_tool()]);
    let mut history = vec![ChatMessage::human("Weather in Paris and Tokyo?")];

    let first = model.generate(&ctx, &history, &options).await.unwrap();
    let choice = first.first().unwrap();
    let (paris, tokyo) = (&choice.tool_calls[0], &choice.tool_calls[1]);

    // Results arrive out of order; they are stored in call order.
    append_round_trip(
        &mut history,
        assistant_message(choice),
        vec![
            ContentPart::tool_response(tokyo.id.clone(), "get_weather", "24C"),
            ContentPart::tool_response(paris.id.clone(), "get_weather", "18C"),
        ],
    )
    .unwrap();

    assert_eq!(history.len(), 3);
    let answered: Vec<&str> = history[2].tool_responses().map(|(id, _)| id).collect();
    assert_eq!(answered, vec![paris.id.as_str(), tokyo.id.as_str()]);

    let second = model.generate(&ctx, &history, &options).await.unwrap();
    assert_eq!(second.content(), "Paris 18C, Tokyo 24C.");
}

#[tokio::test]
async fn orphan_tool_result_is_rejected_before_the_vendor_call() {
    let model = scripted(vec![greeting()]);
    let history = vec![
        ChatMessage::human("Hi"),
        ChatMessage::tool(vec![ContentPart::tool_response("call_missing", "read_file", "{}")]),
    ];
    let err = model
        .generate(&RequestContext::background(), &history, &CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::InvalidHistory(_)));
    assert_eq!(model.live_calls(), 0);
}

#[tokio::test]
async fn malformed_arguments_become_an_empty_object() {
    let model = scripted(vec![vec![
        VendorEvent::tool_call(ToolCallDelta::at(0).id("call_1").name("get_weather")),
        VendorEvent::tool_call(ToolCallDelta::at(0).arguments("{\"city\": ")),
        VendorEvent::ToolCallDone { index: 0 },
    ]]);
    let response = model
        .generate(
            &RequestContext::background(),
            &[ChatMessage::human("Weather?")],
            &CallOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.tool_calls()[0].arguments(), "{}");
}

#[test]
fn strict_and_relaxed_models_treat_missing_arguments_differently() {
    let call = ToolCall::new("call_1", "get_weather", "{}");

    let err = check_required_arguments("gpt-4o", &weather_tool(), &call).unwrap_err();
    assert!(matches!(
        err,
        LlmError::MissingRequiredArguments { ref missing, .. } if missing == &vec!["city".to_string()]
    ));

    let flagged =
        check_required_arguments("anthropic.claude-3-5-sonnet", &weather_tool(), &call).unwrap();
    match flagged {
        RequiredArguments::Flagged(omission) => assert_eq!(omission.missing(), ["city"]),
        other => panic!("expected a flagged omission, got {other:?}"),
    }
}
