mod common;

use droidclaw::config::ProviderKind;
use droidclaw::llm::history::trim_messages;
use droidclaw::llm::provider::ProviderSettings;
use droidclaw::llm::providers::bedrock::{BedrockProvider, ModelFamily};
use droidclaw::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use droidclaw::llm::providers::openrouter::OpenRouterProvider;
use droidclaw::llm::types::{ChatMessage, MessageContent, Role};

use common::conversation;

fn settings(model: &str) -> ProviderSettings {
    ProviderSettings {
        id: "test".into(),
        api_base: "http://localhost:9".into(),
        api_key: String::new(),
        model: model.into(),
        temperature: 0.1,
    }
}

#[test]
fn long_history_is_trimmed_with_note() {
    let messages = conversation(15);
    let trimmed = trim_messages(&messages, 10);

    assert_eq!(trimmed.len(), 22);
    assert_eq!(trimmed[0].role, Role::System);
    assert_eq!(trimmed[1], ChatMessage::user("[5 earlier steps omitted]"));
    assert_eq!(trimmed[2], messages[11]);
    assert_eq!(trimmed.last(), messages.last());
}

#[test]
fn short_history_is_untouched() {
    let messages = conversation(4);
    assert_eq!(trim_messages(&messages, 10), messages);
}

#[test]
fn trimmed_history_feeds_every_backend_shape() {
    let messages = trim_messages(&conversation(12), 2);

    let chat = OpenAiCompatibleProvider::new(settings("gpt-4o"), ProviderKind::Openai);
    let body = chat.build_body(&messages, false);
    let wire = body["messages"].as_array().unwrap();
    assert_eq!(wire.len(), messages.len());
    assert_eq!(wire[0]["role"], "system");

    let structured = OpenRouterProvider::new(settings("openai/gpt-4o"));
    let body = structured.build_body(&messages, false);
    assert_eq!(body["messages"].as_array().unwrap().len(), messages.len());

    let invoke = BedrockProvider::new(settings("anthropic.claude-3-haiku-20240307-v1:0"));
    assert_eq!(invoke.family(), ModelFamily::Anthropic);
    let body = invoke.build_request(&messages);
    assert_eq!(body["system"], "You control an Android phone.");
    // system is carried separately
    assert_eq!(body["messages"].as_array().unwrap().len(), messages.len() - 1);
}

#[test]
fn flattened_backends_only_see_the_latest_user_turn() {
    let messages = conversation(3);
    let last_user = match &messages[messages.len() - 2].content {
        MessageContent::Text(t) => t.clone(),
        MessageContent::Parts(_) => unreachable!(),
    };

    let llama = BedrockProvider::new(settings("meta.llama3-70b-instruct-v1:0"));
    let prompt = llama.build_request(&messages)["prompt"].as_str().unwrap().to_string();
    assert!(prompt.contains(&last_user));
    assert!(!prompt.contains("step 0"));
}
