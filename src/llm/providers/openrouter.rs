use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::errors::DroidClawResult;
use crate::llm::decision::parse_structured_decision;
use crate::llm::provider::{DecisionProvider, DecisionStream, ProviderCapabilities, ProviderSettings};
use crate::llm::providers::openai_compatible::{
    chat_completions_url, completion_text, openai_content, post_json, sse_content_stream,
};
use crate::llm::providers::split_system;
use crate::llm::schema::action_decision_schema;
use crate::llm::types::{ActionDecision, ChatMessage};

/// Marker yielded for every partial update while a structured reply streams.
pub const PROGRESS_MARKER: &str = ".";

/// Structured-output backend (OpenRouter). The reply is constrained by the
/// action JSON schema and validated against it; no free-text recovery.
pub struct OpenRouterProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    /// The system prompt is pulled out of the list and sent as one leading
    /// system entry; everything else is converted in order.
    pub fn build_body(&self, messages: &[ChatMessage], stream: bool) -> Value {
        let (system, rest) = split_system(messages);

        let mut wire: Vec<Value> = Vec::with_capacity(rest.len() + 1);
        if !system.is_empty() {
            wire.push(json!({ "role": "system", "content": system }));
        }
        wire.extend(rest.iter().map(|msg| {
            json!({
                "role": msg.role.as_str(),
                "content": openai_content(&msg.content, true),
            })
        }));

        json!({
            "model": self.settings.model,
            "messages": wire,
            "temperature": self.settings.temperature,
            "stream": stream,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "action_decision",
                    "strict": false,
                    "schema": action_decision_schema(),
                },
            },
        })
    }
}

#[async_trait]
impl DecisionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        &self.settings.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_images: true,
            supports_streaming: true,
        }
    }

    async fn get_decision(&self, messages: &[ChatMessage]) -> DroidClawResult<ActionDecision> {
        let body = self.build_body(messages, false);
        let url = chat_completions_url(&self.settings.api_base);
        let response = post_json(&self.client, &url, &self.settings, &body).await?;
        let json: Value = response.json().await?;

        let decision = parse_structured_decision(completion_text(&json));
        tracing::info!(provider = %self.settings.id, action = %decision.action, "structured decision received");
        Ok(decision)
    }

    /// Yields [`PROGRESS_MARKER`] per partial update, then the validated
    /// decision serialized as JSON.
    async fn get_decision_stream(&self, messages: &[ChatMessage]) -> DroidClawResult<DecisionStream> {
        let body = self.build_body(messages, true);
        let url = chat_completions_url(&self.settings.api_base);
        let response = post_json(&self.client, &url, &self.settings, &body).await?;
        let mut inner = sse_content_stream(response);

        Ok(Box::pin(async_stream::stream! {
            let mut text = String::new();
            while let Some(fragment) = inner.next().await {
                match fragment {
                    Ok(fragment) => {
                        text.push_str(&fragment);
                        yield Ok(PROGRESS_MARKER.to_string());
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            let decision = parse_structured_decision(&text);
            yield serde_json::to_string(&decision).map_err(Into::into);
        }))
    }
}
