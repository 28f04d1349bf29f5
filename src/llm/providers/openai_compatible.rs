use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::config::ProviderKind;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::decision::parse_decision;
use crate::llm::provider::{DecisionProvider, DecisionStream, ProviderCapabilities, ProviderSettings};
use crate::llm::sse_parser::{parse_sse_line, LineBuffer};
use crate::llm::types::{ActionDecision, ChatMessage, ContentPart, MessageContent, StreamChunkKind};

/// Stand-in text for image parts sent to text-only backends.
pub const IMAGE_PLACEHOLDER: &str = "[Screenshot attached]";

/// OpenAI chat-completions backend. Also serves Groq and Ollama, which speak
/// the same wire format; Groq has no vision support.
pub struct OpenAiCompatibleProvider {
    settings: ProviderSettings,
    kind: ProviderKind,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(settings: ProviderSettings, kind: ProviderKind) -> Self {
        Self {
            settings,
            kind,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        chat_completions_url(&self.settings.api_base)
    }

    /// Converts messages to the OpenAI shape; the system message stays inline.
    pub fn to_wire_messages(&self, messages: &[ChatMessage]) -> Vec<Value> {
        let images = self.capabilities().supports_images;
        messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "content": openai_content(&msg.content, images),
                })
            })
            .collect()
    }

    pub fn build_body(&self, messages: &[ChatMessage], stream: bool) -> Value {
        json!({
            "model": self.settings.model,
            "messages": self.to_wire_messages(messages),
            "response_format": { "type": "json_object" },
            "temperature": self.settings.temperature,
            "stream": stream,
        })
    }
}

#[async_trait]
impl DecisionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.settings.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_images: self.kind != ProviderKind::Groq,
            supports_streaming: true,
        }
    }

    async fn get_decision(&self, messages: &[ChatMessage]) -> DroidClawResult<ActionDecision> {
        let body = self.build_body(messages, false);
        let response = post_json(&self.client, &self.endpoint(), &self.settings, &body).await?;
        let json: Value = response.json().await?;
        let content = completion_text(&json);

        tracing::info!(
            provider = %self.settings.id,
            content_len = content.len(),
            "LLM JSON response received"
        );
        Ok(parse_decision(content))
    }

    async fn get_decision_stream(&self, messages: &[ChatMessage]) -> DroidClawResult<DecisionStream> {
        let body = self.build_body(messages, true);
        let response = post_json(&self.client, &self.endpoint(), &self.settings, &body).await?;
        Ok(sse_content_stream(response))
    }
}

pub(crate) fn chat_completions_url(api_base: &str) -> String {
    format!("{}/chat/completions", api_base.trim_end_matches('/'))
}

/// Text passes through; parts become OpenAI content parts. Images turn into
/// `data:` URLs, or a text placeholder when the backend cannot see.
pub(crate) fn openai_content(content: &MessageContent, images: bool) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({ "type": "text", "text": text }),
                ContentPart::Image { base64, mime_type } if images => json!({
                    "type": "image_url",
                    "image_url": {
                        "url": ContentPart::data_url(base64, mime_type),
                        "detail": "low",
                    },
                }),
                ContentPart::Image { .. } => json!({ "type": "text", "text": IMAGE_PLACEHOLDER }),
            })
            .collect(),
    }
}

/// `choices[0].message.content`, empty when absent.
pub(crate) fn completion_text(json: &Value) -> &str {
    json["choices"][0]["message"]["content"].as_str().unwrap_or("")
}

/// Clone of the request body with base64 image payloads replaced, for logging.
pub(crate) fn sanitized_for_log(body: &Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            // content can be string or array of parts; we only touch the array case.
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if let Some(url) = part.pointer_mut("/image_url/url") {
                    *url = Value::String("<omitted_base64_image>".to_string());
                }
                if let Some(data) = part.pointer_mut("/source/data") {
                    *data = Value::String("<omitted_base64_image>".to_string());
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    settings: &ProviderSettings,
    body: &Value,
) -> DroidClawResult<reqwest::Response> {
    tracing::debug!(
        provider = %settings.id,
        model = %settings.model,
        stream = body["stream"].as_bool().unwrap_or(false),
        "sending LLM request"
    );
    tracing::debug!(body = %sanitized_for_log(body), "request body (sanitized, base64 omitted)");

    let mut request = client.post(url).json(body);
    if !settings.api_key.is_empty() {
        request = request.bearer_auth(&settings.api_key);
    }
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let err_body = response.text().await.unwrap_or_default();
        return Err(DroidClawError::LlmProvider(format!("{}: {}", status, err_body)));
    }
    Ok(response)
}

/// Yields each non-empty `delta.content` of an OpenAI SSE response.
pub(crate) fn sse_content_stream(response: reqwest::Response) -> DecisionStream {
    Box::pin(async_stream::stream! {
        let mut byte_stream = response.bytes_stream();
        let mut lines = LineBuffer::new();
        let mut total = 0usize;
        let mut done = false;

        'stream: while let Some(bytes) = byte_stream.next().await {
            let bytes = match bytes {
                Ok(b) => b,
                Err(e) => {
                    yield Err(DroidClawError::from(e));
                    return;
                }
            };
            for line in lines.push(&bytes) {
                match content_of_line(&line) {
                    Ok(LineOutcome::Text(text)) => {
                        total += text.len();
                        yield Ok(text);
                    }
                    Ok(LineOutcome::Done) => {
                        done = true;
                        break 'stream;
                    }
                    Ok(LineOutcome::Skip) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
        if !done {
            if let Some(line) = lines.finish() {
                if let Ok(LineOutcome::Text(text)) = content_of_line(&line) {
                    total += text.len();
                    yield Ok(text);
                }
            }
        }

        tracing::info!(content_len = total, "LLM stream complete");
    })
}

enum LineOutcome {
    Text(String),
    Done,
    Skip,
}

fn content_of_line(line: &str) -> DroidClawResult<LineOutcome> {
    match parse_sse_line(line) {
        Ok(Some(chunk)) => Ok(match chunk.kind {
            StreamChunkKind::Content => LineOutcome::Text(chunk.content),
            StreamChunkKind::Done => LineOutcome::Done,
            StreamChunkKind::Reasoning => LineOutcome::Skip,
        }),
        Ok(None) => Ok(LineOutcome::Skip),
        Err(DroidClawError::SseParsing(e)) => {
            tracing::debug!("SSE parse skipped: {e}");
            Ok(LineOutcome::Skip)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(kind: ProviderKind) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            ProviderSettings {
                id: "test".into(),
                api_base: "https://api.example.com/v1/".into(),
                api_key: "k".into(),
                model: "m".into(),
                temperature: 0.1,
            },
            kind,
        )
    }

    fn screenshot_message() -> ChatMessage {
        ChatMessage::user_parts(vec![
            ContentPart::Text { text: "screen".into() },
            ContentPart::Image { base64: "QUJD".into(), mime_type: "image/png".into() },
        ])
    }

    #[test]
    fn system_message_stays_inline() {
        let p = provider(ProviderKind::Openai);
        let wire = p.to_wire_messages(&[ChatMessage::system("sys"), ChatMessage::user("hi")]);
        assert_eq!(wire[0], json!({"role": "system", "content": "sys"}));
        assert_eq!(wire[1], json!({"role": "user", "content": "hi"}));
        assert_eq!(p.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn images_become_data_urls() {
        let p = provider(ProviderKind::Openai);
        let wire = p.to_wire_messages(&[screenshot_message()]);
        assert_eq!(wire[0]["content"][0], json!({"type": "text", "text": "screen"}));
        assert_eq!(wire[0]["content"][1]["image_url"]["url"], json!("data:image/png;base64,QUJD"));
        assert_eq!(wire[0]["content"][1]["image_url"]["detail"], json!("low"));
    }

    #[test]
    fn text_only_backend_gets_placeholder() {
        let p = provider(ProviderKind::Groq);
        assert!(!p.capabilities().supports_images);
        let wire = p.to_wire_messages(&[screenshot_message()]);
        assert_eq!(wire[0]["content"][1], json!({"type": "text", "text": IMAGE_PLACEHOLDER}));
    }

    #[test]
    fn body_requests_json_object() {
        let body = provider(ProviderKind::Ollama).build_body(&[ChatMessage::user("x")], true);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "m");
    }

    #[test]
    fn log_body_hides_images() {
        let p = provider(ProviderKind::Openai);
        let logged = sanitized_for_log(&p.build_body(&[screenshot_message()], false));
        assert!(!logged.contains("QUJD"));
        assert!(logged.contains("<omitted_base64_image>"));
    }

    #[test]
    fn completion_text_extraction() {
        let json = json!({"choices": [{"message": {"content": "{\"action\":\"home\"}"}}]});
        assert_eq!(completion_text(&json), "{\"action\":\"home\"}");
        assert_eq!(completion_text(&json!({})), "");
    }
}
