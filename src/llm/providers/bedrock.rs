use async_trait::async_trait;
use base64::Engine as _;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::decision::parse_decision;
use crate::llm::event_stream::{EventStreamDecoder, Frame};
use crate::llm::provider::{DecisionProvider, DecisionStream, ProviderCapabilities, ProviderSettings};
use crate::llm::providers::openai_compatible::post_json;
use crate::llm::providers::split_system;
use crate::llm::types::{ActionDecision, ChatMessage, ContentPart, MessageContent, Role};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;
const FLAT_MAX_TOKENS: u32 = 512;
const FLAT_TEMPERATURE: f64 = 0.1;

/// Matched case-sensitively against the model id.
const ANTHROPIC_MARKERS: &[&str] = &["anthropic"];
/// Matched against the lower-cased model id.
const META_MARKERS: &[&str] = &["meta", "llama"];

/// Model family behind a Bedrock model id; decides request and response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Multi-turn messages API with vision.
    Anthropic,
    /// Llama chat template, single flattened prompt.
    Meta,
    /// Titan-style `inputText` prompt.
    Generic,
}

impl ModelFamily {
    pub fn detect(model: &str) -> Self {
        if ANTHROPIC_MARKERS.iter().any(|m| model.contains(m)) {
            ModelFamily::Anthropic
        } else {
            let lower = model.to_lowercase();
            if META_MARKERS.iter().any(|m| lower.contains(m)) {
                ModelFamily::Meta
            } else {
                ModelFamily::Generic
            }
        }
    }
}

/// Foundation-model invocation backend (AWS Bedrock `InvokeModel`),
/// authenticated with a Bedrock API key.
pub struct BedrockProvider {
    settings: ProviderSettings,
    family: ModelFamily,
    client: reqwest::Client,
}

impl BedrockProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        let family = ModelFamily::detect(&settings.model);
        Self {
            settings,
            family,
            client: reqwest::Client::new(),
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    fn invoke_url(&self, streaming: bool) -> String {
        let op = if streaming {
            "invoke-with-response-stream"
        } else {
            "invoke"
        };
        format!(
            "{}/model/{}/{op}",
            self.settings.api_base.trim_end_matches('/'),
            encode_model_id(&self.settings.model)
        )
    }

    pub fn build_request(&self, messages: &[ChatMessage]) -> Value {
        match self.family {
            ModelFamily::Anthropic => anthropic_body(messages),
            ModelFamily::Meta => {
                let (system, last_user) = flatten_prompt(messages);
                json!({
                    "prompt": format!(
                        "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{system}<|eot_id|>\
                         <|start_header_id|>user<|end_header_id|>\n\n{last_user}\n\n\
                         Respond with ONLY a valid JSON object, no other text.<|eot_id|>\
                         <|start_header_id|>assistant<|end_header_id|>\n\n"
                    ),
                    "max_gen_len": FLAT_MAX_TOKENS,
                    "temperature": FLAT_TEMPERATURE,
                })
            }
            ModelFamily::Generic => {
                let (system, last_user) = flatten_prompt(messages);
                json!({
                    "inputText": format!("{system}\n\n{last_user}\n\nRespond with ONLY a valid JSON object."),
                    "textGenerationConfig": {
                        "maxTokenCount": FLAT_MAX_TOKENS,
                        "temperature": FLAT_TEMPERATURE,
                    },
                })
            }
        }
    }

    /// Generated text from a raw invoke response, empty when the expected
    /// field is missing.
    pub fn extract_text<'a>(&self, body: &'a Value) -> &'a str {
        let text = match self.family {
            ModelFamily::Anthropic => body["content"][0]["text"].as_str(),
            ModelFamily::Meta => body["generation"].as_str(),
            ModelFamily::Generic => body["results"][0]["outputText"].as_str(),
        };
        text.unwrap_or("")
    }
}

#[async_trait]
impl DecisionProvider for BedrockProvider {
    fn name(&self) -> &str {
        &self.settings.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_images: self.family == ModelFamily::Anthropic,
            supports_streaming: true,
        }
    }

    async fn get_decision(&self, messages: &[ChatMessage]) -> DroidClawResult<ActionDecision> {
        let body = self.build_request(messages);
        let response = post_json(&self.client, &self.invoke_url(false), &self.settings, &body).await?;
        let json: Value = response.json().await?;
        let text = self.extract_text(&json);

        tracing::info!(
            provider = %self.settings.id,
            family = ?self.family,
            content_len = text.len(),
            "Bedrock response received"
        );
        Ok(parse_decision(text))
    }

    /// Anthropic models stream `content_block_delta` text. Other families
    /// have no streaming shape here and yield one serialized decision.
    async fn get_decision_stream(&self, messages: &[ChatMessage]) -> DroidClawResult<DecisionStream> {
        if self.family != ModelFamily::Anthropic {
            let decision = self.get_decision(messages).await?;
            let text = serde_json::to_string(&decision)?;
            return Ok(Box::pin(futures_util::stream::once(async move { Ok(text) })));
        }

        let body = anthropic_body(messages);
        let response = post_json(&self.client, &self.invoke_url(true), &self.settings, &body).await?;

        Ok(Box::pin(async_stream::stream! {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = EventStreamDecoder::new();

            while let Some(bytes) = byte_stream.next().await {
                let frames = match bytes.map_err(DroidClawError::from).and_then(|b| decoder.push(&b)) {
                    Ok(frames) => frames,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                for frame in frames {
                    match delta_text(&frame) {
                        Ok(Some(text)) => yield Ok(text),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if decoder.has_pending() {
                tracing::debug!("Bedrock stream ended inside a frame");
            }
        }))
    }
}

/// Text of a `content_block_delta` chunk frame, if the frame carries one.
fn delta_text(frame: &Frame) -> DroidClawResult<Option<String>> {
    let payload: Value = serde_json::from_slice(&frame.payload)?;
    if frame.is_exception() {
        let message = payload["message"].as_str().unwrap_or("unknown stream exception");
        return Err(DroidClawError::LlmProvider(format!(
            "{}: {message}",
            frame.header(":exception-type").unwrap_or("exception")
        )));
    }

    let Some(encoded) = payload["bytes"].as_str() else {
        return Ok(None);
    };
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    let event: Value = serde_json::from_slice(&decoded)?;

    if event["type"] == "content_block_delta" {
        if let Some(text) = event["delta"]["text"].as_str() {
            return Ok(Some(text.to_string()));
        }
    }
    Ok(None)
}

fn anthropic_body(messages: &[ChatMessage]) -> Value {
    let (system, rest) = split_system(messages);
    let converted: Vec<Value> = rest
        .iter()
        .map(|msg| {
            json!({
                "role": msg.role.as_str(),
                "content": anthropic_content(&msg.content),
            })
        })
        .collect();

    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": ANTHROPIC_MAX_TOKENS,
        "system": system,
        "messages": converted,
    })
}

fn anthropic_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({ "type": "text", "text": text }),
                ContentPart::Image { base64, mime_type } => json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": mime_type,
                        "data": base64,
                    },
                }),
            })
            .collect(),
    }
}

/// System text plus the text of the most recent user message. Flattened
/// families see no history and no images.
fn flatten_prompt(messages: &[ChatMessage]) -> (String, String) {
    let (system, _) = split_system(messages);
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.text_only())
        .unwrap_or_default();
    (system, last_user)
}

/// Model ids carry `:` (versions) and `/` (ARNs) that must be escaped in the path.
fn encode_model_id(model: &str) -> String {
    model.replace('/', "%2F").replace(':', "%3A")
}
