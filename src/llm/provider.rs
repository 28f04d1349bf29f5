use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::decision::parse_decision;
use crate::llm::types::{ActionDecision, ChatMessage};

/// Lazy, single-pass sequence of text fragments from a streaming call.
pub type DecisionStream = Pin<Box<dyn Stream<Item = DroidClawResult<String>> + Send>>;

/// Connection settings shared by every backend, resolved from config.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub id: String,
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub supports_images: bool,
    pub supports_streaming: bool,
}

/// Uniform "propose the next action" contract every backend implements.
///
/// Malformed model output never produces an `Err`; it resolves to a `wait`
/// decision. Transport and HTTP failures are returned as-is.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    async fn get_decision(&self, messages: &[ChatMessage]) -> DroidClawResult<ActionDecision>;

    /// Streams raw text fragments as the backend produces them. Concatenate
    /// them (see [`collect_decision`]) to rebuild the decision text.
    async fn get_decision_stream(&self, _messages: &[ChatMessage]) -> DroidClawResult<DecisionStream> {
        Err(DroidClawError::StreamingUnsupported(self.name().to_string()))
    }
}

/// Drains a decision stream and parses the accumulated text.
///
/// The structured backend emits `"."` progress markers before its final JSON
/// object; the markers are skipped.
pub async fn collect_decision(mut stream: DecisionStream) -> DroidClawResult<ActionDecision> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if fragment == "." && text.is_empty() {
            continue;
        }
        text.push_str(&fragment);
    }
    Ok(parse_decision(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn collects_fragments_into_decision() {
        let parts = vec![
            Ok("{\"action\":".to_string()),
            Ok("\"tap\",\"coordinates\":[1,2],".to_string()),
            Ok("\"reason\":\"x\"}".to_string()),
        ];
        let s: DecisionStream = Box::pin(stream::iter(parts));
        let d = collect_decision(s).await.unwrap();
        assert_eq!(d.action, "tap");
        assert_eq!(d.coordinates, Some([1.0, 2.0]));
    }

    #[tokio::test]
    async fn progress_markers_are_skipped() {
        let parts = vec![
            Ok(".".to_string()),
            Ok(".".to_string()),
            Ok("{\"action\":\"home\",\"reason\":\"x\"}".to_string()),
        ];
        let d = collect_decision(Box::pin(stream::iter(parts))).await.unwrap();
        assert_eq!(d.action, "home");
    }

    #[tokio::test]
    async fn stream_errors_propagate() {
        let parts = vec![Ok("{".to_string()), Err(DroidClawError::LlmProvider("boom".into()))];
        assert!(collect_decision(Box::pin(stream::iter(parts))).await.is_err());
    }
}
