use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{resolve_api_key, AppConfig, ProviderEntry, ProviderKind};
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::{DecisionProvider, DecisionStream, ProviderCapabilities, ProviderSettings};
use crate::llm::providers::bedrock::BedrockProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::providers::openrouter::OpenRouterProvider;
use crate::llm::types::{ActionDecision, ChatMessage};

const DEFAULT_BEDROCK_REGION: &str = "us-east-1";
/// Standard env var for Bedrock API keys, used when no DROIDCLAW_* key is set.
const BEDROCK_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Concrete backend variants. Dispatch is a plain `match`.
pub enum Provider {
    /// OpenAI-compatible chat completions (OpenAI, Groq, Ollama).
    Chat(OpenAiCompatibleProvider),
    /// Schema-constrained structured output (OpenRouter).
    Structured(OpenRouterProvider),
    /// Foundation-model invocation (Bedrock).
    Invoke(BedrockProvider),
}

#[async_trait]
impl DecisionProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Provider::Chat(p) => p.name(),
            Provider::Structured(p) => p.name(),
            Provider::Invoke(p) => p.name(),
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        match self {
            Provider::Chat(p) => p.capabilities(),
            Provider::Structured(p) => p.capabilities(),
            Provider::Invoke(p) => p.capabilities(),
        }
    }

    async fn get_decision(&self, messages: &[ChatMessage]) -> DroidClawResult<ActionDecision> {
        match self {
            Provider::Chat(p) => p.get_decision(messages).await,
            Provider::Structured(p) => p.get_decision(messages).await,
            Provider::Invoke(p) => p.get_decision(messages).await,
        }
    }

    async fn get_decision_stream(&self, messages: &[ChatMessage]) -> DroidClawResult<DecisionStream> {
        match self {
            Provider::Chat(p) => p.get_decision_stream(messages).await,
            Provider::Structured(p) => p.get_decision_stream(messages).await,
            Provider::Invoke(p) => p.get_decision_stream(messages).await,
        }
    }
}

/// Builds the backend for one `[llm.providers.<id>]` entry.
pub fn build_provider(id: &str, entry: &ProviderEntry) -> DroidClawResult<Provider> {
    let mut api_key = resolve_api_key(id, entry);
    if api_key.is_empty() && entry.kind == ProviderKind::Bedrock {
        api_key = std::env::var(BEDROCK_TOKEN_ENV).unwrap_or_default();
    }

    let api_base = match (&entry.api_base, entry.kind.default_api_base()) {
        (Some(base), _) => base.clone(),
        (None, Some(base)) => base.to_string(),
        (None, None) => {
            let region = entry.region.as_deref().unwrap_or(DEFAULT_BEDROCK_REGION);
            format!("https://bedrock-runtime.{region}.amazonaws.com")
        }
    };

    let model = if entry.model.is_empty() {
        entry.kind.default_model().to_string()
    } else {
        entry.model.clone()
    };

    if api_key.is_empty() && entry.kind != ProviderKind::Ollama {
        tracing::warn!(provider = id, "no API key configured; requests will be unauthenticated");
    }

    let settings = ProviderSettings {
        id: id.to_string(),
        api_base,
        api_key,
        model,
        temperature: entry.temperature,
    };

    Ok(match entry.kind {
        ProviderKind::Openai | ProviderKind::Groq | ProviderKind::Ollama => {
            Provider::Chat(OpenAiCompatibleProvider::new(settings, entry.kind))
        }
        ProviderKind::Openrouter => Provider::Structured(OpenRouterProvider::new(settings)),
        ProviderKind::Bedrock => Provider::Invoke(BedrockProvider::new(settings)),
    })
}

/// Registry of all available providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn DecisionProvider>>,
    active: String,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            active,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn DecisionProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> DroidClawResult<Arc<dyn DecisionProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| DroidClawError::Config(format!("Provider '{name}' not registered")))
    }

    pub fn get_active(&self) -> DroidClawResult<Arc<dyn DecisionProvider>> {
        self.providers
            .get(&self.active)
            .cloned()
            .ok_or_else(|| DroidClawError::Config(format!("Active provider '{}' not found in registry", self.active)))
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn set_active(&mut self, name: String) -> DroidClawResult<()> {
        if self.providers.contains_key(&name) {
            self.active = name;
            Ok(())
        } else {
            Err(DroidClawError::Config(format!("Provider '{name}' not registered")))
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `DROIDCLAW_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> DroidClawResult<Self> {
        let mut registry = Self::new(config.llm.active_provider.clone());
        for (id, entry) in &config.llm.providers {
            let provider = build_provider(id, entry)?;
            tracing::debug!(provider = %id, kind = ?entry.kind, "provider registered");
            registry.register(Arc::new(provider));
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::bedrock::ModelFamily;

    fn entry(kind: ProviderKind) -> ProviderEntry {
        ProviderEntry {
            kind,
            api_base: None,
            model: String::new(),
            temperature: 0.1,
            api_key: Some("from-config".into()),
            region: None,
        }
    }

    #[test]
    fn kinds_map_to_variants() {
        assert!(matches!(build_provider("a", &entry(ProviderKind::Openai)).unwrap(), Provider::Chat(_)));
        assert!(matches!(build_provider("b", &entry(ProviderKind::Groq)).unwrap(), Provider::Chat(_)));
        assert!(matches!(
            build_provider("c", &entry(ProviderKind::Openrouter)).unwrap(),
            Provider::Structured(_)
        ));
        assert!(matches!(build_provider("d", &entry(ProviderKind::Bedrock)).unwrap(), Provider::Invoke(_)));
    }

    #[test]
    fn empty_model_falls_back_to_kind_default() {
        let Provider::Invoke(p) = build_provider("br", &entry(ProviderKind::Bedrock)).unwrap() else {
            panic!("bedrock entry must build the invoke variant");
        };
        // default Bedrock model is a Llama model
        assert_eq!(p.family(), ModelFamily::Meta);
    }

    #[test]
    fn groq_variant_reports_no_images() {
        let p = build_provider("g", &entry(ProviderKind::Groq)).unwrap();
        assert!(!p.capabilities().supports_images);
        assert_eq!(p.name(), "g");
    }

    #[test]
    fn registry_from_default_config() {
        let registry = ProviderRegistry::from_config(&AppConfig::default()).unwrap();
        assert_eq!(registry.list_names(), vec!["openai".to_string()]);
        assert_eq!(registry.get_active().unwrap().name(), "openai");
    }

    #[test]
    fn set_active_requires_registered_name() {
        let mut registry = ProviderRegistry::from_config(&AppConfig::default()).unwrap();
        assert!(registry.set_active("missing".into()).is_err());
        assert_eq!(registry.active_name(), "openai");
        assert!(registry.set_active("openai".into()).is_ok());
    }
}
