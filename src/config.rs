use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::ranking::RankingConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderEntry {
                kind: ProviderKind::Openai,
                api_base: None,
                model: ProviderKind::Openai.default_model().to_string(),
                temperature: default_temperature(),
                api_key: None,
                region: None,
            },
        );
        Self {
            llm: LlmConfig {
                active_provider: "openai".to_string(),
                providers,
            },
            agent: AgentConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
}

/// Backend family a provider entry talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Groq,
    Ollama,
    Openrouter,
    Bedrock,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Openai => "gpt-4o",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::Openrouter => "anthropic/claude-3.5-sonnet",
            ProviderKind::Bedrock => "us.meta.llama3-3-70b-instruct-v1:0",
        }
    }

    pub fn default_api_base(self) -> Option<&'static str> {
        match self {
            ProviderKind::Openai => Some("https://api.openai.com/v1"),
            ProviderKind::Groq => Some("https://api.groq.com/openai/v1"),
            ProviderKind::Ollama => Some("http://localhost:11434/v1"),
            ProviderKind::Openrouter => Some("https://openrouter.ai/api/v1"),
            // Bedrock endpoints are derived from the region.
            ProviderKind::Bedrock => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub kind: ProviderKind,
    /// Overrides the kind's default endpoint base.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Empty means the kind's default model.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var DROIDCLAW_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    /// AWS region for Bedrock.
    #[serde(default)]
    pub region: Option<String>,
}

fn default_temperature() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on compact elements placed into one prompt.
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    /// Conversation turns kept by the trimmer.
    #[serde(default = "default_max_history_steps")]
    pub max_history_steps: usize,
    #[serde(default = "default_true")]
    pub streaming_enabled: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_elements: default_max_elements(),
            max_history_steps: default_max_history_steps(),
            streaming_enabled: true,
        }
    }
}

fn default_max_elements() -> usize {
    40
}

fn default_max_history_steps() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn resolve_config_path() -> DroidClawResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("droidclaw").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(DroidClawError::Config(
        "config.toml not found next to executable, in working directory, or in user config dir"
            .into(),
    ))
}

pub fn load_config() -> DroidClawResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> DroidClawResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    if !config.llm.providers.contains_key(&config.llm.active_provider) {
        return Err(DroidClawError::Config(format!(
            "active provider '{}' has no [llm.providers.{}] entry",
            config.llm.active_provider, config.llm.active_provider
        )));
    }
    tracing::info!(path = %path.display(), provider = %config.llm.active_provider, "config loaded");
    Ok(config)
}

/// Resolve the API key for a provider id: environment first, then config file.
pub fn resolve_api_key(id: &str, entry: &ProviderEntry) -> String {
    std::env::var(format!("DROIDCLAW_{}_API_KEY", id.to_uppercase()))
        .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[llm]
active_provider = "groq"

[llm.providers.groq]
kind = "groq"
model = "llama-3.3-70b-versatile"
"#
        )
        .unwrap();

        let cfg = load_config_from(file.path()).unwrap();
        assert_eq!(cfg.llm.active_provider, "groq");
        let entry = &cfg.llm.providers["groq"];
        assert_eq!(entry.kind, ProviderKind::Groq);
        assert!((entry.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.agent.max_elements, 40);
        assert_eq!(cfg.agent.max_history_steps, 10);
        assert!(cfg.agent.streaming_enabled);
        assert_eq!(cfg.ranking.tolerance_px, 5);
    }

    #[test]
    fn rejects_unknown_active_provider() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[llm]
active_provider = "missing"

[llm.providers.openai]
kind = "openai"
model = "gpt-4o"
"#
        )
        .unwrap();

        let err = load_config_from(file.path()).unwrap_err();
        assert!(matches!(err, DroidClawError::Config(_)));
    }

    #[test]
    fn model_may_be_omitted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[llm]
active_provider = "bedrock"

[llm.providers.bedrock]
kind = "bedrock"
region = "eu-west-1"
"#
        )
        .unwrap();

        let cfg = load_config_from(file.path()).unwrap();
        let entry = &cfg.llm.providers["bedrock"];
        assert!(entry.model.is_empty());
        assert_eq!(entry.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn ranking_overrides_are_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[llm]
active_provider = "openai"

[llm.providers.openai]
kind = "openai"
model = "gpt-4o"

[ranking]
tolerance_px = 10
editable = 20
"#
        )
        .unwrap();

        let cfg = load_config_from(file.path()).unwrap();
        assert_eq!(cfg.ranking.tolerance_px, 10);
        assert_eq!(cfg.ranking.editable, 20);
        assert_eq!(cfg.ranking.enabled, 10);
    }
}
