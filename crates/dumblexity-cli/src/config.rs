use anyhow::Context;
use dumblexity_agent::{LatLng, ModelConfig};
use dumblexity_builtins::BuiltinsConfig;
use dumblexity_core::{Capability, CapabilitySet};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DumblexityConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub capabilities: CapabilityConfig,
    #[serde(default)]
    pub location: Option<LatLng>,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
}

impl Default for DumblexityConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            capabilities: CapabilityConfig::default(),
            location: None,
            tools: ToolsConfig::default(),
            sessions_dir: default_sessions_dir(),
        }
    }
}

/// Capabilities enabled when a chat starts.
#[derive(Debug, Deserialize)]
pub struct CapabilityConfig {
    #[serde(default = "enabled")]
    pub web_search: bool,
    #[serde(default)]
    pub map_search: bool,
    #[serde(default = "enabled")]
    pub external_web_search: bool,
    #[serde(default = "enabled")]
    pub extraction: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            web_search: true,
            map_search: false,
            external_web_search: true,
            extraction: true,
        }
    }
}

impl CapabilityConfig {
    pub fn to_set(&self) -> CapabilitySet {
        let mut set = CapabilitySet::new();
        set.set(Capability::WebSearch, self.web_search);
        set.set(Capability::MapSearch, self.map_search);
        set.set(Capability::ExternalWebSearch, self.external_web_search);
        set.set(Capability::Extraction, self.extraction);
        set
    }
}

#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub tavily_api_key: Option<String>,
    #[serde(default)]
    pub tavily_base_url: Option<String>,
    #[serde(default = "default_transcript_languages")]
    pub transcript_languages: Vec<String>,
    #[serde(default = "default_resolver_timeout_secs")]
    pub resolver_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            tavily_base_url: None,
            transcript_languages: default_transcript_languages(),
            resolver_timeout_secs: default_resolver_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    pub fn builtins(&self) -> BuiltinsConfig {
        BuiltinsConfig {
            tavily_api_key: self.tavily_api_key.clone(),
            tavily_base_url: self.tavily_base_url.clone(),
            transcript_languages: self.transcript_languages.clone(),
        }
    }
}

fn enabled() -> bool {
    true
}
fn default_sessions_dir() -> PathBuf {
    PathBuf::from("./sessions")
}
fn default_transcript_languages() -> Vec<String> {
    vec!["ko".to_string(), "en".to_string()]
}
fn default_resolver_timeout_secs() -> u64 {
    10
}

impl DumblexityConfig {
    /// Reads the config file; a missing file means all defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    /// Fills API keys left empty in the file from the environment.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.model.api_key.trim().is_empty() {
            if let Some(key) = var("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
                self.model.api_key = key;
            }
        }
        let tavily_missing = self
            .tools
            .tavily_api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty());
        if tavily_missing {
            self.tools.tavily_api_key = var("TAVILY_API_KEY").filter(|k| !k.is_empty());
        }
    }
}
