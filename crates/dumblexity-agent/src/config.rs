use dumblexity_core::{CapabilitySet, DumblexityError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gemini API host used unless `api_base_url` overrides it.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Dumblexity, a research assistant. \
Use the search and extraction tools whenever a question depends on current events or \
facts you cannot verify from memory, and ground your answer in what they return. \
When a diagram, flowchart or timeline would help, write it as Mermaid code inside a \
```mermaid fenced block.";

/// Models selectable per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeminiModel {
    #[default]
    #[serde(rename = "gemini-2.5-flash")]
    Flash25,
    #[serde(rename = "gemini-2.5-pro")]
    Pro25,
    #[serde(rename = "gemini-2.5-flash-lite")]
    FlashLite25,
    #[serde(rename = "gemini-2.5-flash-preview-09-2025")]
    Flash25Preview,
    #[serde(rename = "gemini-2.5-flash-lite-preview-09-2025")]
    FlashLite25Preview,
    #[serde(rename = "gemini-2.0-flash")]
    Flash20,
}

impl GeminiModel {
    pub const ALL: [GeminiModel; 6] = [
        GeminiModel::Flash25,
        GeminiModel::Pro25,
        GeminiModel::FlashLite25,
        GeminiModel::Flash25Preview,
        GeminiModel::FlashLite25Preview,
        GeminiModel::Flash20,
    ];

    /// Model id as used in API paths.
    pub fn id(&self) -> &'static str {
        match self {
            GeminiModel::Flash25 => "gemini-2.5-flash",
            GeminiModel::Pro25 => "gemini-2.5-pro",
            GeminiModel::FlashLite25 => "gemini-2.5-flash-lite",
            GeminiModel::Flash25Preview => "gemini-2.5-flash-preview-09-2025",
            GeminiModel::FlashLite25Preview => "gemini-2.5-flash-lite-preview-09-2025",
            GeminiModel::Flash20 => "gemini-2.0-flash",
        }
    }

    /// Whether the model accepts a `thinkingConfig`.
    pub fn supports_thinking(&self) -> bool {
        !matches!(self, GeminiModel::Flash20)
    }
}

impl fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for GeminiModel {
    type Err = DumblexityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        GeminiModel::ALL
            .into_iter()
            .find(|m| m.id() == s)
            .ok_or_else(|| DumblexityError::Config(format!("Unknown model: {s}")))
    }
}

/// Backend settings, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub model: GeminiModel,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// `-1` lets the model choose its own budget.
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: i32,
    /// Follow-up requests allowed for answering tool calls within one turn.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    65536
}

fn default_thinking_budget() -> i32 {
    -1
}

fn default_max_tool_rounds() -> u32 {
    10
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: GeminiModel::default(),
            api_key: String::new(),
            api_base_url: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            thinking_budget: default_thinking_budget(),
            max_tool_rounds: default_max_tool_rounds(),
            system_prompt: None,
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(GEMINI_BASE_URL)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// A point used to bias maps grounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Per-turn settings. Immutable for the duration of a turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnConfig {
    pub model: GeminiModel,
    pub capabilities: CapabilitySet,
    pub location: Option<LatLng>,
}
