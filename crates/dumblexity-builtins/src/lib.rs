//! Built-in tools exposed to the model.
//!
//! - `search_web` — external web search ([`WebSearchSkill`]).
//! - `extract_web_page` — raw page text ([`WebExtractSkill`]).
//! - `extract_video_transcript` — YouTube transcripts ([`VideoTranscriptSkill`]).
//!
//! Use [`register_builtins()`] to install them into a [`SkillRegistry`].

/// Tavily search/extract client.
pub mod tavily;
/// Video transcript skill and provider trait.
pub mod video_transcript;
/// Page extraction skill.
pub mod web_extract;
/// Web search skill.
pub mod web_search;
/// YouTube transcript provider.
pub mod youtube;

pub use tavily::{ExtractedPage, SearchRequest, SearchTopic, TavilyClient, TimeRange};
pub use video_transcript::{
    parse_video_id, TranscriptOutcome, TranscriptProvider, TranscriptText, VideoTranscript,
    VideoTranscriptSkill, INVALID_URL, TRANSCRIPT_NOT_AVAILABLE,
};
pub use web_extract::WebExtractSkill;
pub use web_search::WebSearchSkill;
pub use youtube::YouTubeTranscriptProvider;

use dumblexity_skills::SkillRegistry;
use std::sync::Arc;
use tracing::warn;

/// Settings for the built-in tools.
#[derive(Debug, Clone)]
pub struct BuiltinsConfig {
    /// Key for the search/extract API; the Tavily-backed tools are skipped without one.
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: Option<String>,
    /// Transcript language priority, most preferred first.
    pub transcript_languages: Vec<String>,
}

impl Default for BuiltinsConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            tavily_base_url: None,
            transcript_languages: vec!["ko".to_string(), "en".to_string()],
        }
    }
}

/// Register the built-in tools.
pub fn register_builtins(registry: &mut SkillRegistry, config: &BuiltinsConfig) {
    register_builtins_with_transcripts(
        registry,
        config,
        Arc::new(YouTubeTranscriptProvider::new()),
    );
}

/// Register the built-in tools with a custom transcript source.
pub fn register_builtins_with_transcripts(
    registry: &mut SkillRegistry,
    config: &BuiltinsConfig,
    transcripts: Arc<dyn TranscriptProvider>,
) {
    match config.tavily_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            let mut client = TavilyClient::new(key);
            if let Some(base_url) = &config.tavily_base_url {
                client = client.with_base_url(base_url);
            }
            let client = Arc::new(client);
            registry.register(Arc::new(WebSearchSkill::new(client.clone())));
            registry.register(Arc::new(WebExtractSkill::new(client)));
        }
        None => {
            warn!("No Tavily API key configured; search_web and extract_web_page are disabled");
        }
    }

    registry.register(Arc::new(VideoTranscriptSkill::new(
        transcripts,
        config.transcript_languages.clone(),
    )));
}
