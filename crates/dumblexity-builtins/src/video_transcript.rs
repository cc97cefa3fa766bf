use async_trait::async_trait;
use dumblexity_core::{Capability, DumblexityResult, ToolCall, ToolResult};
use dumblexity_skills::skill::{Skill, SkillDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Tool text returned when no video id can be read from the URL.
pub const INVALID_URL: &str = "Invalid URL";
/// Tool text returned when the video has no usable transcript.
pub const TRANSCRIPT_NOT_AVAILABLE: &str = "Transcript not available";

/// Transcript text plus the video metadata that accompanies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptText {
    pub title: String,
    pub description: String,
    pub content: String,
}

/// Source of video transcripts.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Looks up a transcript, preferring manually created tracks in
    /// `languages` order over auto-generated ones in the same order.
    /// `Ok(None)` means the video has no track in any of the languages.
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> DumblexityResult<Option<TranscriptText>>;
}

/// One entry of a successful `extract_video_transcript` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTranscript {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
}

/// What a transcript lookup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    Found(Vec<VideoTranscript>),
    InvalidUrl,
    Unavailable,
}

impl TranscriptOutcome {
    /// The text handed back to the model.
    pub fn into_tool_text(self) -> DumblexityResult<String> {
        match self {
            TranscriptOutcome::Found(transcripts) => Ok(serde_json::to_string(&transcripts)?),
            TranscriptOutcome::InvalidUrl => Ok(INVALID_URL.to_string()),
            TranscriptOutcome::Unavailable => Ok(TRANSCRIPT_NOT_AVAILABLE.to_string()),
        }
    }
}

/// Reads the 11-character video id out of watch, short, embed, shorts and
/// `/v/` style URLs. A missing scheme is tolerated.
pub fn parse_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    let parsed = reqwest::Url::parse(url)
        .or_else(|_| reqwest::Url::parse(&format!("https://{url}")))
        .ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(String::from),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed" | "shorts" | "v" | "live") => segments.next().map(String::from),
                _ => None,
            }
        }
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `extract_video_transcript`: transcript and metadata of a video.
pub struct VideoTranscriptSkill {
    descriptor: SkillDescriptor,
    provider: Arc<dyn TranscriptProvider>,
    languages: Vec<String>,
}

impl VideoTranscriptSkill {
    pub fn new(provider: Arc<dyn TranscriptProvider>, languages: Vec<String>) -> Self {
        Self {
            descriptor: SkillDescriptor {
                name: "extract_video_transcript".to_string(),
                description: "Extract the transcript, title and description of a YouTube video."
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "URL of the YouTube video"
                        }
                    },
                    "required": ["url"]
                }),
                required_capability: Capability::Extraction,
            },
            provider,
            languages,
        }
    }

    /// Runs the lookup and classifies the result.
    pub async fn lookup(&self, url: &str) -> TranscriptOutcome {
        let Some(video_id) = parse_video_id(url) else {
            return TranscriptOutcome::InvalidUrl;
        };

        info!(video_id = %video_id, "Fetching video transcript");

        match self.provider.fetch_transcript(&video_id, &self.languages).await {
            Ok(Some(text)) => TranscriptOutcome::Found(vec![VideoTranscript {
                url: url.trim().to_string(),
                title: text.title,
                description: text.description,
                content: text.content,
            }]),
            Ok(None) => TranscriptOutcome::Unavailable,
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "Transcript lookup failed");
                TranscriptOutcome::Unavailable
            }
        }
    }
}

#[async_trait]
impl Skill for VideoTranscriptSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> DumblexityResult<ToolResult> {
        let url = call.arguments["url"].as_str().unwrap_or_default();
        let outcome = self.lookup(url).await;
        Ok(ToolResult::success(&call.id, outcome.into_tool_text()?))
    }
}
