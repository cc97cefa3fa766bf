use crate::video_transcript::{TranscriptProvider, TranscriptText};
use async_trait::async_trait;
use dumblexity_core::{DumblexityError, DumblexityResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

// The Android innertube client is served caption tracks without a signed-in
// web session.
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// Fetches transcripts through YouTube's player and timedtext endpoints.
pub struct YouTubeTranscriptProvider {
    http: reqwest::Client,
    base_url: String,
}

impl YouTubeTranscriptProvider {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: YOUTUBE_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn player(&self, video_id: &str) -> DumblexityResult<PlayerResponse> {
        let url = format!("{}/youtubei/v1/player", self.base_url);
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                    "hl": "en",
                }
            },
            "videoId": video_id,
        });

        let resp = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| DumblexityError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DumblexityError::Http(format!(
                "YouTube player request failed with {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| DumblexityError::Http(e.to_string()))
    }

    async fn timed_text(&self, track: &CaptionTrack) -> DumblexityResult<String> {
        let mut url = reqwest::Url::parse(&track.base_url)
            .map_err(|e| DumblexityError::Http(format!("Bad caption track URL: {e}")))?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "fmt")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("fmt", "json3");

        let resp = self
            .http
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| DumblexityError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DumblexityError::Http(format!(
                "YouTube timedtext request failed with {status}"
            )));
        }

        let timed: TimedText = resp
            .json()
            .await
            .map_err(|e| DumblexityError::Http(e.to_string()))?;
        Ok(timed.into_text())
    }
}

impl Default for YouTubeTranscriptProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptProvider for YouTubeTranscriptProvider {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> DumblexityResult<Option<TranscriptText>> {
        let player = self.player(video_id).await?;
        let tracks = player
            .captions
            .and_then(|c| c.renderer)
            .map(|r| r.caption_tracks)
            .unwrap_or_default();

        let Some(track) = select_track(&tracks, languages) else {
            debug!(video_id = %video_id, tracks = tracks.len(), "No caption track matches");
            return Ok(None);
        };
        debug!(
            video_id = %video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "Selected caption track"
        );

        let content = self.timed_text(track).await?;
        let details = player.video_details.unwrap_or_default();
        Ok(Some(TranscriptText {
            title: details.title,
            description: details.short_description,
            content,
        }))
    }
}

/// Manual tracks in language priority order, then generated ones likewise.
fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    let find = |generated: bool| {
        languages.iter().find_map(|lang| {
            tracks
                .iter()
                .find(|t| t.is_generated() == generated && &t.language_code == lang)
        })
    };
    find(false).or_else(|| find(true))
}

// -- YouTube wire types --

#[derive(Deserialize)]
struct PlayerResponse {
    #[serde(rename = "videoDetails")]
    video_details: Option<VideoDetails>,
    captions: Option<Captions>,
}

#[derive(Deserialize, Default)]
struct VideoDetails {
    #[serde(default)]
    title: String,
    #[serde(rename = "shortDescription", default)]
    short_description: String,
}

#[derive(Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    renderer: Option<TrackList>,
}

#[derive(Deserialize)]
struct TrackList {
    #[serde(rename = "captionTracks", default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Deserialize)]
struct TimedEvent {
    #[serde(default)]
    segs: Vec<TimedSegment>,
}

#[derive(Deserialize)]
struct TimedSegment {
    #[serde(default)]
    utf8: String,
}

impl TimedText {
    fn into_text(self) -> String {
        self.events
            .into_iter()
            .map(|e| e.segs.into_iter().map(|s| s.utf8).collect::<String>())
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
