use async_trait::async_trait;
use dumblexity_core::{DumblexityError, DumblexityResult, Transcript};
use std::path::PathBuf;
use tracing::info;

/// Persistence for named transcripts.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Names of all saved sessions, sorted.
    async fn list(&self) -> DumblexityResult<Vec<String>>;
    /// Saves under the sanitized form of `name` and returns that form.
    async fn save(&self, name: &str, transcript: &Transcript) -> DumblexityResult<String>;
    async fn load(&self, name: &str) -> DumblexityResult<Transcript>;
    async fn delete(&self, name: &str) -> DumblexityResult<()>;
}

/// Keeps alphanumerics, spaces, hyphens and underscores, then trims.
pub fn sanitize_session_name(name: &str) -> DumblexityResult<String> {
    let safe: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe = safe.trim();
    if safe.is_empty() {
        return Err(DumblexityError::InvalidSessionName(name.to_string()));
    }
    Ok(safe.to_string())
}

/// File-based transcript store: one pretty-printed JSON file per session.
pub struct FileTranscriptStore {
    dir: PathBuf,
}

impl FileTranscriptStore {
    pub async fn new(dir: PathBuf) -> DumblexityResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn session_path(&self, safe_name: &str) -> PathBuf {
        self.dir.join(format!("{safe_name}.json"))
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn list(&self) -> DumblexityResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(".json") {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn save(&self, name: &str, transcript: &Transcript) -> DumblexityResult<String> {
        let safe_name = sanitize_session_name(name)?;
        let path = self.session_path(&safe_name);
        let json = serde_json::to_string_pretty(transcript)?;

        // Write-then-rename so a failed save never truncates an existing file.
        let tmp = self.dir.join(format!(".{safe_name}.json.tmp"));
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            DumblexityError::Session(format!("Failed to save session '{safe_name}': {e}"))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            DumblexityError::Session(format!("Failed to save session '{safe_name}': {e}"))
        })?;

        info!(session = %safe_name, turns = transcript.len(), "Session saved");
        Ok(safe_name)
    }

    async fn load(&self, name: &str) -> DumblexityResult<Transcript> {
        let safe_name = sanitize_session_name(name)?;
        let path = self.session_path(&safe_name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(DumblexityError::SessionNotFound(safe_name));
        }
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            DumblexityError::Session(format!("Failed to read session '{safe_name}': {e}"))
        })?;
        let transcript: Transcript = serde_json::from_str(&data).map_err(|e| {
            DumblexityError::Session(format!("Failed to parse session '{safe_name}': {e}"))
        })?;
        Ok(transcript)
    }

    async fn delete(&self, name: &str) -> DumblexityResult<()> {
        let safe_name = sanitize_session_name(name)?;
        let path = self.session_path(&safe_name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(DumblexityError::SessionNotFound(safe_name));
        }
        tokio::fs::remove_file(&path).await.map_err(|e| {
            DumblexityError::Session(format!("Failed to delete session '{safe_name}': {e}"))
        })?;
        info!(session = %safe_name, "Session deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_punctuation() {
        assert_eq!(sanitize_session_name("My Session!!").unwrap(), "My Session");
        assert_eq!(sanitize_session_name("  trip_2024-v2  ").unwrap(), "trip_2024-v2");
        assert_eq!(sanitize_session_name("../../etc/passwd").unwrap(), "etcpasswd");
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(matches!(
            sanitize_session_name("!!!"),
            Err(DumblexityError::InvalidSessionName(_))
        ));
        assert!(sanitize_session_name("").is_err());
        assert!(sanitize_session_name("   ").is_err());
    }

    #[test]
    fn test_sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize_session_name("여행 계획?").unwrap(), "여행 계획");
    }
}
