use crate::store::{sanitize_session_name, TranscriptStore};
use dumblexity_core::{DumblexityResult, Transcript};
use tracing::{debug, warn};

/// The active conversation: its transcript and the name it is saved under.
///
/// Every store operation leaves the session untouched when it fails.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    transcript: Transcript,
    name: Option<String>,
}

impl ChatSession {
    /// An unsaved, empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Name of the saved session this conversation is bound to, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Appends a completed exchange.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.transcript.push_exchange(user, assistant);
    }

    /// Starts over with an unsaved, empty conversation.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.name = None;
    }

    /// Saves under `name` and binds the session to the sanitized name.
    pub async fn save_as(
        &mut self,
        store: &dyn TranscriptStore,
        name: &str,
    ) -> DumblexityResult<String> {
        let saved = store.save(name, &self.transcript).await?;
        self.name = Some(saved.clone());
        Ok(saved)
    }

    /// Replaces the conversation with a saved one.
    pub async fn load(&mut self, store: &dyn TranscriptStore, name: &str) -> DumblexityResult<()> {
        let transcript = store.load(name).await?;
        self.transcript = transcript;
        self.name = Some(sanitize_session_name(name)?);
        Ok(())
    }

    /// Deletes a saved session, unbinding this conversation if it was the one.
    pub async fn delete(&mut self, store: &dyn TranscriptStore, name: &str) -> DumblexityResult<()> {
        store.delete(name).await?;
        let deleted = sanitize_session_name(name)?;
        if self.name.as_deref() == Some(deleted.as_str()) {
            self.name = None;
        }
        Ok(())
    }

    /// Persists silently if bound to a name. Returns whether a save happened.
    pub async fn autosave(&self, store: &dyn TranscriptStore) -> bool {
        let Some(name) = self.name.as_deref() else {
            return false;
        };
        match store.save(name, &self.transcript).await {
            Ok(_) => {
                debug!(session = %name, "Autosaved session");
                true
            }
            Err(e) => {
                warn!(session = %name, error = %e, "Autosave failed");
                false
            }
        }
    }
}
