pub mod gemini;

use crate::config::{GeminiModel, LatLng};
use crate::stream::StreamEvent;
use async_trait::async_trait;
use dumblexity_core::{CapabilitySet, DumblexityResult, Turn};
use dumblexity_skills::SkillRegistry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything a backend needs to generate one turn.
pub struct TurnRequest {
    pub model: GeminiModel,
    /// Prior turns, alternating and starting with the user.
    pub history: Vec<Turn>,
    pub input: String,
    pub capabilities: CapabilitySet,
    pub location: Option<LatLng>,
    /// Tools the backend may execute during this turn.
    pub skills: SkillRegistry,
}

/// A running generation: the event channel plus the task feeding it.
///
/// Aborting `task` stops generation; the channel closes once it exits.
pub struct BackendStream {
    pub events: mpsc::Receiver<StreamEvent>,
    pub task: JoinHandle<()>,
}

/// Trait for generation backends.
///
/// A backend owns the provider round-trips for a turn, including executing
/// any tools the model calls and feeding their replies back. Everything it
/// learns is reported through [`StreamEvent`]s ending in `Done` or `Error`.
///
/// Errors returned directly mean the turn could not be started at all.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn stream_turn(&self, request: TurnRequest) -> DumblexityResult<BackendStream>;
}
