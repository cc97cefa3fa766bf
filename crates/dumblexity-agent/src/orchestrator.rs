use crate::backends::{GenerationBackend, TurnRequest};
use crate::config::TurnConfig;
use crate::turn::TurnStream;
use dumblexity_citations::CitationAggregator;
use dumblexity_core::{DumblexityError, DumblexityResult, Transcript};
use dumblexity_skills::SkillRegistry;
use std::sync::Arc;
use tracing::info;

/// Runs conversation turns: one backend stream per user input.
///
/// The orchestrator never touches the transcript; callers append the
/// finished exchange themselves once [`TurnStream::finalize`] succeeds.
pub struct TurnOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    skills: SkillRegistry,
    aggregator: Arc<CitationAggregator>,
}

impl TurnOrchestrator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        skills: SkillRegistry,
        aggregator: Arc<CitationAggregator>,
    ) -> Self {
        Self {
            backend,
            skills,
            aggregator,
        }
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    /// Starts a turn. Only tools whose capability is enabled in `config` are
    /// offered to the backend.
    pub async fn run_turn(
        &self,
        history: &Transcript,
        input: &str,
        config: &TurnConfig,
    ) -> DumblexityResult<TurnStream> {
        if input.trim().is_empty() {
            return Err(DumblexityError::InvalidInput("Input is empty".into()));
        }

        let skills = self.skills.enabled_for(&config.capabilities);
        info!(
            model = %config.model,
            history = history.len(),
            capabilities = ?config.capabilities,
            tools = skills.skill_count(),
            "Starting turn"
        );

        let request = TurnRequest {
            model: config.model,
            history: history.turns().to_vec(),
            input: input.to_string(),
            capabilities: config.capabilities.clone(),
            location: config.location,
            skills,
        };

        let backend = self.backend.stream_turn(request).await?;
        Ok(TurnStream::new(
            input.to_string(),
            backend,
            Arc::clone(&self.aggregator),
        ))
    }
}
