pub mod backends;
pub mod config;
pub mod mermaid;
pub mod orchestrator;
pub mod stream;
pub mod turn;

pub use backends::gemini::GeminiBackend;
pub use backends::{BackendStream, GenerationBackend, TurnRequest};
pub use config::{GeminiModel, LatLng, ModelConfig, TurnConfig, DEFAULT_SYSTEM_PROMPT};
pub use mermaid::extract_mermaid_blocks;
pub use orchestrator::TurnOrchestrator;
pub use stream::StreamEvent;
pub use turn::{CompletedTurn, TurnStream};
