use thiserror::Error;

/// A convenience `Result` alias using [`DumblexityError`].
pub type DumblexityResult<T> = Result<T, DumblexityError>;

/// Top-level error type for Dumblexity.
///
/// Each variant corresponds to a subsystem that can produce errors. Only
/// [`DumblexityError::Backend`] and [`DumblexityError::InvalidInput`] ever fail
/// a conversation turn; everything below the orchestrator recovers locally.
#[derive(Error, Debug)]
pub enum DumblexityError {
    /// The generation backend failed, either at request time or mid-stream.
    #[error("Backend error: {0}")]
    Backend(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A transcript persistence failure (read, write, parse).
    #[error("Session error: {0}")]
    Session(String),

    /// No saved session exists under the given name.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session name is empty once sanitized.
    #[error("Invalid session name: {0:?}")]
    InvalidSessionName(String),

    /// The caller handed the orchestrator something it cannot run.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A turn was finalized before its response stream was exhausted.
    #[error("Turn is still streaming")]
    TurnIncomplete,

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error raised by a skill during invocation.
    #[error("Skill error: {0}")]
    Skill(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
