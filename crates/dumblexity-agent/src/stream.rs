use dumblexity_core::{FunctionCallRecord, GroundingChunk};
use serde::{Deserialize, Serialize};

/// Events a backend emits while generating one turn.
///
/// Order is only meaningful within a kind: text deltas arrive in generation
/// order, but grounding chunks and function-call records may be interleaved
/// with them arbitrarily. Exactly one of `Done` or `Error` ends the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of response text.
    TextDelta {
        text: String,
    },

    /// Grounding references attached to the response so far.
    GroundingChunks {
        chunks: Vec<GroundingChunk>,
    },

    /// A tool the backend invoked, with its reply.
    FunctionCall {
        record: FunctionCallRecord,
    },

    /// The stream has finished successfully.
    Done,

    /// An error occurred during streaming.
    Error {
        message: String,
    },
}
