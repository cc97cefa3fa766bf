use serde::{Deserialize, Serialize};

/// The source a grounding chunk points at. Providers may omit either field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    /// Link to the source; web links are usually provider redirect URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Display title of the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A reference the backend attached to generated text.
///
/// Chunks are not unique: the same URI may appear in many chunks of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroundingChunk {
    /// A web search result.
    Web(GroundingSource),
    /// A maps place.
    Maps(GroundingSource),
}

impl GroundingChunk {
    /// Convenience constructor for a web chunk.
    pub fn web(uri: impl Into<String>, title: impl Into<String>) -> Self {
        GroundingChunk::Web(GroundingSource {
            uri: Some(uri.into()),
            title: Some(title.into()),
        })
    }

    /// Convenience constructor for a maps chunk.
    pub fn maps(uri: impl Into<String>, title: impl Into<String>) -> Self {
        GroundingChunk::Maps(GroundingSource {
            uri: Some(uri.into()),
            title: Some(title.into()),
        })
    }

    /// The underlying source regardless of kind.
    pub fn source(&self) -> &GroundingSource {
        match self {
            GroundingChunk::Web(source) | GroundingChunk::Maps(source) => source,
        }
    }
}
