use crate::error::{DumblexityError, DumblexityResult};
use serde::{Deserialize, Serialize};

/// The role of the participant that authored a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
}

impl Role {
    /// The wire name used in persisted transcripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single fully-resolved message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The role of the message author.
    pub role: Role,
    /// The textual content of the message.
    pub content: String,
}

impl Turn {
    /// Creates a turn with [`Role::User`].
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a turn with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An ordered, append-only list of turns.
///
/// Roles strictly alternate starting with [`Role::User`], and every user turn
/// is answered: the transcript only grows by whole user/assistant exchanges.
/// The invariant is checked on construction and on deserialization, so a
/// `Transcript` value is always safe to hand to the generation backend.
///
/// Serializes as a plain JSON array of `{role, content}` records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Turn>", into = "Vec<Turn>")]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a transcript from raw turns, validating the alternation invariant.
    pub fn from_turns(turns: Vec<Turn>) -> DumblexityResult<Self> {
        validate_alternation(&turns)?;
        Ok(Self { turns })
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns (always even).
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no exchange has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends one completed user/assistant exchange.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(Turn::user(user));
        self.turns.push(Turn::assistant(assistant));
    }

    /// The most recent assistant turn, if any.
    pub fn last_assistant(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == Role::Assistant)
    }

    /// Drops every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl TryFrom<Vec<Turn>> for Transcript {
    type Error = DumblexityError;

    fn try_from(turns: Vec<Turn>) -> Result<Self, Self::Error> {
        Self::from_turns(turns)
    }
}

impl From<Transcript> for Vec<Turn> {
    fn from(transcript: Transcript) -> Self {
        transcript.turns
    }
}

fn validate_alternation(turns: &[Turn]) -> DumblexityResult<()> {
    for (index, turn) in turns.iter().enumerate() {
        let expected = if index % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        };
        if turn.role != expected {
            return Err(DumblexityError::InvalidInput(format!(
                "turn {index} has role '{}', expected '{}'",
                turn.role.as_str(),
                expected.as_str()
            )));
        }
    }
    if turns.len() % 2 != 0 {
        return Err(DumblexityError::InvalidInput(
            "transcript ends with an unanswered user turn".to_string(),
        ));
    }
    Ok(())
}
