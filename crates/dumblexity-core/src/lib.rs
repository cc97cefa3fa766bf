//! Core types and error definitions for Dumblexity.
//!
//! This crate provides the foundational types shared across all Dumblexity
//! crates: the conversation transcript, grounding references emitted by the
//! generation backend, tool call records, and the per-turn capability set.
//!
//! # Main types
//!
//! - [`DumblexityError`] — Unified error enum for all Dumblexity subsystems.
//! - [`DumblexityResult`] — Convenience alias for `Result<T, DumblexityError>`.
//! - [`Role`], [`Turn`], [`Transcript`] — The persisted conversation.
//! - [`GroundingChunk`] — A web or maps source attached to a response.
//! - [`ToolCall`], [`ToolResult`], [`FunctionCallRecord`] — Tool invocations.
//! - [`Capability`], [`CapabilitySet`] — Which tools a turn may use.

/// Per-turn capability toggles.
pub mod capability;
/// Error types.
pub mod error;
/// Grounding references attached to model output.
pub mod grounding;
/// Tool call and function call record types.
pub mod tool;
/// Conversation turns and transcripts.
pub mod turn;

pub use capability::{Capability, CapabilitySet};
pub use error::{DumblexityError, DumblexityResult};
pub use grounding::{GroundingChunk, GroundingSource};
pub use tool::{FunctionCallRecord, ToolCall, ToolResult};
pub use turn::{Role, Transcript, Turn};
