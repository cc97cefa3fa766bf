//! Citation aggregation for Dumblexity turns.
//!
//! Grounding chunks and tool-call records collected while a response streams
//! are deduplicated into a [`CitationSet`], web links are resolved to their
//! final redirect targets, and the result is rendered as markdown sections by
//! the [`CitationAggregator`].

/// Markdown rendering of citation sections.
pub mod aggregator;
/// Ordered, deduplicated citation maps.
pub mod citation_set;
/// Redirect resolution for web citations.
pub mod resolver;
/// Reading references out of tool replies.
pub mod tool_refs;

pub use aggregator::{CitationAggregator, MAPS_HEADING, TOOLS_HEADING, WEB_HEADING};
pub use citation_set::{CitationSet, UNTITLED};
pub use resolver::{HttpUrlResolver, ResolveUrls, BROWSER_USER_AGENT, DEFAULT_RESOLVE_TIMEOUT};
pub use tool_refs::{tool_references, ToolReference};
