use crate::tool_refs::tool_references;
use dumblexity_core::{FunctionCallRecord, GroundingChunk};
use indexmap::IndexMap;

/// Title used for grounding chunks that arrive without one.
pub const UNTITLED: &str = "Untitled";

/// Deduplicated citations of one turn, each map URI → title in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationSet {
    web: IndexMap<String, String>,
    maps: IndexMap<String, String>,
    tools: IndexMap<String, String>,
}

impl CitationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from everything a turn accumulated.
    pub fn collect<'a>(
        chunks: impl IntoIterator<Item = &'a GroundingChunk>,
        records: impl IntoIterator<Item = &'a FunctionCallRecord>,
    ) -> Self {
        let mut set = Self::new();
        for chunk in chunks {
            set.add_grounding(chunk);
        }
        for record in records {
            set.add_record(record);
        }
        set
    }

    pub fn add_grounding(&mut self, chunk: &GroundingChunk) {
        let source = chunk.source();
        let Some(uri) = source.uri.as_deref().filter(|u| !u.is_empty()) else {
            return;
        };
        let title = source
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED);
        let target = match chunk {
            GroundingChunk::Web(_) => &mut self.web,
            GroundingChunk::Maps(_) => &mut self.maps,
        };
        insert_first(target, uri, title);
    }

    pub fn add_record(&mut self, record: &FunctionCallRecord) {
        for reference in tool_references(&record.response) {
            insert_first(&mut self.tools, &reference.url, &reference.title);
        }
    }

    pub fn web(&self) -> &IndexMap<String, String> {
        &self.web
    }

    pub fn maps(&self) -> &IndexMap<String, String> {
        &self.maps
    }

    pub fn tools(&self) -> &IndexMap<String, String> {
        &self.tools
    }

    pub fn is_empty(&self) -> bool {
        self.web.is_empty() && self.maps.is_empty() && self.tools.is_empty()
    }
}

// First occurrence keeps both its position and its title.
fn insert_first(map: &mut IndexMap<String, String>, uri: &str, title: &str) {
    if !map.contains_key(uri) {
        map.insert(uri.to_string(), title.to_string());
    }
}
