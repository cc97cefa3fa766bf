use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An optional capability the backend may use for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Provider-side web search grounding.
    WebSearch,
    /// Provider-side maps grounding.
    MapSearch,
    /// The `search_web` tool backed by an external search API.
    ExternalWebSearch,
    /// The page and video transcript extraction tools.
    Extraction,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 4] = [
        Capability::WebSearch,
        Capability::MapSearch,
        Capability::ExternalWebSearch,
        Capability::Extraction,
    ];
}

/// The set of capabilities enabled for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// An empty set: plain generation, no tools, no grounding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability enabled.
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Builder-style insert.
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    /// Turns a capability on or off.
    pub fn set(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.0.insert(capability);
        } else {
            self.0.remove(&capability);
        }
    }

    /// Whether the capability is enabled.
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Enabled capabilities in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
