use async_trait::async_trait;
use dumblexity_core::{Capability, DumblexityResult, ToolCall, ToolResult};
use serde::{Deserialize, Serialize};

/// Metadata describing a skill's interface and the capability that gates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
    pub required_capability: Capability,
}

/// A named external capability the model may invoke.
///
/// Recoverable failures (bad arguments, upstream errors, missing data) are
/// returned as `Ok(ToolResult)` so the model can react to them; `Err` is
/// reserved for failures of the skill machinery itself.
#[async_trait]
pub trait Skill: Send + Sync {
    fn descriptor(&self) -> &SkillDescriptor;

    async fn execute(&self, call: ToolCall) -> DumblexityResult<ToolResult>;
}
