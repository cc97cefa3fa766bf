use crate::skill::{Skill, SkillDescriptor};
use dumblexity_core::{CapabilitySet, DumblexityError, DumblexityResult, ToolCall, ToolResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Central registry for all available skills.
#[derive(Clone, Default)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        let name = skill.descriptor().name.clone();
        info!(skill = %name, "Registered skill");
        self.skills.insert(name, skill);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Skill>> {
        self.skills.get(name)
    }

    /// Descriptors ordered by skill name.
    pub fn list_descriptors(&self) -> Vec<&SkillDescriptor> {
        self.skills.values().map(|s| s.descriptor()).collect()
    }

    /// A registry holding only the skills whose capability is enabled.
    pub fn enabled_for(&self, capabilities: &CapabilitySet) -> SkillRegistry {
        let skills = self
            .skills
            .iter()
            .filter(|(_, skill)| capabilities.contains(skill.descriptor().required_capability))
            .map(|(name, skill)| (name.clone(), Arc::clone(skill)))
            .collect();
        SkillRegistry { skills }
    }

    /// Execute a tool call against a registered skill.
    pub async fn execute(&self, call: ToolCall) -> DumblexityResult<ToolResult> {
        let skill = self.skills.get(&call.name).ok_or_else(|| {
            warn!(skill = %call.name, "Model called an unregistered skill");
            DumblexityError::Skill(format!("Unknown skill: {}", call.name))
        })?;

        skill.execute(call).await
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
