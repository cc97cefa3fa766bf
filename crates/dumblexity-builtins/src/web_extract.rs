use crate::tavily::TavilyClient;
use async_trait::async_trait;
use dumblexity_core::{Capability, DumblexityResult, ToolCall, ToolResult};
use dumblexity_skills::skill::{Skill, SkillDescriptor};
use std::sync::Arc;
use tracing::{info, warn};

const MAX_URLS: usize = 20;

/// `extract_web_page`: raw text of one or more pages as `[{url, content}]`.
pub struct WebExtractSkill {
    descriptor: SkillDescriptor,
    client: Arc<TavilyClient>,
}

impl WebExtractSkill {
    pub fn new(client: Arc<TavilyClient>) -> Self {
        Self {
            descriptor: SkillDescriptor {
                name: "extract_web_page".to_string(),
                description: "Extract the raw text content of web pages.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "urls": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "URLs of the pages to extract"
                        }
                    },
                    "required": ["urls"]
                }),
                required_capability: Capability::Extraction,
            },
            client,
        }
    }
}

#[async_trait]
impl Skill for WebExtractSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> DumblexityResult<ToolResult> {
        let urls: Vec<String> = call.arguments["urls"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|u| u.as_str())
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if urls.is_empty() {
            return Ok(ToolResult::error(&call.id, "No URLs to extract"));
        }
        if urls.len() > MAX_URLS {
            return Ok(ToolResult::error(
                &call.id,
                format!("Too many URLs: {} (max: {MAX_URLS})", urls.len()),
            ));
        }

        info!(count = urls.len(), "Extracting web pages");

        match self.client.extract(&urls).await {
            Ok(pages) => Ok(ToolResult::success(
                &call.id,
                serde_json::to_string(&pages)?,
            )),
            Err(e) => {
                warn!(error = %e, "Page extraction failed");
                Ok(ToolResult::error(&call.id, format!("Page extraction failed: {e}")))
            }
        }
    }
}
