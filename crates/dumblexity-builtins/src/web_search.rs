use crate::tavily::{SearchRequest, TavilyClient};
use async_trait::async_trait;
use dumblexity_core::{Capability, DumblexityResult, ToolCall, ToolResult};
use dumblexity_skills::skill::{Skill, SkillDescriptor};
use std::sync::Arc;
use tracing::{info, warn};

/// `search_web`: external web search. The reply keeps the API's
/// `results: [{url, title, content, ...}]` shape so results can be cited.
pub struct WebSearchSkill {
    descriptor: SkillDescriptor,
    client: Arc<TavilyClient>,
}

impl WebSearchSkill {
    pub fn new(client: Arc<TavilyClient>) -> Self {
        Self {
            descriptor: SkillDescriptor {
                name: "search_web".to_string(),
                description: "Search the web for up-to-date information. Returns a list of \
                              results with url, title and a content snippet."
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        },
                        "topic": {
                            "type": "string",
                            "enum": ["general", "news", "finance"],
                            "description": "Category of the search (default: general)"
                        },
                        "time_range": {
                            "type": "string",
                            "enum": ["day", "week", "month", "year"],
                            "description": "Only return results published within this range"
                        },
                        "start_date": {
                            "type": "string",
                            "description": "Only results after this date, YYYY-MM-DD"
                        },
                        "end_date": {
                            "type": "string",
                            "description": "Only results before this date, YYYY-MM-DD"
                        },
                        "max_results": {
                            "type": "integer",
                            "description": "Number of results to return, 1-20 (default: 5)"
                        },
                        "include_answer": {
                            "type": "boolean",
                            "description": "Include a short generated answer"
                        },
                        "include_raw_content": {
                            "type": "boolean",
                            "description": "Include the cleaned full text of each result"
                        },
                        "country": {
                            "type": "string",
                            "description": "Boost results from this country (full English name)"
                        }
                    },
                    "required": ["query"]
                }),
                required_capability: Capability::ExternalWebSearch,
            },
            client,
        }
    }
}

#[async_trait]
impl Skill for WebSearchSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> DumblexityResult<ToolResult> {
        let request: SearchRequest = match serde_json::from_value(call.arguments.clone()) {
            Ok(r) => r,
            Err(e) => {
                return Ok(ToolResult::error(
                    &call.id,
                    format!("Invalid search_web arguments: {e}"),
                ));
            }
        };

        if request.query.trim().is_empty() {
            return Ok(ToolResult::error(&call.id, "Empty search query"));
        }

        info!(query = %request.query, "Web search");

        match self.client.search(&request).await {
            Ok(response) => Ok(ToolResult::success(&call.id, response.to_string())),
            Err(e) => {
                warn!(error = %e, "Web search failed");
                Ok(ToolResult::error(&call.id, format!("Web search failed: {e}")))
            }
        }
    }
}
