use super::{BackendStream, GenerationBackend, TurnRequest};
use crate::config::{GeminiModel, ModelConfig};
use crate::stream::StreamEvent;
use async_trait::async_trait;
use dumblexity_core::{
    Capability, DumblexityError, DumblexityResult, FunctionCallRecord, GroundingChunk,
    GroundingSource, Role, ToolCall, ToolResult,
};
use dumblexity_skills::SkillRegistry;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const STREAM_CHANNEL_CAPACITY: usize = 256;

/// Gemini `streamGenerateContent` backend.
///
/// Provider-side grounding (search, maps) is requested through the `tools`
/// field; registered skills are declared as functions and executed here, with
/// their replies sent back in follow-up requests until the model answers
/// without calling anything.
pub struct GeminiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn endpoint(&self, model: GeminiModel) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url(),
            model.id()
        )
    }

    fn build_body(&self, request: &TurnRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|turn| text_content(wire_role(turn.role), &turn.content))
            .collect();
        contents.push(text_content("user", &request.input));

        let mut generation_config = json!({
            "temperature": self.config.temperature,
            "maxOutputTokens": self.config.max_output_tokens,
        });
        if request.model.supports_thinking() {
            generation_config["thinkingConfig"] =
                json!({ "thinkingBudget": self.config.thinking_budget });
        }

        let mut body = json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": self.config.system_prompt() }] },
            "generationConfig": generation_config,
        });

        let tools = build_tools(request);
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
        }

        if request.capabilities.contains(Capability::MapSearch) {
            if let Some(location) = request.location {
                body["toolConfig"] = json!({
                    "retrievalConfig": {
                        "latLng": {
                            "latitude": location.latitude,
                            "longitude": location.longitude,
                        }
                    }
                });
            }
        }

        body
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn stream_turn(&self, request: TurnRequest) -> DumblexityResult<BackendStream> {
        let exchange = Exchange {
            http: self.http.clone(),
            url: self.endpoint(request.model),
            api_key: self.config.api_key.clone(),
            body: self.build_body(&request),
            skills: request.skills,
            max_tool_rounds: self.config.max_tool_rounds,
        };

        info!(
            model = %request.model,
            history = request.history.len(),
            tools = exchange.skills.skill_count(),
            "Opening Gemini stream"
        );

        let first = exchange.send().await?;
        let (tx, rx) = mpsc::channel::<StreamEvent>(STREAM_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            if let Err(e) = exchange.run(first, &tx).await {
                warn!(error = %e, "Gemini stream failed");
                let message = match e {
                    DumblexityError::Backend(message) => message,
                    other => other.to_string(),
                };
                let _ = tx.send(StreamEvent::Error { message }).await;
            }
        });

        Ok(BackendStream { events: rx, task })
    }
}

/// State of one turn's conversation with the API, owned by the stream task.
struct Exchange {
    http: reqwest::Client,
    url: String,
    api_key: String,
    body: Value,
    skills: SkillRegistry,
    max_tool_rounds: u32,
}

#[derive(Default)]
struct RoundOutcome {
    model_parts: Vec<Value>,
    calls: Vec<PendingCall>,
}

struct PendingCall {
    name: String,
    args: Value,
}

impl Exchange {
    async fn send(&self) -> DumblexityResult<reqwest::Response> {
        let resp = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.body)
            .send()
            .await
            .map_err(|e| DumblexityError::Backend(format!("Gemini request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DumblexityError::Backend(format!(
                "Gemini API error {status}: {error_body}"
            )));
        }

        Ok(resp)
    }

    /// Drives rounds until the model stops calling tools. Returns early
    /// without error once the receiver is gone.
    async fn run(
        mut self,
        mut response: reqwest::Response,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> DumblexityResult<()> {
        let mut round = 0u32;
        loop {
            let Some(outcome) = read_round(response, tx).await? else {
                return Ok(());
            };

            if outcome.calls.is_empty() {
                let _ = tx.send(StreamEvent::Done).await;
                return Ok(());
            }

            if round >= self.max_tool_rounds {
                warn!(
                    max_tool_rounds = self.max_tool_rounds,
                    pending = outcome.calls.len(),
                    "Tool round limit reached, ending turn"
                );
                let _ = tx.send(StreamEvent::Done).await;
                return Ok(());
            }
            round += 1;

            let Some(replies) = self.answer_calls(&outcome.calls, tx).await else {
                return Ok(());
            };
            self.push_content("model", outcome.model_parts);
            self.push_content("user", replies);

            debug!(round, "Sending tool replies");
            response = self.send().await?;
        }
    }

    async fn answer_calls(
        &self,
        calls: &[PendingCall],
        tx: &mpsc::Sender<StreamEvent>,
    ) -> Option<Vec<Value>> {
        let mut replies = Vec::with_capacity(calls.len());

        for call in calls {
            let tool_call = ToolCall {
                id: format!("call_{}", Uuid::new_v4().simple()),
                name: call.name.clone(),
                arguments: call.args.clone(),
            };
            info!(tool = %tool_call.name, call_id = %tool_call.id, "Executing tool call");

            let result = match self.skills.execute(tool_call.clone()).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(tool = %tool_call.name, error = %e, "Tool execution failed");
                    ToolResult::error(&tool_call.id, e.to_string())
                }
            };

            let record = FunctionCallRecord::from_result(&tool_call, &result);
            if tx.send(StreamEvent::FunctionCall { record }).await.is_err() {
                return None;
            }

            let mut response = serde_json::Map::new();
            let key = if result.is_error { "error" } else { "result" };
            response.insert(key.to_string(), Value::String(result.content));
            replies.push(json!({
                "functionResponse": { "name": call.name, "response": response }
            }));
        }

        Some(replies)
    }

    fn push_content(&mut self, role: &str, parts: Vec<Value>) {
        if let Some(contents) = self.body["contents"].as_array_mut() {
            contents.push(json!({ "role": role, "parts": parts }));
        }
    }
}

/// Reads one SSE response to the end, forwarding text and grounding as they
/// arrive. `None` means the receiver hung up.
async fn read_round(
    response: reqwest::Response,
    tx: &mpsc::Sender<StreamEvent>,
) -> DumblexityResult<Option<RoundOutcome>> {
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut outcome = RoundOutcome::default();

    while let Some(chunk) = stream.next().await {
        let bytes =
            chunk.map_err(|e| DumblexityError::Backend(format!("Stream read error: {e}")))?;
        buffer.extend_from_slice(&bytes);

        while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line);
            if !handle_line(&line, &mut outcome, tx).await? {
                return Ok(None);
            }
        }
    }

    let rest = String::from_utf8_lossy(&buffer);
    if !handle_line(&rest, &mut outcome, tx).await? {
        return Ok(None);
    }

    Ok(Some(outcome))
}

async fn handle_line(
    line: &str,
    outcome: &mut RoundOutcome,
    tx: &mpsc::Sender<StreamEvent>,
) -> DumblexityResult<bool> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(true);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(true);
    }

    let chunk: GenerateChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!(error = %e, "Skipping unparseable SSE payload");
            return Ok(true);
        }
    };

    if let Some(error) = chunk.error {
        return Err(DumblexityError::Backend(format!(
            "Gemini API error: {}",
            error.message
        )));
    }

    for candidate in chunk.candidates {
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            let is_thought = part.get("thought").and_then(Value::as_bool) == Some(true);
            if !is_thought {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    if !text.is_empty()
                        && tx
                            .send(StreamEvent::TextDelta {
                                text: text.to_string(),
                            })
                            .await
                            .is_err()
                    {
                        return Ok(false);
                    }
                }
            }

            if let Some(call) = part.get("functionCall") {
                outcome.calls.push(PendingCall {
                    name: call["name"].as_str().unwrap_or_default().to_string(),
                    args: call.get("args").cloned().unwrap_or_else(|| json!({})),
                });
            }
            outcome.model_parts.push(part);
        }

        if let Some(metadata) = candidate.grounding_metadata {
            let chunks: Vec<GroundingChunk> = metadata
                .grounding_chunks
                .into_iter()
                .filter_map(WireGroundingChunk::into_chunk)
                .collect();
            if !chunks.is_empty()
                && tx
                    .send(StreamEvent::GroundingChunks { chunks })
                    .await
                    .is_err()
            {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn text_content(role: &str, text: &str) -> Value {
    json!({ "role": role, "parts": [{ "text": text }] })
}

fn build_tools(request: &TurnRequest) -> Vec<Value> {
    let mut tools = Vec::new();
    if request.capabilities.contains(Capability::WebSearch) {
        tools.push(json!({ "googleSearch": {} }));
    }
    if request.capabilities.contains(Capability::MapSearch) {
        tools.push(json!({ "googleMaps": {} }));
    }

    let declarations: Vec<Value> = request
        .skills
        .list_descriptors()
        .into_iter()
        .map(|d| {
            json!({
                "name": d.name,
                "description": d.description,
                "parameters": d.parameters_schema,
            })
        })
        .collect();
    if !declarations.is_empty() {
        tools.push(json!({ "functionDeclarations": declarations }));
    }

    tools
}

// -- Gemini wire types --

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(rename = "groundingMetadata", default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    // Kept raw so they can be echoed back unchanged in follow-up requests.
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Deserialize)]
struct WireGroundingChunk {
    #[serde(default)]
    web: Option<GroundingSource>,
    #[serde(default)]
    maps: Option<GroundingSource>,
}

impl WireGroundingChunk {
    fn into_chunk(self) -> Option<GroundingChunk> {
        match (self.web, self.maps) {
            (Some(web), _) => Some(GroundingChunk::Web(web)),
            (None, Some(maps)) => Some(GroundingChunk::Maps(maps)),
            (None, None) => None,
        }
    }
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
