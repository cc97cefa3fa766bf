#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Regression tests for dumblexity-agent: ModelConfig, TurnOrchestrator, TurnStream.
//!
//! The backend is replaced by a scripted fake so every event ordering can be
//! reproduced exactly; URL resolution is a fixed lookup table.

use async_trait::async_trait;
use dumblexity_agent::*;
use dumblexity_citations::{CitationAggregator, ResolveUrls};
use dumblexity_core::{
    Capability, CapabilitySet, DumblexityError, DumblexityResult, FunctionCallRecord,
    GroundingChunk, ToolCall, ToolResult, Transcript,
};
use dumblexity_session::ChatSession;
use dumblexity_skills::{Skill, SkillDescriptor, SkillRegistry};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// --- Fakes ---

#[derive(Default)]
struct ScriptedBackend {
    script: Vec<StreamEvent>,
    calls: AtomicUsize,
    last_tools: Mutex<Vec<String>>,
    last_history_len: AtomicUsize,
}

impl ScriptedBackend {
    fn new(script: Vec<StreamEvent>) -> Arc<Self> {
        Arc::new(Self {
            script,
            ..Self::default()
        })
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn stream_turn(&self, request: TurnRequest) -> DumblexityResult<BackendStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_history_len
            .store(request.history.len(), Ordering::SeqCst);
        *self.last_tools.lock().unwrap() = request
            .skills
            .list_descriptors()
            .into_iter()
            .map(|d| d.name.clone())
            .collect();

        let (tx, rx) = mpsc::channel(4);
        let script = self.script.clone();
        let task = tokio::spawn(async move {
            for event in script {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        Ok(BackendStream { events: rx, task })
    }
}

struct FixedResolver(HashMap<String, String>);

#[async_trait]
impl ResolveUrls for FixedResolver {
    async fn resolve_all(&self, urls: &[String]) -> Vec<String> {
        urls.iter()
            .map(|u| self.0.get(u).cloned().unwrap_or_else(|| u.clone()))
            .collect()
    }
}

fn aggregator(pairs: &[(&str, &str)]) -> Arc<CitationAggregator> {
    let table = pairs
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
    Arc::new(CitationAggregator::new(Arc::new(FixedResolver(table))))
}

struct NamedSkill(SkillDescriptor);

impl NamedSkill {
    fn new(name: &str, capability: Capability) -> Arc<Self> {
        Arc::new(Self(SkillDescriptor {
            name: name.to_string(),
            description: format!("{name} test skill"),
            parameters_schema: serde_json::json!({"type": "object"}),
            required_capability: capability,
        }))
    }
}

#[async_trait]
impl Skill for NamedSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.0
    }

    async fn execute(&self, call: ToolCall) -> DumblexityResult<ToolResult> {
        Ok(ToolResult::success(call.id, "{}"))
    }
}

fn orchestrator(backend: Arc<dyn GenerationBackend>) -> TurnOrchestrator {
    TurnOrchestrator::new(backend, SkillRegistry::new(), aggregator(&[]))
}

fn text(t: &str) -> StreamEvent {
    StreamEvent::TextDelta { text: t.into() }
}

fn all_capabilities() -> TurnConfig {
    TurnConfig {
        capabilities: CapabilitySet::all(),
        ..TurnConfig::default()
    }
}

async fn drain(stream: &mut TurnStream) -> (Vec<String>, Option<DumblexityError>) {
    let mut fragments = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) => fragments.push(fragment),
            Err(e) => return (fragments, Some(e)),
        }
    }
    (fragments, None)
}

// --- ModelConfig ---

#[test]
fn test_model_config_deserialization_with_defaults() {
    let toml_str = r#"
        model = "gemini-2.5-pro"
        api_key = "test-key"
    "#;
    let config: ModelConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.model, GeminiModel::Pro25);
    assert_eq!(config.api_key, "test-key");
    assert_eq!(config.temperature, 0.2);
    assert_eq!(config.max_output_tokens, 65536);
    assert_eq!(config.thinking_budget, -1);
    assert_eq!(config.max_tool_rounds, 10);
    assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
}

#[test]
fn test_model_config_rejects_unknown_model() {
    let result: Result<ModelConfig, _> = toml::from_str(r#"model = "gemini-1.0-ultra""#);
    assert!(result.is_err());
}

// --- Streaming and finalization ---

#[tokio::test]
async fn test_web_citation_appended_after_response() {
    let backend = ScriptedBackend::new(vec![
        text("Paris is..."),
        StreamEvent::GroundingChunks {
            chunks: vec![GroundingChunk::web("https://a.example", "A")],
        },
        StreamEvent::Done,
    ]);
    let orch = orchestrator(backend);

    let mut stream = orch
        .run_turn(&Transcript::new(), "What is the capital of France?", &all_capabilities())
        .await
        .unwrap();
    let (fragments, error) = drain(&mut stream).await;
    assert!(error.is_none());
    assert_eq!(fragments, vec!["Paris is..."]);

    let completed = stream.finalize().await.unwrap();
    assert_eq!(completed.response_text(), "Paris is...");
    assert_eq!(
        completed.citation_text(),
        "\n\n#### Web Citations\n1. [A](https://a.example)\n"
    );
    assert_eq!(
        completed.content(),
        "Paris is...\n\n#### Web Citations\n1. [A](https://a.example)\n"
    );
}

#[tokio::test]
async fn test_duplicate_grounding_keeps_first_title() {
    let backend = ScriptedBackend::new(vec![
        StreamEvent::GroundingChunks {
            chunks: vec![GroundingChunk::web("https://a.example", "First")],
        },
        text("Answer"),
        StreamEvent::GroundingChunks {
            chunks: vec![GroundingChunk::web("https://a.example", "Second")],
        },
        StreamEvent::Done,
    ]);
    let mut stream = orchestrator(backend)
        .run_turn(&Transcript::new(), "q", &all_capabilities())
        .await
        .unwrap();
    drain(&mut stream).await;

    let completed = stream.finalize().await.unwrap();
    assert_eq!(
        completed.citation_text(),
        "\n\n#### Web Citations\n1. [First](https://a.example)\n"
    );
}

#[tokio::test]
async fn test_fragments_keep_order_around_side_channels() {
    let record = FunctionCallRecord {
        name: "search_web".into(),
        args: serde_json::json!({"query": "rust"}),
        response: serde_json::Value::String(
            r#"{"results":[{"url":"https://t.example","title":"T"}]}"#.into(),
        ),
    };
    let backend = ScriptedBackend::new(vec![
        text("one "),
        StreamEvent::FunctionCall { record },
        text("two "),
        StreamEvent::GroundingChunks {
            chunks: vec![
                GroundingChunk::maps("https://maps.example/p", "Cafe"),
                GroundingChunk::web("https://vertex.example/r", "Page"),
            ],
        },
        text(""),
        text("three"),
        StreamEvent::Done,
    ]);
    let orch = TurnOrchestrator::new(
        backend,
        SkillRegistry::new(),
        aggregator(&[("https://vertex.example/r", "https://page.example/")]),
    );

    let mut stream = orch
        .run_turn(&Transcript::new(), "q", &all_capabilities())
        .await
        .unwrap();
    let (fragments, _) = drain(&mut stream).await;
    assert_eq!(fragments, vec!["one ", "two ", "three"]);

    let completed = stream.finalize().await.unwrap();
    assert_eq!(
        completed.content(),
        "one two three\
         \n\n#### Web Citations\n1. [Page](https://page.example/)\n\
         \n\n#### Map Citations\n1. [Cafe](https://maps.example/p)\n\
         \n\n#### Tool Citations\n1. [T](https://t.example)\n"
    );
}

#[tokio::test]
async fn test_no_citations_means_plain_text() {
    let backend = ScriptedBackend::new(vec![text("Hello"), StreamEvent::Done]);
    let mut stream = orchestrator(backend)
        .run_turn(&Transcript::new(), "hi", &TurnConfig::default())
        .await
        .unwrap();
    drain(&mut stream).await;
    let completed = stream.finalize().await.unwrap();
    assert_eq!(completed.content(), "Hello");
    assert!(completed.mermaid_blocks().is_empty());
}

#[tokio::test]
async fn test_mermaid_blocks_from_response() {
    let backend = ScriptedBackend::new(vec![
        text("Here:\n```mermaid\ngraph TD\n"),
        text("  A-->B\n```\n"),
        StreamEvent::Done,
    ]);
    let mut stream = orchestrator(backend)
        .run_turn(&Transcript::new(), "draw", &TurnConfig::default())
        .await
        .unwrap();
    drain(&mut stream).await;
    let completed = stream.finalize().await.unwrap();
    assert_eq!(completed.mermaid_blocks(), vec!["graph TD\n  A-->B"]);
}

// --- Failures ---

#[tokio::test]
async fn test_mid_stream_error_keeps_partial_text() {
    let backend = ScriptedBackend::new(vec![
        text("partial "),
        text("answer"),
        StreamEvent::Error {
            message: "connection reset".into(),
        },
    ]);
    let mut session = ChatSession::new();
    let mut stream = orchestrator(backend)
        .run_turn(session.transcript(), "q", &TurnConfig::default())
        .await
        .unwrap();

    let (fragments, error) = drain(&mut stream).await;
    assert_eq!(fragments, vec!["partial ", "answer"]);
    assert!(matches!(error, Some(DumblexityError::Backend(ref m)) if m == "connection reset"));
    assert_eq!(stream.partial_text(), "partial answer");
    assert!(stream.next().await.is_none());

    match stream.finalize().await {
        Err(DumblexityError::Backend(m)) => assert_eq!(m, "connection reset"),
        other => panic!("expected backend error, got {other:?}"),
    }
    // Nothing to append: the conversation stays as it was.
    assert!(session.transcript().is_empty());

    // And stays usable.
    session.record_exchange("retry", "ok");
    assert_eq!(session.transcript().len(), 2);
}

#[tokio::test]
async fn test_stream_closed_without_done_is_error() {
    let backend = ScriptedBackend::new(vec![text("cut")]);
    let mut stream = orchestrator(backend)
        .run_turn(&Transcript::new(), "q", &TurnConfig::default())
        .await
        .unwrap();
    let (fragments, error) = drain(&mut stream).await;
    assert_eq!(fragments, vec!["cut"]);
    assert!(matches!(error, Some(DumblexityError::Backend(_))));
    assert!(stream.finalize().await.is_err());
}

#[tokio::test]
async fn test_finalize_before_exhaustion_is_rejected() {
    let backend = ScriptedBackend::new(vec![text("a"), StreamEvent::Done]);
    let stream = orchestrator(backend)
        .run_turn(&Transcript::new(), "q", &TurnConfig::default())
        .await
        .unwrap();
    assert!(matches!(
        stream.finalize().await,
        Err(DumblexityError::TurnIncomplete)
    ));
}

#[tokio::test]
async fn test_empty_input_never_reaches_backend() {
    let backend = ScriptedBackend::new(vec![StreamEvent::Done]);
    let orch = orchestrator(backend.clone());

    for input in ["", "   ", "\n\t"] {
        let result = orch
            .run_turn(&Transcript::new(), input, &TurnConfig::default())
            .await;
        assert!(matches!(result, Err(DumblexityError::InvalidInput(_))));
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

// --- Capabilities and history ---

#[tokio::test]
async fn test_disabled_capabilities_hide_tools() {
    let backend = ScriptedBackend::new(vec![StreamEvent::Done]);
    let mut skills = SkillRegistry::new();
    skills.register(NamedSkill::new("search_web", Capability::ExternalWebSearch));
    skills.register(NamedSkill::new("extract_web_page", Capability::Extraction));
    let orch = TurnOrchestrator::new(backend.clone(), skills, aggregator(&[]));

    let config = TurnConfig {
        capabilities: CapabilitySet::new().with(Capability::Extraction),
        ..TurnConfig::default()
    };
    let mut stream = orch.run_turn(&Transcript::new(), "q", &config).await.unwrap();
    drain(&mut stream).await;
    assert_eq!(*backend.last_tools.lock().unwrap(), vec!["extract_web_page"]);

    let mut stream = orch
        .run_turn(&Transcript::new(), "q", &TurnConfig::default())
        .await
        .unwrap();
    drain(&mut stream).await;
    assert!(backend.last_tools.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_completed_turn_appends_one_exchange() {
    let backend = ScriptedBackend::new(vec![
        text("Bonjour"),
        StreamEvent::GroundingChunks {
            chunks: vec![GroundingChunk::web("https://a.example", "A")],
        },
        StreamEvent::Done,
    ]);
    let orch = orchestrator(backend.clone());
    let mut session = ChatSession::new();
    session.record_exchange("earlier", "reply");

    let mut stream = orch
        .run_turn(session.transcript(), "Say hello", &all_capabilities())
        .await
        .unwrap();
    drain(&mut stream).await;
    let completed = stream.finalize().await.unwrap();
    session.record_exchange(completed.input(), completed.content());

    assert_eq!(backend.last_history_len.load(Ordering::SeqCst), 2);
    let turns = session.transcript().turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[2].content, "Say hello");
    assert!(turns[3].content.starts_with("Bonjour\n\n#### Web Citations\n"));
}

// --- Cancellation ---

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct HangingBackend {
    stopped: Arc<AtomicBool>,
}

#[async_trait]
impl GenerationBackend for HangingBackend {
    async fn stream_turn(&self, _request: TurnRequest) -> DumblexityResult<BackendStream> {
        let (tx, rx) = mpsc::channel(4);
        let guard = SetOnDrop(Arc::clone(&self.stopped));
        let task = tokio::spawn(async move {
            let _guard = guard;
            let _ = tx.send(text("first")).await;
            std::future::pending::<()>().await;
        });
        Ok(BackendStream { events: rx, task })
    }
}

#[tokio::test]
async fn test_dropping_stream_aborts_backend() {
    let stopped = Arc::new(AtomicBool::new(false));
    let backend = Arc::new(HangingBackend {
        stopped: Arc::clone(&stopped),
    });
    let orch = orchestrator(backend);

    let mut stream = orch
        .run_turn(&Transcript::new(), "q", &TurnConfig::default())
        .await
        .unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "first");
    assert!(!stopped.load(Ordering::SeqCst));

    drop(stream);
    tokio::time::timeout(Duration::from_secs(2), async {
        while !stopped.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("backend task was not aborted");
}
