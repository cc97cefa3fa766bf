use crate::backends::BackendStream;
use crate::mermaid::extract_mermaid_blocks;
use crate::stream::StreamEvent;
use dumblexity_citations::{CitationAggregator, CitationSet};
use dumblexity_core::{DumblexityError, DumblexityResult, FunctionCallRecord, GroundingChunk};
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

enum TurnState {
    Streaming,
    Completed,
    Failed(String),
}

/// The live response of one turn.
///
/// Yields text fragments in the order the backend produced them while
/// grounding chunks and function-call records are set aside for
/// [`TurnStream::finalize`]. A backend failure ends the stream with one
/// `Err` item after whatever text was already delivered.
///
/// Dropping the stream aborts the backend task.
pub struct TurnStream {
    input: String,
    events: mpsc::Receiver<StreamEvent>,
    task: JoinHandle<()>,
    aggregator: Arc<CitationAggregator>,
    text: String,
    grounding: Vec<GroundingChunk>,
    records: Vec<FunctionCallRecord>,
    state: TurnState,
}

impl TurnStream {
    pub(crate) fn new(
        input: String,
        backend: BackendStream,
        aggregator: Arc<CitationAggregator>,
    ) -> Self {
        Self {
            input,
            events: backend.events,
            task: backend.task,
            aggregator,
            text: String::new(),
            grounding: Vec::new(),
            records: Vec::new(),
            state: TurnState::Streaming,
        }
    }

    /// The user input this turn answers.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Text delivered so far. Still readable after a failure.
    pub fn partial_text(&self) -> &str {
        &self.text
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.state, TurnState::Streaming)
    }

    /// Merges the response with its rendered citations.
    ///
    /// Must be called after the stream is exhausted. A failed turn returns the
    /// backend error again.
    pub async fn finalize(mut self) -> DumblexityResult<CompletedTurn> {
        match &self.state {
            TurnState::Streaming => return Err(DumblexityError::TurnIncomplete),
            TurnState::Failed(message) => return Err(DumblexityError::Backend(message.clone())),
            TurnState::Completed => {}
        }

        let citations = CitationSet::collect(&self.grounding, &self.records);
        let citation_text = self.aggregator.render(&citations).await;
        info!(
            chars = self.text.len(),
            web = citations.web().len(),
            maps = citations.maps().len(),
            tools = citations.tools().len(),
            "Turn finalized"
        );

        Ok(CompletedTurn {
            input: std::mem::take(&mut self.input),
            response_text: std::mem::take(&mut self.text),
            citation_text,
        })
    }

    fn fail(&mut self, message: String) -> Poll<Option<DumblexityResult<String>>> {
        self.state = TurnState::Failed(message.clone());
        Poll::Ready(Some(Err(DumblexityError::Backend(message))))
    }
}

impl Stream for TurnStream {
    type Item = DumblexityResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.is_finished() {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.events.poll_recv(cx)) {
                Some(StreamEvent::TextDelta { text }) => {
                    if text.is_empty() {
                        continue;
                    }
                    this.text.push_str(&text);
                    return Poll::Ready(Some(Ok(text)));
                }
                Some(StreamEvent::GroundingChunks { chunks }) => {
                    debug!(count = chunks.len(), "Grounding chunks received");
                    this.grounding.extend(chunks);
                }
                Some(StreamEvent::FunctionCall { record }) => {
                    debug!(tool = %record.name, "Function call recorded");
                    this.records.push(record);
                }
                Some(StreamEvent::Done) => {
                    this.state = TurnState::Completed;
                    return Poll::Ready(None);
                }
                Some(StreamEvent::Error { message }) => return this.fail(message),
                None => return this.fail("Backend stream ended unexpectedly".to_string()),
            }
        }
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A successfully finished turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTurn {
    input: String,
    response_text: String,
    citation_text: String,
}

impl CompletedTurn {
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The streamed response, without citations.
    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    /// Rendered citation sections; empty when nothing was cited.
    pub fn citation_text(&self) -> &str {
        &self.citation_text
    }

    /// What gets persisted as the assistant turn.
    pub fn content(&self) -> String {
        format!("{}{}", self.response_text, self.citation_text)
    }

    /// Mermaid diagrams found in the response.
    pub fn mermaid_blocks(&self) -> Vec<String> {
        extract_mermaid_blocks(&self.response_text)
    }
}
