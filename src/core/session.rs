//! Generation state machine.
//!
//! [`ChatSession`] owns the transcript, the generation status and the
//! throughput metrics. It never performs I/O itself: [`ChatSession::submit`]
//! hands back a [`StreamRequest`] for the event loop to open, and the
//! resulting fragment source is fed back through [`ChatSession::stream_opened`].
//! Fragments are then pulled with [`ChatSession::next_event`] and applied one
//! at a time with [`ChatSession::apply`].

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{ChatRequest, ToolDefinition};
use crate::core::chat_stream::StreamError;
use crate::core::handoff::{FragmentSource, ResponseFragment};
use crate::core::message::ChatTurn;
use crate::core::metrics::Metrics;
use crate::core::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Requesting,
    Streaming,
    /// Transient: the session passes through it on the way back to `Idle`.
    Cancelled,
    /// Transient: the session passes through it on the way back to `Idle`.
    Failed,
}

/// How the most recent generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    /// The stream closed without a final fragment. The partial reply is kept
    /// as the assistant turn; a dropped connection looks the same as a
    /// backend that never sent `done`.
    ClosedWithoutFinal,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(ResponseFragment),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a generation is already in progress")]
    Busy,
    #[error("nothing to send")]
    EmptyPrompt,
}

/// Instruction for the event loop to open a chat stream.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub generation: u64,
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
}

struct ActiveGeneration {
    id: u64,
    cancel_token: CancellationToken,
    source: Option<FragmentSource>,
}

pub struct ChatSession {
    model: String,
    tools: Vec<ToolDefinition>,
    transcript: Transcript,
    metrics: Metrics,
    state: GenerationState,
    last_outcome: Option<GenerationOutcome>,
    active: Option<ActiveGeneration>,
    next_generation: u64,
}

impl ChatSession {
    pub fn new(model: impl Into<String>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            model: model.into(),
            tools,
            transcript: Transcript::new(),
            metrics: Metrics::default(),
            state: GenerationState::Idle,
            last_outcome: None,
            active: None,
            next_generation: 1,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Applies to the next submission; an in-flight generation keeps its model.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<GenerationOutcome> {
        self.last_outcome
    }

    pub fn is_idle(&self) -> bool {
        self.state == GenerationState::Idle
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.id)
    }

    /// Append an informational turn that is shown but never sent.
    pub fn add_info(&mut self, text: impl Into<String>) {
        self.transcript.push(ChatTurn::app_info(text));
    }

    /// Start a generation for `prompt`.
    pub fn submit(&mut self, prompt: &str) -> Result<StreamRequest, SessionError> {
        if self.state != GenerationState::Idle {
            return Err(SessionError::Busy);
        }
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        self.transcript.push(ChatTurn::user(prompt));

        let generation = self.next_generation;
        self.next_generation += 1;
        let cancel_token = CancellationToken::new();
        self.active = Some(ActiveGeneration {
            id: generation,
            cancel_token: cancel_token.clone(),
            source: None,
        });
        self.state = GenerationState::Requesting;
        self.last_outcome = None;
        self.metrics.reset();

        let request = ChatRequest {
            model: self.model.clone(),
            messages: self.transcript.api_messages(),
            stream: true,
            tools: (!self.tools.is_empty()).then(|| self.tools.clone()),
        };
        debug!(generation, model = %request.model, "Submitting prompt");

        Ok(StreamRequest {
            generation,
            request,
            cancel_token,
        })
    }

    /// Feed back the result of opening the stream for `generation`.
    ///
    /// Returns `false` when the result belongs to a generation that is no
    /// longer current; such a source is dropped unread.
    pub fn stream_opened(
        &mut self,
        generation: u64,
        result: Result<FragmentSource, StreamError>,
        now: Instant,
    ) -> bool {
        let is_current = self.state == GenerationState::Requesting
            && self.current_generation() == Some(generation);
        if !is_current {
            debug!(generation, "Discarding stale stream open result");
            return false;
        }

        match result {
            Ok(source) => {
                if let Some(active) = self.active.as_mut() {
                    active.source = Some(source);
                }
                self.metrics.start(now);
                self.state = GenerationState::Streaming;
                debug!(generation, "Stream opened");
            }
            Err(StreamError::Cancelled) => {
                self.active = None;
                self.state = GenerationState::Idle;
                self.last_outcome = Some(GenerationOutcome::Cancelled);
            }
            Err(err) => {
                info!(generation, error = %err, "Chat request failed");
                self.active = None;
                self.state = GenerationState::Failed;
                self.transcript.push(ChatTurn::app_error(err.to_string()));
                self.metrics.reset();
                self.last_outcome = Some(GenerationOutcome::Failed);
                self.state = GenerationState::Idle;
            }
        }
        true
    }

    /// Wait for the next fragment of the active generation. Never resolves
    /// while no stream is open.
    pub async fn next_event(&mut self) -> StreamEvent {
        let source = self
            .active
            .as_mut()
            .and_then(|active| active.source.as_mut());
        match source {
            Some(source) => match source.recv().await {
                Some(fragment) => StreamEvent::Fragment(fragment),
                None => StreamEvent::Closed,
            },
            None => std::future::pending().await,
        }
    }

    /// Apply one stream event. Returns the finalized assistant turn when the
    /// event ended the generation and a reply was produced.
    pub fn apply(&mut self, event: StreamEvent, now: Instant) -> Option<ChatTurn> {
        if self.state != GenerationState::Streaming {
            return None;
        }

        match event {
            StreamEvent::Fragment(fragment) if !fragment.is_final => {
                self.transcript.append_live(&fragment.text);
                self.metrics.record_fragment(&fragment.text);
                None
            }
            StreamEvent::Fragment(fragment) => {
                if !fragment.text.is_empty() || self.transcript.has_live_turn() {
                    self.transcript.append_live(&fragment.text);
                    self.metrics.record_fragment(&fragment.text);
                }
                self.finish(GenerationOutcome::Completed, now)
            }
            StreamEvent::Closed => {
                debug!("Stream closed without a final fragment");
                self.finish(GenerationOutcome::ClosedWithoutFinal, now)
            }
        }
    }

    /// Abort the active generation, keeping whatever text already arrived.
    pub fn cancel(&mut self, now: Instant) -> Option<ChatTurn> {
        if !matches!(
            self.state,
            GenerationState::Requesting | GenerationState::Streaming
        ) {
            return None;
        }

        if let Some(active) = self.active.take() {
            debug!(generation = active.id, "Cancelling generation");
            active.cancel_token.cancel();
        }
        self.state = GenerationState::Cancelled;
        let finalized = self.transcript.finalize_live().cloned();
        self.metrics.freeze(now);
        self.last_outcome = Some(GenerationOutcome::Cancelled);
        self.state = GenerationState::Idle;
        finalized
    }

    /// Cancel any active generation, then empty the transcript.
    pub fn clear(&mut self, now: Instant) {
        self.cancel(now);
        self.transcript.clear();
        self.metrics.reset();
        self.last_outcome = None;
    }

    fn finish(&mut self, outcome: GenerationOutcome, now: Instant) -> Option<ChatTurn> {
        self.active = None;
        self.metrics.freeze(now);
        self.last_outcome = Some(outcome);
        self.state = GenerationState::Idle;
        self.transcript.finalize_live().cloned()
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
        }
    }
}
