//! Per-conversation stream driver.
//!
//! A [`ConversationSession`] wires one root conversation together: it feeds
//! backend stream chunks through the [`StreamMultiplexer`], routes the
//! decoded tool-call events into the [`Orchestrator`], and accumulates the
//! narrative transcript. Any stream termination — clean end or network
//! failure — triggers a deterministic teardown via
//! [`Orchestrator::cancel`], so no consultation bookkeeping outlives its
//! conversation and late model responses are discarded.

use crate::officellm::orchestrator::{Orchestrator, ToolCallOutcome};
use crate::officellm::stream_mux::{StreamMultiplexer, ToolEvent, ToolEventKind};
use futures_util::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;

/// Fed to the UI when the backend stream dies mid-answer; phrased to stay
/// in character.
const APOLOGY: &str =
    "\n\nSorry — I lost my train of thought there. Could you send that again?";

struct OpenFrame {
    caller_agent_id: String,
    target_agent_id: String,
    frame_id: String,
}

/// Drives one root conversation against a streamed backend response.
pub struct ConversationSession {
    orchestrator: Arc<Orchestrator>,
    mux: StreamMultiplexer,
    transcript: String,
    open_frames: Vec<OpenFrame>,
}

impl ConversationSession {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            mux: StreamMultiplexer::new(),
            transcript: String::new(),
            open_frames: Vec::new(),
        }
    }

    /// Consume the backend's chunk stream to completion and return the
    /// accumulated narrative transcript.
    ///
    /// Tool-call-start events run the consultation choreography; matching
    /// tool-call-end events complete it. On stream error the apology line is
    /// appended to the transcript, the whole session is torn down, and the
    /// error is returned to the caller. On success the session is torn down
    /// too — by then every consultation has completed, so the cancel is a
    /// no-op sweep.
    pub async fn run_stream<S, E>(&mut self, mut stream: S) -> Result<String, E>
    where
        S: Stream<Item = Result<String, E>> + Unpin,
        E: fmt::Display,
    {
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    let parsed = self.mux.push_chunk(&chunk);
                    self.transcript.push_str(&parsed.text);
                    for event in parsed.events {
                        self.dispatch(event).await;
                    }
                }
                Err(err) => {
                    log::error!("chat stream failed: {}", err);
                    self.transcript.push_str(APOLOGY);
                    self.orchestrator.cancel();
                    self.open_frames.clear();
                    return Err(err);
                }
            }
        }

        let tail = self.mux.finish();
        self.transcript.push_str(&tail);

        self.orchestrator.cancel();
        self.open_frames.clear();
        Ok(self.transcript.clone())
    }

    /// Narrative accumulated so far, markers stripped.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    async fn dispatch(&mut self, event: ToolEvent) {
        match event.kind {
            ToolEventKind::ToolCallStart => {
                let query = event.query.unwrap_or_default();
                let outcome = self
                    .orchestrator
                    .handle_tool_call(&event.caller_agent_id, &event.target_agent_id, &query, None)
                    .await;
                match outcome {
                    ToolCallOutcome::Started(frame) => {
                        self.open_frames.push(OpenFrame {
                            caller_agent_id: event.caller_agent_id,
                            target_agent_id: event.target_agent_id,
                            frame_id: frame.id,
                        });
                    }
                    ToolCallOutcome::Rejected(reason) => {
                        // The backend already fed the rejection text to the
                        // model; the UI only needs the log line.
                        log::debug!("consultation rejected: {}", reason);
                    }
                }
            }
            ToolEventKind::ToolCallEnd => {
                // Innermost open frame for this caller/target pair.
                let position = self.open_frames.iter().rposition(|f| {
                    f.caller_agent_id == event.caller_agent_id
                        && f.target_agent_id == event.target_agent_id
                });
                match position {
                    Some(position) => {
                        let open = self.open_frames.remove(position);
                        let response = event.response.unwrap_or_default();
                        self.orchestrator
                            .complete_tool_call(&open.frame_id, &response)
                            .await;
                    }
                    None => {
                        log::warn!(
                            "tool_call_end without a matching start ({} -> {})",
                            event.caller_agent_id,
                            event.target_agent_id
                        );
                    }
                }
            }
        }
    }
}
