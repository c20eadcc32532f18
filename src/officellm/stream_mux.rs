//! Streaming response multiplexer.
//!
//! The chat backend answers with one byte stream that interleaves ordinary
//! assistant prose with out-of-band tool-call events. Events are framed with
//! a fixed sentinel pair on their own line:
//!
//! ```text
//! \n__TOOL_EVENT__{"toolEvent":{...}}__END_TOOL_EVENT__\n
//! ```
//!
//! [`StreamMultiplexer`] splits that stream back apart: feed it network
//! chunks as they arrive and it yields the residual narrative text plus the
//! embedded [`ToolEvent`]s in stream order. Chunk boundaries may land
//! anywhere — in the middle of a sentinel, inside the JSON payload — and the
//! multiplexer carries the incomplete tail until the closing sentinel shows
//! up. Malformed JSON payloads are logged and skipped, never fatal.
//!
//! # Example
//!
//! ```rust
//! use officellm::stream_mux::StreamMultiplexer;
//!
//! let mut mux = StreamMultiplexer::new();
//! let a = mux.push_chunk("Let me ask Dana.\n__TOOL_E");
//! let b = mux.push_chunk(
//!     "VENT__{\"toolEvent\":{\"type\":\"tool_call_start\",\
//!      \"callerAgentId\":\"gary\",\"targetAgentId\":\"dana\",\
//!      \"query\":\"budget?\",\"depth\":0}}__END_TOOL_EVENT__\nOn it.",
//! );
//! assert_eq!(a.events.len() + b.events.len(), 1);
//! assert_eq!(format!("{}{}{}", a.text, b.text, mux.finish()), "Let me ask Dana.On it.");
//! ```

use serde::{Deserialize, Serialize};

const EVENT_START: &str = "__TOOL_EVENT__";
const EVENT_END: &str = "__END_TOOL_EVENT__";

/// Discriminator inside the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolEventKind {
    #[serde(rename = "tool_call_start")]
    ToolCallStart,
    #[serde(rename = "tool_call_end")]
    ToolCallEnd,
}

/// One tool-call event as embedded in the stream.
///
/// The field names mirror the backend's JSON (`camelCase`) exactly — this
/// framing is a wire compatibility contract and must not drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEvent {
    #[serde(rename = "type")]
    pub kind: ToolEventKind,
    pub caller_agent_id: String,
    pub target_agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub depth: usize,
}

/// Wire envelope: `{"toolEvent": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolEventEnvelope {
    #[serde(rename = "toolEvent")]
    tool_event: ToolEvent,
}

/// What one pushed chunk contributed: narrative text and decoded events, in
/// stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedChunk {
    pub text: String,
    pub events: Vec<ToolEvent>,
}

/// Incremental splitter for the interleaved text/event stream.
///
/// Holds the unparseable tail of the previous chunk (an open sentinel, a
/// partial sentinel prefix, or a trailing newline that may be event framing)
/// until more bytes arrive. Call [`finish`](StreamMultiplexer::finish) after
/// the stream ends to flush whatever is left as plain text.
#[derive(Default)]
pub struct StreamMultiplexer {
    carry: String,
}

impl StreamMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns the narrative text and events it
    /// completed.
    ///
    /// The framing newlines directly around a sentinel pair are consumed
    /// with the event, so concatenating the `text` of every chunk (plus
    /// [`finish`](StreamMultiplexer::finish)) reconstructs the original
    /// narrative with the markers removed.
    pub fn push_chunk(&mut self, chunk: &str) -> ParsedChunk {
        self.carry.push_str(chunk);

        let mut out = ParsedChunk::default();
        loop {
            match self.carry.find(EVENT_START) {
                Some(start) => {
                    let payload_start = start + EVENT_START.len();
                    match self.carry[payload_start..].find(EVENT_END) {
                        Some(rel_end) => {
                            let payload_end = payload_start + rel_end;

                            // Narrative before the marker, minus the framing
                            // newline that introduced it.
                            let mut head = &self.carry[..start];
                            if head.ends_with('\n') {
                                head = &head[..head.len() - 1];
                            }
                            out.text.push_str(head);

                            let payload = &self.carry[payload_start..payload_end];
                            match serde_json::from_str::<ToolEventEnvelope>(payload) {
                                Ok(envelope) => out.events.push(envelope.tool_event),
                                Err(err) => {
                                    log::warn!(
                                        "skipping malformed tool event payload ({}): {}",
                                        err,
                                        payload
                                    );
                                }
                            }

                            let mut rest = payload_end + EVENT_END.len();
                            // Swallow the framing newline after the marker.
                            if self.carry[rest..].starts_with('\n') {
                                rest += 1;
                            }
                            self.carry.drain(..rest);
                        }
                        // Open marker: wait for the closing sentinel.
                        None => {
                            let mut head_len = start;
                            if head_len > 0 && self.carry[..head_len].ends_with('\n') {
                                head_len -= 1;
                            }
                            out.text.push_str(&self.carry[..head_len]);
                            self.carry.drain(..head_len);
                            break;
                        }
                    }
                }
                None => {
                    // Emit everything except a tail that could still become
                    // a marker: a partial "__TOOL_EVENT__" prefix, possibly
                    // preceded by its framing newline.
                    let keep = held_back_len(&self.carry);
                    let emit_len = self.carry.len() - keep;
                    out.text.push_str(&self.carry[..emit_len]);
                    self.carry.drain(..emit_len);
                    break;
                }
            }
        }

        out
    }

    /// Flush the carried tail after the stream has ended.
    ///
    /// An unterminated marker at end-of-stream is surfaced as literal text;
    /// the backend never splits a marker across responses, so this only
    /// happens on truncated streams.
    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.carry)
    }
}

/// Length of the longest suffix that must be withheld because it could be
/// the start of a sentinel: a prefix of `\n__TOOL_EVENT__` or of
/// `__TOOL_EVENT__` itself.
fn held_back_len(buffer: &str) -> usize {
    let with_newline = format!("\n{}", EVENT_START);
    for candidate in [with_newline.as_str(), EVENT_START].iter() {
        let max = candidate.len().min(buffer.len());
        for len in (1..=max).rev() {
            if buffer.ends_with(&candidate[..len]) {
                return len;
            }
        }
    }
    0
}
