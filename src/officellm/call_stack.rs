//! Explicit stack of in-flight agent-to-agent consultations.
//!
//! The stack — not the language call stack — is the source of truth for how
//! deep a consultation chain is and who participates in it. The orchestrator
//! consults it before pushing a new frame to enforce the depth bound and the
//! cycle rule; both rejections degrade to canned in-character messages, never
//! errors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Choreography phase of one consultation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStatus {
    Pending,
    Walking,
    Thinking,
    Returning,
    Complete,
}

/// One record of an in-flight consultation.
///
/// `depth` is 0-based and equals the stack position at push time; it strictly
/// increases along a call chain. Frames are discarded on pop, not retained.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallFrame {
    /// Unique frame id (UUID v4).
    pub id: String,
    pub caller_agent_id: String,
    pub target_agent_id: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub depth: usize,
    pub status: FrameStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_bubble_id: Option<String>,
}

impl ToolCallFrame {
    /// Create a fresh `Pending` frame. The definitive depth is assigned by
    /// [`ConsultationStack::push`].
    pub fn new(
        caller_agent_id: impl Into<String>,
        target_agent_id: impl Into<String>,
        query: impl Into<String>,
        context: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            caller_agent_id: caller_agent_id.into(),
            target_agent_id: target_agent_id.into(),
            query: query.into(),
            context,
            depth: 0,
            status: FrameStatus::Pending,
            start_time: Utc::now(),
            response: None,
            thought_bubble_id: None,
        }
    }
}

/// LIFO stack of consultation frames for one root conversation.
///
/// Reset between conversations; mutated only by the orchestrator.
#[derive(Default)]
pub struct ConsultationStack {
    frames: Vec<ToolCallFrame>,
}

impl ConsultationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `depth = len()`, append, and return a snapshot of the pushed
    /// frame.
    pub fn push(&mut self, mut frame: ToolCallFrame) -> ToolCallFrame {
        frame.depth = self.frames.len();
        self.frames.push(frame.clone());
        frame
    }

    /// Remove and return the top frame.
    pub fn pop(&mut self) -> Option<ToolCallFrame> {
        self.frames.pop()
    }

    /// Whether `agent_id` appears as caller or target in any in-flight frame.
    ///
    /// This is the cycle rule: an agent already in the chain must not be
    /// consulted again, directly or transitively.
    pub fn is_agent_in_chain(&self, agent_id: &str) -> bool {
        self.frames
            .iter()
            .any(|f| f.caller_agent_id == agent_id || f.target_agent_id == agent_id)
    }

    /// Borrow a frame by id for status updates.
    pub fn frame_mut(&mut self, frame_id: &str) -> Option<&mut ToolCallFrame> {
        self.frames.iter_mut().find(|f| f.id == frame_id)
    }

    /// Borrow the innermost in-flight frame.
    pub fn top_mut(&mut self) -> Option<&mut ToolCallFrame> {
        self.frames.last_mut()
    }

    /// Structured view of all in-flight frames, bottom-most first.
    pub fn frames(&self) -> &[ToolCallFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Discard every frame. Used on conversation teardown.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_increasing_depth() {
        let mut stack = ConsultationStack::new();
        let a = stack.push(ToolCallFrame::new("alice", "bob", "q1", None));
        let b = stack.push(ToolCallFrame::new("bob", "carol", "q2", None));
        assert_eq!(a.depth, 0);
        assert_eq!(b.depth, 1);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_pop_is_lifo() {
        let mut stack = ConsultationStack::new();
        stack.push(ToolCallFrame::new("alice", "bob", "q1", None));
        stack.push(ToolCallFrame::new("bob", "carol", "q2", None));

        assert_eq!(stack.pop().unwrap().target_agent_id, "carol");
        assert_eq!(stack.pop().unwrap().target_agent_id, "bob");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_chain_membership_covers_callers_and_targets() {
        let mut stack = ConsultationStack::new();
        stack.push(ToolCallFrame::new("alice", "bob", "q1", None));
        stack.push(ToolCallFrame::new("bob", "carol", "q2", None));

        assert!(stack.is_agent_in_chain("alice"));
        assert!(stack.is_agent_in_chain("bob"));
        assert!(stack.is_agent_in_chain("carol"));
        assert!(!stack.is_agent_in_chain("dave"));
    }
}
