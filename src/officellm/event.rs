//! Consultation event system.
//!
//! Provides a callback-based observability layer for the consultation
//! orchestrator. Implement [`ConsultationObserver`] to receive real-time
//! notifications about:
//!
//! - **Status messages**: one per choreography phase (consulting, thinking,
//!   returning) plus a final response summary
//! - **Frame lifecycle**: when a consultation frame is pushed and when it
//!   completes
//!
//! All methods have default no-op implementations, so you only override what
//! you care about. The observer is wrapped in `Arc<dyn ConsultationObserver>`
//! and registered on the orchestrator via
//! [`with_observer`](crate::orchestrator::Orchestrator::with_observer).
//!
//! # Example
//!
//! ```rust,no_run
//! use officellm::event::{ConsultationObserver, StatusMessage};
//! use async_trait::async_trait;
//!
//! struct ChatPanel;
//!
//! #[async_trait]
//! impl ConsultationObserver for ChatPanel {
//!     async fn on_status_message(&self, status: &StatusMessage) {
//!         println!("[depth {}] {}", status.depth, status.message);
//!     }
//! }
//! ```

use crate::officellm::call_stack::ToolCallFrame;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which choreography phase a [`StatusMessage`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// The target agent has been summoned and is heading to the caller.
    Consulting,
    /// The target agent is pondering the question (model round-trip pending).
    Thinking,
    /// The target agent is walking back to its desk.
    Returning,
    /// A truncated preview of the colleague's answer.
    Summary,
}

/// Ephemeral progress event emitted to observers. Never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_agent_id: Option<String>,
    pub message: String,
    pub depth: usize,
    pub timestamp: DateTime<Utc>,
}

impl StatusMessage {
    pub fn new(
        kind: StatusKind,
        agent_id: impl Into<String>,
        target_agent_id: Option<String>,
        message: impl Into<String>,
        depth: usize,
    ) -> Self {
        Self {
            kind,
            agent_id: agent_id.into(),
            target_agent_id,
            message: message.into(),
            depth,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for receiving consultation progress events.
///
/// All methods have **default no-op implementations**. The `Send + Sync`
/// bound allows the observer to be shared across tokio tasks via
/// `Arc<dyn ConsultationObserver>`; keep any internal state behind
/// appropriate synchronization.
#[async_trait]
pub trait ConsultationObserver: Send + Sync {
    /// Called once per phase transition and for the final summary.
    async fn on_status_message(&self, _status: &StatusMessage) {}

    /// Called after a frame is pushed and its walking phase begins.
    async fn on_tool_call_start(&self, _frame: &ToolCallFrame) {}

    /// Called after a frame is popped, with the response attached.
    async fn on_tool_call_complete(&self, _frame: &ToolCallFrame) {}
}
