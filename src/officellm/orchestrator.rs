//! Call-stack-guarded consultation orchestrator.
//!
//! When an agent's LLM decides to consult a teammate (a recursive tool call),
//! the game world has to *show* it: the teammate walks over, a thought bubble
//! appears while the nested model round-trip runs, and the teammate heads
//! back to its desk once the answer is in. The [`Orchestrator`] drives that
//! three-phase choreography per consultation frame and guards the recursion
//! structurally:
//!
//! - **Depth bound**: no frame is pushed at `max_call_depth` or beyond.
//! - **Cycle rule**: an agent already in the chain (as caller or target)
//!   cannot be consulted again.
//! - **Busy lock**: a per-agent flag keeps two callers from summoning the
//!   same colleague at once.
//!
//! All three rejections degrade to in-character text via
//! [`ToolCallOutcome::Rejected`] — fed back into the conversation as if the
//! colleague had replied — never errors. The actual model round-trip happens
//! outside the orchestrator, between
//! [`handle_tool_call`](Orchestrator::handle_tool_call) and
//! [`complete_tool_call`](Orchestrator::complete_tool_call).
//!
//! # Architecture
//!
//! ```text
//! ConversationSession → Orchestrator → [Positioning | Movement | ThoughtBubble] backends
//!                            │
//!                            └── ConsultationSession (stack + busy flags, per root conversation)
//! ```

use crate::officellm::call_stack::{ConsultationStack, FrameStatus, ToolCallFrame};
use crate::officellm::config::OfficeConfig;
use crate::officellm::event::{ConsultationObserver, StatusKind, StatusMessage};
use crate::officellm::movement::MovementState;
use crate::officellm::navigation::WorldPoint;
use async_trait::async_trait;
use std::collections::HashSet;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Where agents are. Implemented by the hosting space/world.
pub trait PositioningBackend: Send + Sync {
    /// World position of an agent, `None` for unknown ids.
    fn agent_position(&self, agent_id: &str) -> Option<WorldPoint>;

    /// The roster, in placement order. Used for the "unknown agent"
    /// rejection message.
    fn agent_ids(&self) -> Vec<String>;
}

/// How agents move. Implemented by the hosting space/world.
#[async_trait]
pub trait MovementBackend: Send + Sync {
    /// Walk `walker_id` to `target_id`'s position; resolves on arrival.
    async fn walk_agent_to_agent(
        &self,
        walker_id: &str,
        target_id: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Instant placement next to the target — the cheap alternative to
    /// walking when the caller's position is unknown.
    fn teleport_agent_to_agent(
        &self,
        walker_id: &str,
        target_id: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Walk the agent back to its desk; resolves on arrival.
    async fn return_agent_to_desk(
        &self,
        agent_id: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Start the walk home without awaiting arrival. Used by
    /// [`Orchestrator::cancel`] to herd everyone back in one synchronous
    /// sweep.
    fn begin_return_to_desk(&self, agent_id: &str);

    /// Impose a stationary movement state.
    fn set_agent_state(&self, agent_id: &str, state: MovementState);
}

/// The "thinking" visual markers. Implemented by the rendering layer.
pub trait ThoughtBubbleBackend: Send + Sync {
    fn show_thought_bubble(
        &self,
        bubble_id: &str,
        agent_id: &str,
        content: Option<&str>,
        depth: usize,
    );
    fn update_thought_bubble(&self, bubble_id: &str, content: &str);
    fn hide_thought_bubble(&self, bubble_id: &str);
    fn hide_all_thought_bubbles(&self);
}

/// Guard state for one root conversation: the consultation stack plus the
/// per-agent busy flags. Owned by the orchestrator, reset by
/// [`Orchestrator::cancel`] — never a process-wide global, so concurrent
/// conversations each get their own.
#[derive(Default)]
pub struct ConsultationSession {
    stack: ConsultationStack,
    busy: HashSet<String>,
}

/// Result of [`Orchestrator::handle_tool_call`].
#[derive(Debug, Clone)]
pub enum ToolCallOutcome {
    /// The choreography ran through its walking and thinking phases; the
    /// caller should now perform the model round-trip and report back via
    /// [`Orchestrator::complete_tool_call`] with the frame's id.
    Started(ToolCallFrame),
    /// Structural rejection (busy target, unknown target, depth bound,
    /// cycle). The string reads as in-character dialogue and should be fed
    /// back into the conversation as the colleague's reply.
    Rejected(String),
}

/// Drives the walk → think → return choreography for agent consultations.
pub struct Orchestrator {
    config: OfficeConfig,
    positioning: Arc<dyn PositioningBackend>,
    movement: Arc<dyn MovementBackend>,
    bubbles: Arc<dyn ThoughtBubbleBackend>,
    observer: Option<Arc<dyn ConsultationObserver>>,
    session: Mutex<ConsultationSession>,
}

impl Orchestrator {
    pub fn new(
        positioning: Arc<dyn PositioningBackend>,
        movement: Arc<dyn MovementBackend>,
        bubbles: Arc<dyn ThoughtBubbleBackend>,
        config: OfficeConfig,
    ) -> Self {
        Self {
            config,
            positioning,
            movement,
            bubbles,
            observer: None,
            session: Mutex::new(ConsultationSession::default()),
        }
    }

    /// Register an observer for status messages and frame lifecycle events.
    pub fn with_observer(mut self, observer: Arc<dyn ConsultationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Snapshot of all in-flight consultation frames, bottom-most first.
    pub fn frames(&self) -> Vec<ToolCallFrame> {
        self.session.lock().unwrap().stack.frames().to_vec()
    }

    /// Whether an agent is currently locked as a consultation target.
    pub fn is_agent_busy(&self, agent_id: &str) -> bool {
        self.session.lock().unwrap().busy.contains(agent_id)
    }

    /// Begin one consultation: guard, push a frame, and run the walking and
    /// thinking phases.
    ///
    /// On [`ToolCallOutcome::Started`] the target agent is standing next to
    /// the caller in the `Consulting` state with a thought bubble up, and
    /// control returns so the caller can run the nested model round-trip.
    pub async fn handle_tool_call(
        &self,
        caller_agent_id: &str,
        target_agent_id: &str,
        query: &str,
        context: Option<String>,
    ) -> ToolCallOutcome {
        if self.positioning.agent_position(target_agent_id).is_none() {
            let roster = self.positioning.agent_ids().join(", ");
            log::debug!("tool call rejected: unknown agent '{}'", target_agent_id);
            return ToolCallOutcome::Rejected(format!(
                "I don't know anyone called '{}' around here. The team is: {}.",
                target_agent_id, roster
            ));
        }

        let frame = {
            let mut session = self.session.lock().unwrap();
            if session.busy.contains(target_agent_id) {
                log::debug!("tool call rejected: {} is busy", target_agent_id);
                return ToolCallOutcome::Rejected(format!(
                    "{} is already in the middle of a consultation — try again in a moment.",
                    target_agent_id
                ));
            }
            if session.stack.len() >= self.config.max_call_depth {
                log::debug!(
                    "tool call rejected: depth {} reached",
                    self.config.max_call_depth
                );
                return ToolCallOutcome::Rejected(
                    "We're already too many consultations deep — I'll answer with what I have."
                        .to_string(),
                );
            }
            if session.stack.is_agent_in_chain(target_agent_id) {
                log::debug!(
                    "tool call rejected: {} already in consultation chain",
                    target_agent_id
                );
                return ToolCallOutcome::Rejected(format!(
                    "{} is already part of this consultation chain — circling back to them is blocked.",
                    target_agent_id
                ));
            }

            let frame = session.stack.push(ToolCallFrame::new(
                caller_agent_id,
                target_agent_id,
                query,
                context,
            ));
            session.busy.insert(target_agent_id.to_string());
            frame
        };

        if let Some(observer) = &self.observer {
            observer.on_tool_call_start(&frame).await;
        }

        // Walking phase.
        self.set_frame_status(&frame.id, FrameStatus::Walking);
        self.emit_status(StatusMessage::new(
            StatusKind::Consulting,
            caller_agent_id,
            Some(target_agent_id.to_string()),
            format!(
                "{} is walking over to {}'s desk to help out",
                target_agent_id, caller_agent_id
            ),
            frame.depth,
        ))
        .await;

        if self.positioning.agent_position(caller_agent_id).is_some() {
            if let Err(err) = self
                .movement
                .walk_agent_to_agent(target_agent_id, caller_agent_id)
                .await
            {
                log::warn!(
                    "walk {} -> {} failed ({}); teleporting instead",
                    target_agent_id,
                    caller_agent_id,
                    err
                );
                let _ = self
                    .movement
                    .teleport_agent_to_agent(target_agent_id, caller_agent_id);
            }
        } else if let Err(err) = self
            .movement
            .teleport_agent_to_agent(target_agent_id, caller_agent_id)
        {
            log::warn!("teleport {} failed: {}", target_agent_id, err);
        }

        // Thinking phase. Claim the frame before any visible side effect:
        // if cancel() ran during the walk the frame is gone, the agent is
        // already walking home, and nothing further should be shown.
        let bubble_id = Uuid::new_v4().to_string();
        let snapshot = {
            let mut session = self.session.lock().unwrap();
            match session.stack.frame_mut(&frame.id) {
                Some(f) => {
                    f.status = FrameStatus::Thinking;
                    f.thought_bubble_id = Some(bubble_id.clone());
                    Some(f.clone())
                }
                None => None,
            }
        };
        let frame = match snapshot {
            Some(frame) => frame,
            None => {
                return ToolCallOutcome::Rejected(
                    "The consultation was interrupted — let me answer with what I have."
                        .to_string(),
                )
            }
        };

        self.movement
            .set_agent_state(target_agent_id, MovementState::Consulting);
        self.bubbles
            .show_thought_bubble(&bubble_id, target_agent_id, Some("…"), frame.depth);
        self.emit_status(StatusMessage::new(
            StatusKind::Thinking,
            target_agent_id,
            None,
            format!(
                "{} is thinking about: {}",
                target_agent_id,
                truncate_summary(query, self.config.summary_max_chars)
            ),
            frame.depth,
        ))
        .await;

        ToolCallOutcome::Started(frame)
    }

    /// Finish one consultation once the nested model response is known.
    ///
    /// Shows the truncated summary on the bubble, holds it long enough to
    /// read, runs the returning phase, then unlocks the target and pops the
    /// frame. Returns `false` with no side effects when the frame is not the
    /// innermost in-flight one — unknown (e.g. the session was cancelled
    /// while the model round-trip was in flight) or out of order (an inner
    /// consultation is still open). The caller should discard the response.
    pub async fn complete_tool_call(&self, frame_id: &str, response: &str) -> bool {
        let (target_agent_id, depth, bubble_id) = {
            let mut session = self.session.lock().unwrap();
            match session.stack.top_mut() {
                Some(f) if f.id == frame_id => {
                    f.response = Some(response.to_string());
                    (f.target_agent_id.clone(), f.depth, f.thought_bubble_id.clone())
                }
                Some(_) => {
                    // Completing an outer frame while an inner consultation
                    // is open would strand the inner chain and corrupt the
                    // busy bookkeeping; refuse before any visible effect.
                    log::warn!(
                        "complete_tool_call: frame {} is not the innermost frame; refusing",
                        frame_id
                    );
                    return false;
                }
                None => {
                    log::debug!("complete_tool_call: frame {} no longer exists", frame_id);
                    return false;
                }
            }
        };

        let summary = truncate_summary(response, self.config.summary_max_chars);
        if let Some(bubble_id) = &bubble_id {
            self.bubbles.update_thought_bubble(bubble_id, &summary);
        }
        // Leave the summary up long enough for a human to read it.
        tokio::time::sleep(Duration::from_millis(self.config.readable_delay_ms)).await;

        // Returning phase. The frame may have vanished during the pause if
        // the conversation was cancelled; the bubbles are already hidden
        // then, so just bail.
        if !self.set_frame_status(frame_id, FrameStatus::Returning) {
            return false;
        }
        self.emit_status(StatusMessage::new(
            StatusKind::Returning,
            target_agent_id.clone(),
            None,
            format!("{} is heading back to their desk", target_agent_id),
            depth,
        ))
        .await;

        if let Err(err) = self.movement.return_agent_to_desk(&target_agent_id).await {
            log::warn!("return to desk for {} failed: {}", target_agent_id, err);
        }

        let completed = {
            let mut session = self.session.lock().unwrap();
            let is_top = session
                .stack
                .frames()
                .last()
                .map_or(false, |f| f.id == frame_id);
            if is_top {
                session.busy.remove(&target_agent_id);
                session.stack.pop().map(|mut frame| {
                    frame.status = FrameStatus::Complete;
                    frame
                })
            } else {
                // cancel() swept the stack while the returning phase ran;
                // the busy flags went with it.
                log::debug!(
                    "complete_tool_call: frame {} vanished during the returning phase",
                    frame_id
                );
                None
            }
        };

        let frame = match completed {
            Some(frame) => frame,
            None => return false,
        };

        self.emit_status(StatusMessage::new(
            StatusKind::Summary,
            target_agent_id.clone(),
            Some(frame.caller_agent_id.clone()),
            summary,
            depth,
        ))
        .await;
        if let Some(observer) = &self.observer {
            observer.on_tool_call_complete(&frame).await;
        }

        // Let the bubble linger briefly, then take it down off-phase.
        if let Some(bubble_id) = bubble_id {
            let bubbles = Arc::clone(&self.bubbles);
            let linger = Duration::from_millis(self.config.bubble_linger_ms);
            tokio::spawn(async move {
                tokio::time::sleep(linger).await;
                bubbles.hide_thought_bubble(&bubble_id);
            });
        }

        true
    }

    /// Hard-stop all consultation bookkeeping.
    ///
    /// Synchronously clears the stack and every busy flag, hides all thought
    /// bubbles, and starts every agent walking back to its desk. Used when a
    /// conversation is abandoned mid-consultation; callers must discard any
    /// model responses that arrive afterwards
    /// ([`complete_tool_call`](Orchestrator::complete_tool_call) returns
    /// `false` for them).
    pub fn cancel(&self) {
        let cleared = {
            let mut session = self.session.lock().unwrap();
            let cleared = session.stack.len();
            session.stack.clear();
            session.busy.clear();
            cleared
        };
        if cleared > 0 {
            log::info!("cancelled {} in-flight consultation(s)", cleared);
        }

        self.bubbles.hide_all_thought_bubbles();
        for agent_id in self.positioning.agent_ids() {
            self.movement.begin_return_to_desk(&agent_id);
        }
    }

    async fn emit_status(&self, status: StatusMessage) {
        if let Some(observer) = &self.observer {
            observer.on_status_message(&status).await;
        }
    }

    fn set_frame_status(&self, frame_id: &str, status: FrameStatus) -> bool {
        let mut session = self.session.lock().unwrap();
        match session.stack.frame_mut(frame_id) {
            Some(frame) => {
                frame.status = status;
                true
            }
            None => false,
        }
    }
}

/// Hard-cap a response preview for bubbles and summaries, ellipsis-terminated.
fn truncate_summary(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(max_chars).collect();
    format!("{}…", head.trim_end())
}
