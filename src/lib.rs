//! # officellm
//!
//! officellm is the choreography core for a 2D office of LLM-personality
//! coworkers: when one agent's model decides to consult a teammate — a
//! recursive tool call — this crate makes the game world act it out while
//! keeping the recursion structurally safe.
//!
//! The crate provides carefully layered abstractions for:
//!
//! * **Grid Pathfinding**: [`navigation::NavigationGrid`] keeps a per-space
//!   occupancy grid, blocks furniture rectangles and perimeter walls, and
//!   answers 8-connected shortest-path queries with a nearest-walkable
//!   fallback instead of hard failures
//! * **Agent Movement**: [`movement::OfficeAgent`] is a tick-driven state
//!   machine (idle/working/walking/talking/consulting) with awaitable
//!   arrivals and return-to-desk behavior
//! * **Recursion Guarding**: [`call_stack::ConsultationStack`] records every
//!   in-flight consultation as an explicit frame, enforcing the depth bound
//!   and the cycle rule by identity, not by the language call stack
//! * **Choreography**: [`Orchestrator`] drives the walk → think → return
//!   phases per consultation, serialized per target agent by a busy flag,
//!   and reports progress through [`event::ConsultationObserver`]
//! * **Stream Demultiplexing**: [`stream_mux::StreamMultiplexer`] splits the
//!   backend's interleaved text/tool-event byte stream back into narrative
//!   prose and ordered structured events, tolerating arbitrary chunk splits
//!
//! ## Core Concepts
//!
//! ### The office space
//!
//! One [`space::SharedOfficeSpace`] is one office instance: its grid, its
//! furniture, its roster of coworkers. It implements the backend contracts
//! the orchestrator consumes, so wiring a simulation is a handful of lines:
//!
//! ```rust
//! use std::sync::Arc;
//! use officellm::space::SharedOfficeSpace;
//! use officellm::{OfficeConfig, Orchestrator};
//!
//! let space = SharedOfficeSpace::new(OfficeConfig::default());
//! space.install_grid(640.0, 480.0).unwrap();
//! space.wall_perimeter(16.0);
//! space.block_rect(320.0, 240.0, 64.0, 48.0);
//! space.add_agent("gary", 80.0, 96.0);
//! space.add_agent("dana", 560.0, 96.0);
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(space.clone()),
//!     Arc::new(space.clone()),
//!     Arc::new(space),
//!     OfficeConfig::default(),
//! );
//! ```
//!
//! ### Consultations
//!
//! [`Orchestrator::handle_tool_call`] guards and begins one consultation:
//! the target walks to the caller and starts "thinking" under a bubble.
//! The nested model round-trip happens outside the crate; once the answer
//! is known, [`Orchestrator::complete_tool_call`] shows a truncated summary
//! and sends the colleague home. Depth, cycle, and busy rejections come
//! back as in-character text, never as errors.
//!
//! ### Driving a conversation
//!
//! [`ConversationSession::run_stream`] consumes the backend's streamed
//! response end to end: narrative chunks accumulate into a transcript,
//! embedded tool events drive the orchestrator, and any termination —
//! success or failure — tears the session down deterministically.
//!
//! Continue exploring the modules re-exported from the crate root for
//! progressively richer interaction patterns.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// The helper is intentionally lightweight so that applications embedding
/// officellm can opt-in to simple `RUST_LOG` driven diagnostics without
/// having to choose a specific logging backend upfront.
///
/// ```rust
/// officellm::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `officellm` module.
pub mod officellm;

// Re-exporting key items for easier external access.
pub use officellm::call_stack;
pub use officellm::call_stack::{ConsultationStack, FrameStatus, ToolCallFrame};
pub use officellm::config::OfficeConfig;
pub use officellm::event;
pub use officellm::event::{ConsultationObserver, StatusKind, StatusMessage};
pub use officellm::movement;
pub use officellm::movement::{MovementState, OfficeAgent};
pub use officellm::navigation;
pub use officellm::navigation::{NavigationGrid, WorldPoint};
pub use officellm::orchestrator;
pub use officellm::orchestrator::{
    MovementBackend, Orchestrator, PositioningBackend, ThoughtBubbleBackend, ToolCallOutcome,
};
pub use officellm::session::ConversationSession;
pub use officellm::space;
pub use officellm::space::SharedOfficeSpace;
pub use officellm::stream_mux;
pub use officellm::stream_mux::{ParsedChunk, StreamMultiplexer, ToolEvent, ToolEventKind};
