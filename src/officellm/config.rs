//! Configuration for officellm.
//!
//! Provides the [`OfficeConfig`] struct holding the tuning constants shared
//! by the navigation, movement, and orchestration layers. Users construct
//! this manually — no file parsing dependencies are required.
//!
//! # Example
//!
//! ```rust
//! use officellm::OfficeConfig;
//!
//! // The defaults match the office simulation's shipped tuning.
//! let config = OfficeConfig::default();
//! assert_eq!(config.max_call_depth, 5);
//!
//! // Or override selectively
//! let config = OfficeConfig {
//!     max_call_depth: 2,
//!     ..OfficeConfig::default()
//! };
//! ```

/// Tuning constants for one office simulation.
///
/// This struct is intentionally minimal and users construct it however they
/// want. No TOML, YAML, or other config-file parsing dependencies are
/// introduced.
#[derive(Debug, Clone)]
pub struct OfficeConfig {
    /// Maximum nesting of agent-to-agent consultations. A tool call that
    /// would push a frame at this depth is rejected with a canned message.
    pub max_call_depth: usize,
    /// Side length of one navigation grid tile, in world units.
    pub tile_size: i32,
    /// Distance under which an agent is considered to have reached a
    /// waypoint or destination.
    pub arrival_threshold: f32,
    /// Walking speed in world units per second.
    pub walk_speed: f32,
    /// How long the truncated response summary stays on the thought bubble
    /// before the returning phase starts, so a human can read it.
    pub readable_delay_ms: u64,
    /// How long a completed consultation's bubble lingers before removal.
    pub bubble_linger_ms: u64,
    /// Hard cap on the bubble summary length, in characters, before the
    /// ellipsis is appended.
    pub summary_max_chars: usize,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 5,
            tile_size: 16,
            arrival_threshold: 8.0,
            walk_speed: 120.0,
            readable_delay_ms: 1_500,
            bubble_linger_ms: 400,
            summary_max_chars: 50,
        }
    }
}
