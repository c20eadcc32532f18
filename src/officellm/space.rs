//! One self-contained office instance.
//!
//! An [`OfficeSpace`] owns its navigation grid, furniture blocking, agent
//! roster, and the in-memory thought-bubble registry the renderer reads.
//! [`SharedOfficeSpace`] is the cloneable handle that implements the
//! orchestrator's backend contracts ([`PositioningBackend`],
//! [`MovementBackend`], [`ThoughtBubbleBackend`]) and exposes the tick loop
//! that advances walking agents.
//!
//! All shared state lives on one logical timeline — locks are held only for
//! short synchronous sections, never across an await.
//!
//! # Example
//!
//! ```rust
//! use officellm::space::SharedOfficeSpace;
//! use officellm::OfficeConfig;
//!
//! let space = SharedOfficeSpace::new(OfficeConfig::default());
//! space.install_grid(320.0, 320.0).unwrap();
//! space.wall_perimeter(16.0);
//! space.block_rect(160.0, 160.0, 48.0, 48.0); // the meeting table
//! space.add_agent("gary", 40.0, 40.0);
//! space.add_agent("dana", 280.0, 280.0);
//! ```

use crate::officellm::config::OfficeConfig;
use crate::officellm::movement::{MovementState, OfficeAgent};
use crate::officellm::navigation::{NavigationError, NavigationGrid, WorldPoint};
use crate::officellm::orchestrator::{MovementBackend, PositioningBackend, ThoughtBubbleBackend};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Error types for space-level agent operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceError {
    /// The referenced agent id is not in this space's roster.
    UnknownAgent(String),
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceError::UnknownAgent(id) => write!(f, "Unknown agent: {}", id),
        }
    }
}

impl Error for SpaceError {}

/// One visible "thinking" marker tied to an agent.
#[derive(Debug, Clone)]
pub struct ThoughtBubble {
    pub id: String,
    pub agent_id: String,
    pub content: Option<String>,
    pub depth: usize,
}

/// The office: grid, roster, bubbles. Owned state behind
/// [`SharedOfficeSpace`].
struct OfficeSpace {
    config: OfficeConfig,
    grid: Option<NavigationGrid>,
    agents: HashMap<String, OfficeAgent>,
    roster: Vec<String>,
    bubbles: HashMap<String, ThoughtBubble>,
}

/// Cloneable handle to one office space.
#[derive(Clone)]
pub struct SharedOfficeSpace {
    inner: Arc<RwLock<OfficeSpace>>,
}

impl SharedOfficeSpace {
    pub fn new(config: OfficeConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(OfficeSpace {
                config,
                grid: None,
                agents: HashMap::new(),
                roster: Vec::new(),
                bubbles: HashMap::new(),
            })),
        }
    }

    /// Build the space's navigation grid with the configured tile size.
    /// Replaces any previous grid; blocking is applied afterwards during
    /// scene construction and is permanent for the grid's lifetime.
    pub fn install_grid(&self, world_width: f32, world_height: f32) -> Result<(), NavigationError> {
        let mut space = self.inner.write().unwrap();
        let grid = NavigationGrid::new(world_width, world_height, space.config.tile_size)?;
        space.grid = Some(grid);
        Ok(())
    }

    /// Block the cells under a piece of furniture.
    pub fn block_rect(&self, center_x: f32, center_y: f32, width: f32, height: f32) {
        let mut space = self.inner.write().unwrap();
        if let Some(grid) = space.grid.as_mut() {
            grid.mark_blocked(center_x, center_y, width, height);
        }
    }

    /// Block the outer wall band.
    pub fn wall_perimeter(&self, thickness: f32) {
        let mut space = self.inner.write().unwrap();
        if let Some(grid) = space.grid.as_mut() {
            grid.mark_perimeter_walls(thickness);
        }
    }

    /// Place an agent at its desk. The desk position becomes the agent's
    /// home; placing an existing id again is ignored with a warning.
    pub fn add_agent(&self, agent_id: impl Into<String>, desk_x: f32, desk_y: f32) {
        let agent_id = agent_id.into();
        let mut space = self.inner.write().unwrap();
        if space.agents.contains_key(&agent_id) {
            log::warn!("agent {} is already placed in this space", agent_id);
            return;
        }
        let agent = OfficeAgent::new(
            agent_id.clone(),
            WorldPoint::new(desk_x, desk_y),
            space.config.walk_speed,
            space.config.arrival_threshold,
        );
        space.agents.insert(agent_id.clone(), agent);
        space.roster.push(agent_id);
    }

    /// Advance every walking agent by `dt` seconds.
    pub fn tick(&self, dt: f32) {
        let mut space = self.inner.write().unwrap();
        for agent in space.agents.values_mut() {
            agent.tick(dt);
        }
    }

    /// Spawn a background task ticking the space at a fixed period until the
    /// returned handle is aborted. Convenient for tests and headless runs;
    /// a real frontend calls [`tick`](SharedOfficeSpace::tick) from its
    /// render loop instead.
    pub fn spawn_ticker(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let space = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                space.tick(period.as_secs_f32());
            }
        })
    }

    /// Current movement state of an agent.
    pub fn agent_state(&self, agent_id: &str) -> Option<MovementState> {
        self.inner
            .read()
            .unwrap()
            .agents
            .get(agent_id)
            .map(|a| a.state())
    }

    /// Snapshot of the bubbles currently shown, for the render layer.
    pub fn bubbles(&self) -> Vec<ThoughtBubble> {
        self.inner.read().unwrap().bubbles.values().cloned().collect()
    }
}

impl PositioningBackend for SharedOfficeSpace {
    fn agent_position(&self, agent_id: &str) -> Option<WorldPoint> {
        self.inner
            .read()
            .unwrap()
            .agents
            .get(agent_id)
            .map(|a| a.position())
    }

    fn agent_ids(&self) -> Vec<String> {
        self.inner.read().unwrap().roster.clone()
    }
}

#[async_trait]
impl MovementBackend for SharedOfficeSpace {
    async fn walk_agent_to_agent(
        &self,
        walker_id: &str,
        target_id: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let arrival = {
            let mut space = self.inner.write().unwrap();
            let destination = space
                .agents
                .get(target_id)
                .map(|a| a.position())
                .ok_or_else(|| SpaceError::UnknownAgent(target_id.to_string()))?;

            let OfficeSpace { grid, agents, .. } = &mut *space;
            let walker = agents
                .get_mut(walker_id)
                .ok_or_else(|| SpaceError::UnknownAgent(walker_id.to_string()))?;
            walker.walk_to(grid.as_ref(), destination.x, destination.y)
        };

        // A superseded or cancelled walk drops the sender; treat that the
        // same as arrival so the choreography can proceed to teardown.
        if arrival.await.is_err() {
            log::debug!("walk of {} was superseded before arrival", walker_id);
        }
        Ok(())
    }

    fn teleport_agent_to_agent(
        &self,
        walker_id: &str,
        target_id: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut space = self.inner.write().unwrap();
        let destination = space
            .agents
            .get(target_id)
            .map(|a| a.position())
            .ok_or_else(|| SpaceError::UnknownAgent(target_id.to_string()))?;
        let walker = space
            .agents
            .get_mut(walker_id)
            .ok_or_else(|| SpaceError::UnknownAgent(walker_id.to_string()))?;
        walker.teleport_to(destination.x, destination.y);
        Ok(())
    }

    async fn return_agent_to_desk(
        &self,
        agent_id: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let arrival = {
            let mut space = self.inner.write().unwrap();
            let OfficeSpace { grid, agents, .. } = &mut *space;
            let agent = agents
                .get_mut(agent_id)
                .ok_or_else(|| SpaceError::UnknownAgent(agent_id.to_string()))?;
            agent.return_to_desk(grid.as_ref())
        };

        if arrival.await.is_err() {
            log::debug!("return of {} was superseded before arrival", agent_id);
        }
        Ok(())
    }

    fn begin_return_to_desk(&self, agent_id: &str) {
        let mut space = self.inner.write().unwrap();
        let OfficeSpace { grid, agents, .. } = &mut *space;
        if let Some(agent) = agents.get_mut(agent_id) {
            // Agents already at their desk and working stay put.
            if agent.state() == MovementState::Working {
                return;
            }
            let _ = agent.return_to_desk(grid.as_ref());
        }
    }

    fn set_agent_state(&self, agent_id: &str, state: MovementState) {
        let mut space = self.inner.write().unwrap();
        if let Some(agent) = space.agents.get_mut(agent_id) {
            agent.set_state(state);
        }
    }
}

impl ThoughtBubbleBackend for SharedOfficeSpace {
    fn show_thought_bubble(
        &self,
        bubble_id: &str,
        agent_id: &str,
        content: Option<&str>,
        depth: usize,
    ) {
        let mut space = self.inner.write().unwrap();
        space.bubbles.insert(
            bubble_id.to_string(),
            ThoughtBubble {
                id: bubble_id.to_string(),
                agent_id: agent_id.to_string(),
                content: content.map(|c| c.to_string()),
                depth,
            },
        );
    }

    fn update_thought_bubble(&self, bubble_id: &str, content: &str) {
        let mut space = self.inner.write().unwrap();
        if let Some(bubble) = space.bubbles.get_mut(bubble_id) {
            bubble.content = Some(content.to_string());
        }
    }

    fn hide_thought_bubble(&self, bubble_id: &str) {
        let mut space = self.inner.write().unwrap();
        space.bubbles.remove(bubble_id);
    }

    fn hide_all_thought_bubbles(&self) {
        let mut space = self.inner.write().unwrap();
        space.bubbles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::officellm::orchestrator::{
        MovementBackend, PositioningBackend, ThoughtBubbleBackend,
    };

    fn office() -> SharedOfficeSpace {
        let space = SharedOfficeSpace::new(OfficeConfig::default());
        space.install_grid(320.0, 320.0).unwrap();
        space.wall_perimeter(16.0);
        space.add_agent("gary", 48.0, 48.0);
        space.add_agent("dana", 272.0, 272.0);
        space
    }

    #[test]
    fn test_roster_order_is_placement_order() {
        let space = office();
        assert_eq!(space.agent_ids(), vec!["gary", "dana"]);
        assert!(space.agent_position("gary").is_some());
        assert!(space.agent_position("nobody").is_none());
    }

    #[test]
    fn test_teleport_places_walker_at_target() {
        let space = office();
        space.teleport_agent_to_agent("gary", "dana").unwrap();
        let gary = space.agent_position("gary").unwrap();
        let dana = space.agent_position("dana").unwrap();
        assert_eq!(gary, dana);

        let err = space.teleport_agent_to_agent("gary", "nobody").unwrap_err();
        assert!(err.to_string().contains("nobody"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_resolves_on_arrival() {
        let space = office();
        let ticker = space.spawn_ticker(Duration::from_millis(50));

        space.walk_agent_to_agent("gary", "dana").await.unwrap();
        ticker.abort();

        // Gary stops within the arrival threshold of the tile center nearest
        // Dana's desk, which itself sits within a tile of Dana.
        let gary = space.agent_position("gary").unwrap();
        let dana = space.agent_position("dana").unwrap();
        assert!(gary.distance_to(dana) <= 24.0);
        assert_eq!(space.agent_state("gary"), Some(MovementState::Idle));
    }

    #[test]
    fn test_bubble_registry_round_trip() {
        let space = office();
        space.show_thought_bubble("b1", "dana", Some("…"), 0);
        space.show_thought_bubble("b2", "gary", None, 1);
        assert_eq!(space.bubbles().len(), 2);

        space.update_thought_bubble("b1", "Q3 is up 4%");
        let bubbles = space.bubbles();
        let b1 = bubbles.iter().find(|b| b.id == "b1").unwrap();
        assert_eq!(b1.content.as_deref(), Some("Q3 is up 4%"));

        space.hide_thought_bubble("b2");
        assert_eq!(space.bubbles().len(), 1);
        space.hide_all_thought_bubbles();
        assert!(space.bubbles().is_empty());
    }
}
