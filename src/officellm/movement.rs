//! Per-agent movement state machine.
//!
//! An [`OfficeAgent`] is always in exactly one [`MovementState`]. Every state
//! except `Walking` is stationary; `Walking` is only entered through
//! [`walk_to`](OfficeAgent::walk_to), which fetches a route from the space's
//! [`NavigationGrid`](crate::navigation::NavigationGrid) and is advanced by
//! the hosting space's tick loop. Arrival is exposed as a oneshot the
//! orchestrator can await to sequence its choreography phases.

use crate::officellm::navigation::{NavigationGrid, WorldPoint};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// The five movement states an agent can occupy.
///
/// All states except `Walking` zero the agent's velocity on entry. `Walking`
/// is never set directly — it is entered by [`OfficeAgent::walk_to`] and left
/// on arrival or when a stationary state is imposed externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementState {
    Idle,
    Working,
    Walking,
    Talking,
    Consulting,
}

/// One coworker sprite's movement bookkeeping.
///
/// The hosting space owns the agent for its whole lifetime; the orchestrator
/// only ever requests state transitions through the space.
pub struct OfficeAgent {
    id: String,
    position: WorldPoint,
    home_position: WorldPoint,
    state: MovementState,
    current_path: Vec<WorldPoint>,
    current_path_index: usize,
    returning_home: bool,
    collision_enabled: bool,
    walk_speed: f32,
    arrival_threshold: f32,
    arrival_tx: Option<oneshot::Sender<()>>,
}

impl OfficeAgent {
    /// Place a new agent at its desk. The desk location doubles as the
    /// starting position and the `home_position` used by
    /// [`return_to_desk`](OfficeAgent::return_to_desk).
    pub fn new(
        id: impl Into<String>,
        home: WorldPoint,
        walk_speed: f32,
        arrival_threshold: f32,
    ) -> Self {
        Self {
            id: id.into(),
            position: home,
            home_position: home,
            state: MovementState::Working,
            current_path: Vec::new(),
            current_path_index: 0,
            returning_home: false,
            collision_enabled: true,
            walk_speed,
            arrival_threshold,
            arrival_tx: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> WorldPoint {
        self.position
    }

    pub fn home_position(&self) -> WorldPoint {
        self.home_position
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    /// Whether the agent currently collides with static obstacles. Suspended
    /// while walking so the sprite can follow tile paths that thread through
    /// geometry the coarse physics collider would reject.
    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    /// Impose a stationary state from outside.
    ///
    /// `Walking` cannot be set this way and is ignored with a warning; it is
    /// only reachable through [`walk_to`](OfficeAgent::walk_to). Entering a
    /// stationary state cancels any in-flight walk (the pending arrival
    /// notifier is dropped) and restores collision.
    pub fn set_state(&mut self, state: MovementState) {
        if state == MovementState::Walking {
            log::warn!("agent {}: Walking can only be entered via walk_to", self.id);
            return;
        }
        self.current_path.clear();
        self.current_path_index = 0;
        self.returning_home = false;
        self.collision_enabled = true;
        self.arrival_tx = None;
        self.state = state;
    }

    /// Begin walking to a world coordinate.
    ///
    /// Fetches a route from `grid` when one is attached, otherwise walks a
    /// direct single-point path. A `walk_to` issued while already walking
    /// supersedes the old path — no queueing. The returned receiver resolves
    /// on arrival; it is dropped unresolved when the walk is superseded or a
    /// stationary state is imposed first.
    pub fn walk_to(
        &mut self,
        grid: Option<&NavigationGrid>,
        target_x: f32,
        target_y: f32,
    ) -> oneshot::Receiver<()> {
        let path = match grid {
            Some(grid) => grid.find_path(self.position.x, self.position.y, target_x, target_y),
            None => vec![WorldPoint::new(target_x, target_y)],
        };

        log::debug!(
            "agent {}: walking to ({:.1}, {:.1}) via {} waypoints",
            self.id,
            target_x,
            target_y,
            path.len()
        );

        let (tx, rx) = oneshot::channel();
        self.current_path = path;
        self.current_path_index = 0;
        self.returning_home = false;
        self.collision_enabled = false;
        self.arrival_tx = Some(tx);
        self.state = MovementState::Walking;
        rx
    }

    /// Walk back to the desk and resume `Working` on arrival.
    ///
    /// Sugar for [`walk_to`](OfficeAgent::walk_to) with the returning-home
    /// flag set: when the path runs out the agent snaps to its desk and the
    /// state machine restores `Working` instead of `Idle`.
    pub fn return_to_desk(&mut self, grid: Option<&NavigationGrid>) -> oneshot::Receiver<()> {
        let home = self.home_position;
        let rx = self.walk_to(grid, home.x, home.y);
        self.returning_home = true;
        rx
    }

    /// Advance path-following by `dt` seconds. No-op unless `Walking`.
    pub fn tick(&mut self, dt: f32) {
        if self.state != MovementState::Walking {
            return;
        }

        let mut budget = self.walk_speed * dt;
        while budget > 0.0 {
            let waypoint = match self.current_path.get(self.current_path_index) {
                Some(p) => *p,
                None => break,
            };

            let distance = self.position.distance_to(waypoint);
            if distance <= self.arrival_threshold {
                self.current_path_index += 1;
                continue;
            }

            let step = budget.min(distance);
            let inv = 1.0 / distance;
            self.position.x += (waypoint.x - self.position.x) * inv * step;
            self.position.y += (waypoint.y - self.position.y) * inv * step;
            budget -= step;
        }

        if self.current_path_index >= self.current_path.len() {
            self.arrive();
        }
    }

    /// Instantly place the agent at a world coordinate, cancelling any walk.
    pub fn teleport_to(&mut self, x: f32, y: f32) {
        self.position = WorldPoint::new(x, y);
        self.current_path.clear();
        self.current_path_index = 0;
        self.returning_home = false;
        self.collision_enabled = true;
        self.arrival_tx = None;
        if self.state == MovementState::Walking {
            self.state = MovementState::Idle;
        }
    }

    fn arrive(&mut self) {
        self.collision_enabled = true;
        if self.returning_home {
            // Snap exactly onto the desk; the path ends at a tile center,
            // which can be up to half a tile off.
            self.position = self.home_position;
            self.returning_home = false;
            self.state = MovementState::Working;
        } else {
            self.state = MovementState::Idle;
        }
        if let Some(tx) = self.arrival_tx.take() {
            // The receiver may already be gone (superseded awaits drop it);
            // that is not an error.
            let _ = tx.send(());
        }
        log::debug!("agent {}: arrived, now {:?}", self.id, self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticked_until_arrival(agent: &mut OfficeAgent) {
        for _ in 0..1_000 {
            agent.tick(0.1);
            if agent.state() != MovementState::Walking {
                return;
            }
        }
        panic!("agent never arrived");
    }

    #[test]
    fn test_direct_walk_without_grid_lands_idle() {
        let mut agent = OfficeAgent::new("gary", WorldPoint::new(0.0, 0.0), 100.0, 8.0);
        let _rx = agent.walk_to(None, 200.0, 0.0);
        assert_eq!(agent.state(), MovementState::Walking);
        assert!(!agent.collision_enabled());

        ticked_until_arrival(&mut agent);
        assert_eq!(agent.state(), MovementState::Idle);
        assert!(agent.collision_enabled());
        assert!(agent.position().distance_to(WorldPoint::new(200.0, 0.0)) <= 8.0);
    }

    #[test]
    fn test_return_to_desk_snaps_home_and_restores_working() {
        let mut agent = OfficeAgent::new("gary", WorldPoint::new(10.0, 10.0), 100.0, 8.0);
        let _rx = agent.walk_to(None, 150.0, 150.0);
        ticked_until_arrival(&mut agent);

        let _rx = agent.return_to_desk(None);
        ticked_until_arrival(&mut agent);
        assert_eq!(agent.state(), MovementState::Working);
        assert_eq!(agent.position(), WorldPoint::new(10.0, 10.0));
    }

    #[test]
    fn test_new_walk_supersedes_old_path() {
        let mut agent = OfficeAgent::new("gary", WorldPoint::new(0.0, 0.0), 50.0, 8.0);
        let _first = agent.walk_to(None, 500.0, 0.0);
        agent.tick(0.1);

        let _second = agent.walk_to(None, 0.0, 60.0);
        ticked_until_arrival(&mut agent);
        assert!(agent.position().distance_to(WorldPoint::new(0.0, 60.0)) <= 8.0);
    }

    #[test]
    fn test_set_state_cancels_walk_and_zeroes_motion() {
        let mut agent = OfficeAgent::new("gary", WorldPoint::new(0.0, 0.0), 50.0, 8.0);
        let _rx = agent.walk_to(None, 500.0, 0.0);
        agent.tick(0.1);
        let parked_at = agent.position();

        agent.set_state(MovementState::Talking);
        assert_eq!(agent.state(), MovementState::Talking);
        assert!(agent.collision_enabled());

        agent.tick(1.0);
        assert_eq!(agent.position(), parked_at);
    }

    #[test]
    fn test_walking_cannot_be_imposed_externally() {
        let mut agent = OfficeAgent::new("gary", WorldPoint::new(0.0, 0.0), 50.0, 8.0);
        agent.set_state(MovementState::Walking);
        assert_eq!(agent.state(), MovementState::Working);
    }
}
