//! Tile-grid pathfinding for one office space.
//!
//! Each space owns a [`NavigationGrid`]: a rectangular field of square tiles
//! where furniture and walls mark cells as blocked during scene construction,
//! after which the grid is read-only and [`find_path`](NavigationGrid::find_path)
//! computes world-coordinate walking routes over the walkable cells.
//!
//! **Key behaviors:**
//! - **8-connected A\***: diagonal steps are allowed, corner-cutting included,
//!   which reads naturally in an open office layout.
//! - **Nearest-walkable substitution**: an endpoint landing inside furniture is
//!   replaced by the closest walkable cell found by an expanding ring search.
//! - **No hard failure**: when two regions are disconnected, `find_path`
//!   degrades to a single-waypoint "just head there" path instead of erroring,
//!   so the movement layer never has to handle a missing route.
//!
//! ## Quickstart
//!
//! ```rust
//! use officellm::navigation::NavigationGrid;
//!
//! let mut grid = NavigationGrid::new(160.0, 160.0, 16).unwrap();
//! grid.mark_perimeter_walls(16.0);
//! grid.mark_blocked(80.0, 80.0, 32.0, 32.0); // a desk
//!
//! let path = grid.find_path(24.0, 24.0, 136.0, 136.0);
//! assert!(path.len() > 1);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::error::Error;
use std::fmt;

/// Maximum radius (in cells) of the expanding ring search used to substitute
/// a blocked endpoint with a nearby walkable cell.
const MAX_RING_RADIUS: i32 = 10;

/// Cost of a horizontal/vertical step, scaled x10 to keep A* costs integral.
const STRAIGHT_COST: u32 = 10;
/// Cost of a diagonal step (~10 * sqrt(2)).
const DIAGONAL_COST: u32 = 14;

/// A point in world coordinates (pixels/units, not grid cells).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
}

impl WorldPoint {
    /// Create a new world-space point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: WorldPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Error types for grid construction misuse.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationError {
    /// World dimensions or tile size were zero/negative.
    InvalidDimensions(String),
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::InvalidDimensions(msg) => {
                write!(f, "Invalid grid dimensions: {}", msg)
            }
        }
    }
}

impl Error for NavigationError {}

/// Occupancy grid for one office space.
///
/// Cells are either walkable or blocked. Blocking is monotonic: scene
/// construction only ever sets cells to blocked, there is no unblock
/// operation, and path queries never mutate the grid.
pub struct NavigationGrid {
    tile_size: i32,
    cols: i32,
    rows: i32,
    blocked: Vec<bool>,
}

impl NavigationGrid {
    /// Build an all-walkable grid covering a `world_width` x `world_height`
    /// area with square tiles of side `tile_size`.
    ///
    /// The grid spans `ceil(world_width / tile_size)` columns and
    /// `ceil(world_height / tile_size)` rows. Non-positive dimensions fail
    /// fast with [`NavigationError::InvalidDimensions`].
    pub fn new(
        world_width: f32,
        world_height: f32,
        tile_size: i32,
    ) -> Result<Self, NavigationError> {
        if tile_size <= 0 {
            return Err(NavigationError::InvalidDimensions(format!(
                "tile_size must be positive, got {}",
                tile_size
            )));
        }
        if world_width <= 0.0 || world_height <= 0.0 {
            return Err(NavigationError::InvalidDimensions(format!(
                "world size must be positive, got {}x{}",
                world_width, world_height
            )));
        }

        let cols = (world_width / tile_size as f32).ceil() as i32;
        let rows = (world_height / tile_size as f32).ceil() as i32;

        Ok(Self {
            tile_size,
            cols,
            rows,
            blocked: vec![false; (cols * rows) as usize],
        })
    }

    /// Side length of one tile in world units.
    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    /// Grid width in cells.
    pub fn cols(&self) -> i32 {
        self.cols
    }

    /// Grid height in cells.
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Mark every cell overlapping the world-space rectangle centered at
    /// `(center_x, center_y)` as blocked.
    ///
    /// Idempotent; only ever sets cells to blocked. A rectangle edge that
    /// exactly coincides with a tile boundary does not spill into the
    /// neighboring tile.
    pub fn mark_blocked(&mut self, center_x: f32, center_y: f32, width: f32, height: f32) {
        let t = self.tile_size as f32;
        let left = center_x - width / 2.0;
        let right = center_x + width / 2.0;
        let top = center_y - height / 2.0;
        let bottom = center_y + height / 2.0;

        let first_col = (left / t).floor() as i32;
        let mut last_col = (right / t).ceil() as i32 - 1;
        let first_row = (top / t).floor() as i32;
        let mut last_row = (bottom / t).ceil() as i32 - 1;

        // Degenerate (zero-size) rectangles still block the containing cell.
        if last_col < first_col {
            last_col = first_col;
        }
        if last_row < first_row {
            last_row = first_row;
        }

        for row in first_row.max(0)..=last_row.min(self.rows - 1) {
            for col in first_col.max(0)..=last_col.min(self.cols - 1) {
                self.blocked[(row * self.cols + col) as usize] = true;
            }
        }
    }

    /// Block a border band `ceil(thickness / tile_size)` cells deep on all
    /// four sides of the grid.
    pub fn mark_perimeter_walls(&mut self, thickness: f32) {
        let depth = ((thickness / self.tile_size as f32).ceil() as i32)
            .min(self.cols)
            .min(self.rows);

        for row in 0..self.rows {
            for col in 0..self.cols {
                let on_band = row < depth
                    || row >= self.rows - depth
                    || col < depth
                    || col >= self.cols - depth;
                if on_band {
                    self.blocked[(row * self.cols + col) as usize] = true;
                }
            }
        }
    }

    /// Whether the cell at `(col, row)` is inside the grid and walkable.
    pub fn is_walkable(&self, col: i32, row: i32) -> bool {
        self.in_bounds(col, row) && !self.blocked[(row * self.cols + col) as usize]
    }

    /// Compute a walkable path between two world coordinates.
    ///
    /// Both endpoints are converted to grid cells and clamped in-bounds. A
    /// blocked endpoint is substituted with the nearest walkable cell found
    /// by an expanding ring search (radius 1..=10, first hit wins, rings
    /// scanned y-ascending then x-ascending). The returned waypoints are the
    /// world-space centers of the cells along an 8-connected A* route.
    ///
    /// When no route exists, the result is a single waypoint equal to the
    /// *requested* destination — "just try to get there directly" — so the
    /// caller's state machine never sees a failure.
    pub fn find_path(&self, start_x: f32, start_y: f32, end_x: f32, end_y: f32) -> Vec<WorldPoint> {
        let mut start = self.world_to_cell(start_x, start_y);
        let mut end = self.world_to_cell(end_x, end_y);

        if !self.is_walkable(start.0, start.1) {
            start = self.nearest_walkable(start);
        }
        if !self.is_walkable(end.0, end.1) {
            end = self.nearest_walkable(end);
        }

        if start == end {
            return vec![self.cell_center(end.0, end.1)];
        }

        match self.astar(start, end) {
            Some(cells) => cells
                .into_iter()
                .map(|(col, row)| self.cell_center(col, row))
                .collect(),
            None => {
                log::debug!(
                    "no route from {:?} to {:?}; falling back to direct waypoint",
                    start,
                    end
                );
                vec![WorldPoint::new(end_x, end_y)]
            }
        }
    }

    /// World-space center of the cell at `(col, row)`.
    pub fn cell_center(&self, col: i32, row: i32) -> WorldPoint {
        let t = self.tile_size as f32;
        WorldPoint::new((col as f32 + 0.5) * t, (row as f32 + 0.5) * t)
    }

    /// Convert a world coordinate to a grid cell, clamped in-bounds.
    pub fn world_to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        let t = self.tile_size as f32;
        let col = ((x / t).floor() as i32).max(0).min(self.cols - 1);
        let row = ((y / t).floor() as i32).max(0).min(self.rows - 1);
        (col, row)
    }

    fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && col < self.cols && row >= 0 && row < self.rows
    }

    /// Expanding ring search for the nearest walkable cell.
    ///
    /// Scans square rings of increasing radius; within each ring, rows are
    /// visited top-to-bottom and columns left-to-right, and the first
    /// walkable cell wins. The tie-break is scan order, not true distance.
    /// Returns the original cell when nothing walkable is found within
    /// `MAX_RING_RADIUS`.
    fn nearest_walkable(&self, cell: (i32, i32)) -> (i32, i32) {
        let (col, row) = cell;
        for radius in 1..=MAX_RING_RADIUS {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs().max(dy.abs()) != radius {
                        continue;
                    }
                    let (nc, nr) = (col + dx, row + dy);
                    if self.is_walkable(nc, nr) {
                        return (nc, nr);
                    }
                }
            }
        }
        cell
    }

    /// Shortest path over 8-connected walkable cells, start and end included.
    fn astar(&self, start: (i32, i32), end: (i32, i32)) -> Option<Vec<(i32, i32)>> {
        if !self.is_walkable(start.0, start.1) || !self.is_walkable(end.0, end.1) {
            return None;
        }

        let total = (self.cols * self.rows) as usize;
        let start_idx = (start.1 * self.cols + start.0) as usize;
        let end_idx = (end.1 * self.cols + end.0) as usize;

        let mut g_score = vec![u32::MAX; total];
        let mut came_from: Vec<usize> = vec![usize::MAX; total];
        let mut open = BinaryHeap::new();

        g_score[start_idx] = 0;
        open.push(OpenNode {
            f: octile(start, end),
            index: start_idx,
        });

        const NEIGHBORS: [(i32, i32); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];

        while let Some(OpenNode { f, index }) = open.pop() {
            if index == end_idx {
                return Some(self.reconstruct(&came_from, start_idx, end_idx));
            }
            // Stale heap entry for a cell we already reached more cheaply.
            if f > g_score[index].saturating_add(octile(self.index_to_cell(index), end)) {
                continue;
            }

            let here = self.index_to_cell(index);
            for &(dx, dy) in NEIGHBORS.iter() {
                let (nc, nr) = (here.0 + dx, here.1 + dy);
                if !self.is_walkable(nc, nr) {
                    continue;
                }
                let step = if dx != 0 && dy != 0 {
                    DIAGONAL_COST
                } else {
                    STRAIGHT_COST
                };
                let neighbor_idx = (nr * self.cols + nc) as usize;
                let tentative = g_score[index].saturating_add(step);
                if tentative < g_score[neighbor_idx] {
                    g_score[neighbor_idx] = tentative;
                    came_from[neighbor_idx] = index;
                    open.push(OpenNode {
                        f: tentative + octile((nc, nr), end),
                        index: neighbor_idx,
                    });
                }
            }
        }

        None
    }

    fn index_to_cell(&self, index: usize) -> (i32, i32) {
        let index = index as i32;
        (index % self.cols, index / self.cols)
    }

    fn reconstruct(&self, came_from: &[usize], start_idx: usize, end_idx: usize) -> Vec<(i32, i32)> {
        let mut cells = Vec::new();
        let mut cursor = end_idx;
        loop {
            cells.push(self.index_to_cell(cursor));
            if cursor == start_idx {
                break;
            }
            cursor = came_from[cursor];
        }
        cells.reverse();
        cells
    }
}

/// Octile-distance heuristic matching the 10/14 step costs; admissible for
/// 8-connected movement.
fn octile(a: (i32, i32), b: (i32, i32)) -> u32 {
    let dx = (a.0 - b.0).abs() as u32;
    let dy = (a.1 - b.1).abs() as u32;
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST * lo + STRAIGHT_COST * (hi - lo)
}

/// Min-heap entry for the A* open set.
#[derive(Copy, Clone, Eq, PartialEq)]
struct OpenNode {
    f: u32,
    index: usize,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the lowest f first.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dimensions_round_up() {
        let grid = NavigationGrid::new(100.0, 50.0, 16).unwrap();
        assert_eq!(grid.cols(), 7); // ceil(100/16)
        assert_eq!(grid.rows(), 4); // ceil(50/16)
    }

    #[test]
    fn test_invalid_dimensions_fail_fast() {
        assert!(NavigationGrid::new(100.0, 100.0, 0).is_err());
        assert!(NavigationGrid::new(100.0, 100.0, -4).is_err());
        assert!(NavigationGrid::new(0.0, 100.0, 16).is_err());
    }

    #[test]
    fn test_mark_blocked_is_idempotent_and_monotonic() {
        let mut grid = NavigationGrid::new(160.0, 160.0, 16).unwrap();
        grid.mark_blocked(80.0, 80.0, 32.0, 32.0);
        assert!(!grid.is_walkable(4, 4));
        assert!(!grid.is_walkable(5, 5));
        // Rect spans world [64, 96]; cell 6 starts at 96 and stays clear.
        assert!(grid.is_walkable(6, 4));

        grid.mark_blocked(80.0, 80.0, 32.0, 32.0);
        assert!(!grid.is_walkable(4, 4));
    }

    #[test]
    fn test_perimeter_walls_block_border_band() {
        let mut grid = NavigationGrid::new(160.0, 160.0, 16).unwrap();
        grid.mark_perimeter_walls(16.0);
        assert!(!grid.is_walkable(0, 0));
        assert!(!grid.is_walkable(9, 9));
        assert!(!grid.is_walkable(5, 0));
        assert!(!grid.is_walkable(0, 5));
        assert!(grid.is_walkable(5, 5));
    }

    #[test]
    fn test_nearest_walkable_scan_order() {
        let mut grid = NavigationGrid::new(160.0, 160.0, 16).unwrap();
        // Block the center cell; its whole radius-1 ring stays open, so the
        // scan-order winner is the top-left ring cell (y ascending, then x).
        grid.mark_blocked(88.0, 88.0, 16.0, 16.0);
        assert_eq!(grid.nearest_walkable((5, 5)), (4, 4));
    }

    #[test]
    fn test_path_waypoints_are_adjacent_cells() {
        let mut grid = NavigationGrid::new(160.0, 160.0, 16).unwrap();
        grid.mark_blocked(80.0, 80.0, 32.0, 32.0);

        let path = grid.find_path(8.0, 8.0, 152.0, 152.0);
        assert!(path.len() > 1);
        for pair in path.windows(2) {
            let a = grid.world_to_cell(pair[0].x, pair[0].y);
            let b = grid.world_to_cell(pair[1].x, pair[1].y);
            assert!((a.0 - b.0).abs() <= 1 && (a.1 - b.1).abs() <= 1);
            assert_ne!(a, b);
        }
        // The route never crosses a blocked cell.
        for p in &path {
            let (c, r) = grid.world_to_cell(p.x, p.y);
            assert!(grid.is_walkable(c, r));
        }
    }

    #[test]
    fn test_disconnected_regions_fall_back_to_direct_waypoint() {
        let mut grid = NavigationGrid::new(160.0, 160.0, 16).unwrap();
        // A full-height wall splits the space in two.
        grid.mark_blocked(80.0, 80.0, 32.0, 160.0);

        let path = grid.find_path(8.0, 8.0, 152.0, 152.0);
        assert_eq!(path.len(), 1);
        assert_eq!(path[0], WorldPoint::new(152.0, 152.0));
    }
}
