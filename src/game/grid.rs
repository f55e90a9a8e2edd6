//! Grid geometry, L∞ path costs and straight-line hunter motion.
//!
//! Hunters move at most one tile per block in any of the eight directions,
//! so the time a path takes is its Chebyshev (L∞) length. Motion follows the
//! straight line between the position the hunter last turned at (`from`) and
//! the next waypoint; the minor axis is interpolated with half-up rounding.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use crate::error::EngineError;

/// A tile coordinate.
///
/// Ordered row-major (`y` first, then `x`) so that every ordered container
/// keyed by coordinates iterates identically on all nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Chebyshev distance: the number of blocks a hunter needs between two tiles.
#[must_use]
pub const fn dist_linf(a: Coord, b: Coord) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    if dx > dy { dx } else { dy }
}

/// Total L∞ cost of walking `waypoints` in order, starting at `start`.
///
/// An empty path costs nothing.
#[must_use]
pub fn path_cost(start: Coord, waypoints: &[Coord]) -> u64 {
    let mut last = start;
    let mut total = 0u64;
    for &wp in waypoints {
        total += u64::from(dist_linf(last, wp));
        last = wp;
    }
    total
}

/// Rectangular game board with the spawn strips along its corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    spawn_area_length: i32,
}

impl Grid {
    /// Create a grid.
    ///
    /// Returns `None` if a dimension is not positive or the spawn strips of
    /// two corners would overlap.
    #[must_use]
    pub fn new(width: i32, height: i32, spawn_area_length: i32) -> Option<Self> {
        if width <= 0 || height <= 0 || spawn_area_length <= 0 {
            return None;
        }
        if 2 * spawn_area_length > width || 2 * spawn_area_length > height {
            return None;
        }
        Some(Self {
            width,
            height,
            spawn_area_length,
        })
    }

    /// Grid width.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Check whether a coordinate lies on the grid.
    #[must_use]
    pub const fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    /// Check whether a coordinate lies on one of the four corner spawn strips.
    #[must_use]
    pub const fn is_spawn_strip(&self, c: Coord) -> bool {
        if !self.in_bounds(c) {
            return false;
        }
        let len = self.spawn_area_length;
        let on_vertical_edge = (c.x == 0 || c.x == self.width - 1)
            && (c.y < len || c.y >= self.height - len);
        let on_horizontal_edge = (c.y == 0 || c.y == self.height - 1)
            && (c.x < len || c.x >= self.width - len);
        on_vertical_edge || on_horizontal_edge
    }

    /// The spawn strip of a colour's corner.
    ///
    /// Colour 0 is the top-left corner, then clockwise. Tiles are listed in a
    /// fixed order so a random index picks the same tile on every node.
    #[must_use]
    pub fn spawn_strip(&self, color: u8) -> Vec<Coord> {
        let len = self.spawn_area_length;
        let mut tiles = Vec::with_capacity(usize::try_from(2 * len - 1).unwrap_or(0));
        for i in 0..len {
            tiles.push((i, 0));
        }
        for j in 1..len {
            tiles.push((0, j));
        }
        let (w, h) = (self.width - 1, self.height - 1);
        tiles
            .into_iter()
            .map(|(x, y)| match color % 4 {
                0 => Coord::new(x, y),
                1 => Coord::new(w - x, y),
                2 => Coord::new(w - x, h - y),
                _ => Coord::new(x, h - y),
            })
            .collect()
    }

    /// All spawn strip tiles of all four corners, in coordinate order.
    #[must_use]
    pub fn all_spawn_tiles(&self) -> Vec<Coord> {
        let mut tiles: Vec<Coord> = (0..4u8).flat_map(|c| self.spawn_strip(c)).collect();
        tiles.sort_unstable();
        tiles.dedup();
        tiles
    }

    /// Move a coordinate one tile off the spawn strip, towards the interior.
    ///
    /// Coordinates not on a strip are returned unchanged.
    #[must_use]
    pub const fn push_out_of_spawn(&self, c: Coord) -> Coord {
        if !self.is_spawn_strip(c) {
            return c;
        }
        let dx = if c.x == 0 {
            1
        } else if c.x == self.width - 1 {
            -1
        } else {
            0
        };
        let dy = if c.x != 0 && c.x != self.width - 1 {
            if c.y == 0 { 1 } else { -1 }
        } else if c.y == 0 {
            1
        } else if c.y == self.height - 1 {
            -1
        } else {
            0
        };
        Coord::new(c.x + dx, c.y + dy)
    }

    /// Find a waypoint sequence from `start` to `goal` with minimal L∞ cost.
    ///
    /// The path takes the diagonal leg first and the straight leg second, so
    /// its cost equals `dist_linf(start, goal)`. Returns an empty sequence if
    /// the hunter is already there.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] if either end is off the grid.
    pub fn find_path(&self, start: Coord, goal: Coord) -> Result<Vec<Coord>, EngineError> {
        for c in [start, goal] {
            if !self.in_bounds(c) {
                return Err(EngineError::InvalidTransition {
                    player: String::new(),
                    reason: format!("{c} is outside the {}x{} grid", self.width, self.height),
                });
            }
        }
        if start == goal {
            return Ok(Vec::new());
        }

        let dx = goal.x - start.x;
        let dy = goal.y - start.y;
        let diagonal = dx.abs().min(dy.abs());
        let corner = Coord::new(start.x + dx.signum() * diagonal, start.y + dy.signum() * diagonal);

        let mut path = Vec::with_capacity(2);
        if corner != start && corner != goal {
            path.push(corner);
        }
        path.push(goal);
        Ok(path)
    }
}

/// Position and outstanding path of a hunter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Motion {
    /// Current tile.
    pub pos: Coord,
    /// Tile the current straight segment started at.
    pub from: Coord,
    /// Remaining waypoints, next one first. Empty when idle.
    pub waypoints: VecDeque<Coord>,
}

impl Motion {
    /// An idle hunter standing at `pos`.
    #[must_use]
    pub fn at(pos: Coord) -> Self {
        Self {
            pos,
            from: pos,
            waypoints: VecDeque::new(),
        }
    }

    /// Whether the hunter has no outstanding waypoints.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Replace the path.
    ///
    /// The straight segment restarts at the current tile unless the next
    /// waypoint stays the same.
    pub fn set_waypoints(&mut self, waypoints: impl IntoIterator<Item = Coord>) {
        let waypoints: VecDeque<Coord> = waypoints.into_iter().collect();
        if waypoints.is_empty() || self.waypoints.front() != waypoints.front() {
            self.from = self.pos;
        }
        self.waypoints = waypoints;
    }

    /// Stop at the current tile.
    pub fn stop(&mut self) {
        self.from = self.pos;
        self.waypoints.clear();
    }

    /// Blocks needed to finish the outstanding path.
    #[must_use]
    pub fn time_to_destination(&self) -> u64 {
        let mut total = 0u64;
        let mut last = self.pos;
        for &wp in &self.waypoints {
            total += u64::from(dist_linf(last, wp));
            last = wp;
        }
        total
    }

    /// Advance one tile towards the next waypoint.
    pub fn step(&mut self) {
        self.drop_reached();
        let Some(&target) = self.waypoints.front() else {
            self.from = self.pos;
            return;
        };

        let dx = target.x - self.from.x;
        let dy = target.y - self.from.y;
        let next = if dx.abs() > dy.abs() {
            let x = step_axis(self.pos.x, target.x);
            Coord::new(x, interpolate(x, self.pos.y, dx, dy, self.from.x, self.from.y))
        } else {
            let y = step_axis(self.pos.y, target.y);
            Coord::new(interpolate(y, self.pos.x, dy, dx, self.from.y, self.from.x), y)
        };

        self.pos = next;
        if self.pos == target {
            self.drop_reached();
        }
    }

    /// Every tile the hunter will stand on until it is idle, starting with
    /// the current one.
    #[must_use]
    pub fn trace(&self) -> Vec<Coord> {
        let mut tmp = self.clone();
        let mut tiles = vec![tmp.pos];
        while !tmp.is_idle() {
            tmp.step();
            if tiles.last() != Some(&tmp.pos) {
                tiles.push(tmp.pos);
            }
        }
        tiles
    }

    fn drop_reached(&mut self) {
        if self.waypoints.front() == Some(&self.pos) {
            self.from = self.pos;
            while self.waypoints.front() == Some(&self.pos) {
                self.waypoints.pop_front();
            }
        }
    }
}

const fn step_axis(v: i32, target: i32) -> i32 {
    if v < target {
        v + 1
    } else if v > target {
        v - 1
    } else {
        v
    }
}

/// Minor-axis coordinate on the line from `from` with slope `dv / du`,
/// rounded half away from zero.
const fn interpolate(u: i32, v: i32, du: i32, dv: i32, from_u: i32, from_v: i32) -> i32 {
    if dv == 0 {
        return v;
    }
    let tmp = (u - from_u) * dv;
    let mut res = (tmp.abs() + du.abs() / 2) / du.abs();
    if (tmp < 0) != (du < 0) {
        res = -res;
    }
    res + from_v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(100, 80, 15).unwrap()
    }

    #[test]
    fn test_dist_linf() {
        assert_eq!(dist_linf(Coord::new(0, 0), Coord::new(3, -7)), 7);
        assert_eq!(dist_linf(Coord::new(5, 5), Coord::new(5, 5)), 0);
    }

    #[test]
    fn test_path_cost_sums_segments() {
        let start = Coord::new(0, 0);
        assert_eq!(path_cost(start, &[]), 0);
        let path = [Coord::new(3, 1), Coord::new(3, 10), Coord::new(0, 0)];
        assert_eq!(path_cost(start, &path), 3 + 9 + 10);
    }

    #[test]
    fn test_coord_ordering_is_row_major() {
        let mut cs = vec![Coord::new(5, 1), Coord::new(0, 2), Coord::new(9, 0)];
        cs.sort();
        assert_eq!(cs, vec![Coord::new(9, 0), Coord::new(5, 1), Coord::new(0, 2)]);
    }

    #[test]
    fn test_find_path_cost_is_optimal() {
        let g = grid();
        let start = Coord::new(2, 3);
        for goal in [Coord::new(2, 3), Coord::new(10, 3), Coord::new(10, 30), Coord::new(0, 0)] {
            let path = g.find_path(start, goal).unwrap();
            assert_eq!(path_cost(start, &path), u64::from(dist_linf(start, goal)));
            assert_eq!(path.last().copied().unwrap_or(start), goal);
        }
        assert!(g.find_path(start, start).unwrap().is_empty());
    }

    #[test]
    fn test_find_path_out_of_bounds() {
        let g = grid();
        assert!(matches!(
            g.find_path(Coord::new(0, 0), Coord::new(100, 0)),
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_motion_reaches_goal_in_linf_time() {
        let mut m = Motion::at(Coord::new(0, 0));
        m.set_waypoints([Coord::new(7, 3)]);
        assert_eq!(m.time_to_destination(), 7);
        for _ in 0..7 {
            m.step();
        }
        assert_eq!(m.pos, Coord::new(7, 3));
        assert!(m.is_idle());
    }

    #[test]
    fn test_motion_straight_line_rounding() {
        let mut m = Motion::at(Coord::new(0, 0));
        m.set_waypoints([Coord::new(4, 2)]);
        let trace = m.trace();
        assert_eq!(
            trace,
            vec![
                Coord::new(0, 0),
                Coord::new(1, 1),
                Coord::new(2, 1),
                Coord::new(3, 2),
                Coord::new(4, 2),
            ]
        );
    }

    #[test]
    fn test_motion_skips_duplicate_waypoints() {
        let mut m = Motion::at(Coord::new(0, 0));
        m.set_waypoints([Coord::new(0, 0), Coord::new(0, 2), Coord::new(0, 2)]);
        m.step();
        m.step();
        assert_eq!(m.pos, Coord::new(0, 2));
        assert!(m.is_idle());
    }

    #[test]
    fn test_trace_length_matches_time() {
        let mut m = Motion::at(Coord::new(10, 10));
        m.set_waypoints([Coord::new(20, 14), Coord::new(3, 0)]);
        let trace = m.trace();
        assert_eq!(trace.len() as u64 - 1, m.time_to_destination());
    }

    #[test]
    fn test_spawn_strips() {
        let g = grid();
        let strip = g.spawn_strip(0);
        assert_eq!(strip.len(), 29);
        assert!(strip.contains(&Coord::new(0, 0)));
        assert!(strip.iter().all(|&c| g.is_spawn_strip(c)));
        assert!(g.spawn_strip(2).contains(&Coord::new(99, 79)));
        assert_eq!(g.all_spawn_tiles().len(), 4 * 29);
        assert!(!g.is_spawn_strip(Coord::new(1, 1)));
        assert!(!g.is_spawn_strip(Coord::new(0, 15)));
    }

    #[test]
    fn test_push_out_of_spawn() {
        let g = grid();
        assert_eq!(g.push_out_of_spawn(Coord::new(0, 0)), Coord::new(1, 1));
        assert_eq!(g.push_out_of_spawn(Coord::new(5, 0)), Coord::new(5, 1));
        assert_eq!(g.push_out_of_spawn(Coord::new(99, 3)), Coord::new(98, 3));
        assert_eq!(g.push_out_of_spawn(Coord::new(40, 40)), Coord::new(40, 40));
        assert!(!g.is_spawn_strip(g.push_out_of_spawn(Coord::new(0, 79))));
    }

    #[test]
    fn test_grid_rejects_overlapping_strips() {
        assert!(Grid::new(20, 20, 11).is_none());
        assert!(Grid::new(0, 20, 1).is_none());
    }
}
