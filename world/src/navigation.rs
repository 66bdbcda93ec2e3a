//! Breadth-first reachability and path search over the battle grid.
//!
//! A tile is passable when it lies on the grid and holds no unit. Every step
//! costs one, and neighbors are always scanned north, east, south, west, so
//! results are deterministic for a fixed occupancy snapshot.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tactics_core::{OccupancyView, TileCoord};

/// Destination of a path search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathGoal {
    /// The path must end on the tile itself, which therefore has to be free.
    Tile(TileCoord),
    /// The tile is held by a unit; the path ends on any free tile orthogonally
    /// adjacent to it.
    ///
    /// When several adjacent tiles are equally close, the first one discovered
    /// by the breadth-first expansion wins.
    AdjacentTo(TileCoord),
}

impl PathGoal {
    fn anchor(self) -> TileCoord {
        match self {
            Self::Tile(tile) | Self::AdjacentTo(tile) => tile,
        }
    }

    fn is_reached_at(self, tile: TileCoord) -> bool {
        match self {
            Self::Tile(target) => tile == target,
            Self::AdjacentTo(target) => tile.manhattan_distance(target) == 1,
        }
    }
}

/// Read-only navigator bound to an occupancy snapshot.
#[derive(Clone, Copy, Debug)]
pub struct Navigator<'a> {
    occupancy: OccupancyView<'a>,
}

impl<'a> Navigator<'a> {
    /// Binds a navigator to the provided occupancy snapshot.
    #[must_use]
    pub fn new(occupancy: OccupancyView<'a>) -> Self {
        Self { occupancy }
    }

    /// Collects every tile reachable from `origin` within `max_distance` steps.
    ///
    /// The origin itself is never part of the result.
    ///
    /// # Panics
    ///
    /// Panics when `origin` lies outside the grid.
    #[must_use]
    pub fn reachable(&self, origin: TileCoord, max_distance: u32) -> BTreeSet<TileCoord> {
        assert!(
            self.occupancy.in_bounds(origin),
            "reachability origin {origin:?} lies outside the grid"
        );

        let mut visited = BTreeSet::new();
        let _ = visited.insert(origin);
        let mut queue = VecDeque::new();
        queue.push_back((origin, 0_u32));

        while let Some((tile, depth)) = queue.pop_front() {
            if depth >= max_distance {
                continue;
            }

            for neighbor in tile.neighbors() {
                if !self.occupancy.is_free(neighbor) {
                    continue;
                }
                if !visited.insert(neighbor) {
                    continue;
                }
                queue.push_back((neighbor, depth + 1));
            }
        }

        let _ = visited.remove(&origin);
        visited
    }

    /// Finds a shortest path from `from` toward `goal` no longer than `max_distance`.
    ///
    /// The returned path excludes `from` and ends on the destination tile. An
    /// empty path means `from` already satisfies the goal. Returns `None` when no
    /// qualifying path fits the budget.
    ///
    /// # Panics
    ///
    /// Panics when `from` or the goal tile lies outside the grid.
    #[must_use]
    pub fn path(
        &self,
        from: TileCoord,
        goal: PathGoal,
        max_distance: u32,
    ) -> Option<Vec<TileCoord>> {
        assert!(
            self.occupancy.in_bounds(from),
            "path origin {from:?} lies outside the grid"
        );
        assert!(
            self.occupancy.in_bounds(goal.anchor()),
            "path target {:?} lies outside the grid",
            goal.anchor()
        );

        if goal.is_reached_at(from) {
            return Some(Vec::new());
        }

        let mut parents: BTreeMap<TileCoord, TileCoord> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back((from, 0_u32));

        while let Some((tile, depth)) = queue.pop_front() {
            if depth >= max_distance {
                continue;
            }

            for neighbor in tile.neighbors() {
                if neighbor == from || parents.contains_key(&neighbor) {
                    continue;
                }
                if !self.occupancy.is_free(neighbor) {
                    continue;
                }

                let _ = parents.insert(neighbor, tile);
                if goal.is_reached_at(neighbor) {
                    return Some(reconstruct(&parents, from, neighbor));
                }
                queue.push_back((neighbor, depth + 1));
            }
        }

        None
    }
}

fn reconstruct(
    parents: &BTreeMap<TileCoord, TileCoord>,
    from: TileCoord,
    destination: TileCoord,
) -> Vec<TileCoord> {
    let mut path = vec![destination];
    let mut cursor = destination;
    while let Some(&parent) = parents.get(&cursor) {
        if parent == from {
            break;
        }
        path.push(parent);
        cursor = parent;
    }
    path.reverse();
    path
}
