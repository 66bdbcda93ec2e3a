#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative battle state management for the tactics engine.
//!
//! The world owns the grid occupancy table and the unit registry. Both are
//! mutated exclusively through [`apply`], which keeps every living unit's
//! stored tile and the occupancy entry pointing back at it in lockstep.

pub mod navigation;
mod units;

use std::time::Duration;

use tactics_core::{
    Command, Event, Faction, LevelLayout, TerrainIndex, TileCoord, UnitId, UnitKind,
    DEFAULT_STEP_DURATION,
};
use thiserror::Error;

use self::{
    navigation::Navigator,
    units::{Unit, UnitRegistry},
};

/// Reasons a level layout may be rejected when a battle loads.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// The grid must have at least one column and one row.
    #[error("level grid must not be empty, got {columns}x{rows}")]
    EmptyGrid {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// Terrain data does not cover the grid exactly.
    #[error("terrain covers {actual} tiles but the grid holds {expected}")]
    TerrainMismatch {
        /// Number of tiles on the grid.
        expected: usize,
        /// Number of terrain entries supplied.
        actual: usize,
    },
    /// A placement lies outside the grid.
    #[error("placement at {tile} lies outside the grid")]
    OutOfBounds {
        /// Offending tile.
        tile: TileCoord,
    },
    /// Two placements share a tile.
    #[error("tile {tile} holds more than one unit")]
    Overlap {
        /// Offending tile.
        tile: TileCoord,
    },
    /// A character placement lacks its stat block.
    #[error("character at {tile} has no stat block")]
    MissingStats {
        /// Offending tile.
        tile: TileCoord,
    },
    /// A character placement belongs to the neutral faction.
    #[error("character at {tile} must belong to a playing faction")]
    NeutralCharacter {
        /// Offending tile.
        tile: TileCoord,
    },
    /// An obstacle placement belongs to a playing faction.
    #[error("obstacle at {tile} must be neutral")]
    AlignedObstacle {
        /// Offending tile.
        tile: TileCoord,
    },
    /// A character placement would enter the battle without health.
    #[error("character at {tile} needs a maximum health of at least 1")]
    InvalidStats {
        /// Offending tile.
        tile: TileCoord,
    },
    /// The grid cannot be addressed with tile coordinates on this platform.
    #[error("level grid {columns}x{rows} is too large")]
    OversizedGrid {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
}

/// Represents the authoritative battle state.
#[derive(Debug)]
pub struct World {
    terrain: Vec<TerrainIndex>,
    occupancy: OccupancyGrid,
    units: UnitRegistry,
    selected: Option<UnitId>,
    step_duration: Duration,
}

impl World {
    /// Instantiates a battle from already-parsed level data.
    ///
    /// Units are registered in placement order, which becomes the iteration
    /// order used by every query.
    pub fn from_layout(layout: &LevelLayout) -> Result<Self, LevelError> {
        if layout.columns == 0 || layout.rows == 0 {
            return Err(LevelError::EmptyGrid {
                columns: layout.columns,
                rows: layout.rows,
            });
        }

        let Some(occupancy) = OccupancyGrid::new(layout.columns, layout.rows) else {
            return Err(LevelError::OversizedGrid {
                columns: layout.columns,
                rows: layout.rows,
            });
        };
        let expected = occupancy.cells.len();
        if !layout.terrain.is_empty() && layout.terrain.len() != expected {
            return Err(LevelError::TerrainMismatch {
                expected,
                actual: layout.terrain.len(),
            });
        }

        let mut world = Self {
            terrain: layout.terrain.clone(),
            occupancy,
            units: UnitRegistry::new(),
            selected: None,
            step_duration: DEFAULT_STEP_DURATION,
        };

        for placement in &layout.placements {
            let tile = placement.tile;
            if world.occupancy.index(tile).is_none() {
                return Err(LevelError::OutOfBounds { tile });
            }
            if world.occupancy.occupant(tile).is_some() {
                return Err(LevelError::Overlap { tile });
            }
            match (placement.kind, placement.faction) {
                (UnitKind::Character, Faction::Neutral) => {
                    return Err(LevelError::NeutralCharacter { tile });
                }
                (UnitKind::Character, _) => match placement.stats {
                    None => return Err(LevelError::MissingStats { tile }),
                    Some(stats) if stats.max_health == 0 => {
                        return Err(LevelError::InvalidStats { tile });
                    }
                    Some(_) => {}
                },
                (UnitKind::Obstacle, Faction::Player | Faction::Enemy) => {
                    return Err(LevelError::AlignedObstacle { tile });
                }
                _ => {}
            }

            let id = world.units.register(placement);
            world.occupancy.place(id, tile);
        }

        tracing::debug!(
            columns = layout.columns,
            rows = layout.rows,
            units = layout.placements.len(),
            "battle world instantiated"
        );
        Ok(world)
    }

    fn unit(&self, id: UnitId) -> &Unit {
        match self.units.get(id) {
            Some(unit) => unit,
            None => panic!("unit {} is not part of the battle", id.get()),
        }
    }

    fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        match self.units.get_mut(id) {
            Some(unit) => unit,
            None => panic!("unit {} is not part of the battle", id.get()),
        }
    }

    fn targets_in_cross_range(&self, attacker: &Unit) -> Vec<UnitId> {
        let Some(opponent) = attacker.faction.opponent() else {
            return Vec::new();
        };
        let range = attacker.stats.map_or(0, |stats| stats.attack_range);
        self.units
            .iter()
            .filter(|unit| unit.id != attacker.id && unit.faction == opponent)
            .filter(|unit| attacker.tile.within_cross_range(unit.tile, range))
            .map(|unit| unit.id)
            .collect()
    }

    fn select(
        &mut self,
        id: UnitId,
        movement_allowed: bool,
        attack_allowed: bool,
        out_events: &mut Vec<Event>,
    ) {
        self.clear_selection(out_events);

        let unit = self.unit(id);
        assert!(
            unit.kind == UnitKind::Character,
            "only characters can be selected, unit {} is an obstacle",
            id.get()
        );

        let reachable = if movement_allowed {
            let move_distance = unit.stats.map_or(0, |stats| stats.move_distance);
            Navigator::new(self.occupancy.view()).reachable(unit.tile, move_distance)
        } else {
            Default::default()
        };
        let targets = if attack_allowed {
            self.targets_in_cross_range(unit)
        } else {
            Vec::new()
        };

        for target in &targets {
            out_events.push(Event::UnitTargeted { unit: *target });
        }

        let unit = self.unit_mut(id);
        unit.reachable_tiles = reachable;
        unit.attackable_targets = targets.into_iter().collect();
        tracing::debug!(
            unit = id.get(),
            reachable = unit.reachable_tiles.len(),
            targets = unit.attackable_targets.len(),
            "unit selected"
        );

        self.selected = Some(id);
        out_events.push(Event::UnitSelected { unit: id });
    }

    fn clear_selection(&mut self, out_events: &mut Vec<Event>) {
        if let Some(previous) = self.selected.take() {
            if let Some(unit) = self.units.get_mut(previous) {
                unit.clear_selection();
            }
            out_events.push(Event::UnitDeselected { unit: previous });
        }
    }

    fn resolve_attack(&mut self, attacker: UnitId, target: UnitId, out_events: &mut Vec<Event>) {
        let damage = self.unit(attacker).stats.map_or(0, |stats| stats.attack_damage);
        tracing::debug!(
            attacker = attacker.get(),
            target = target.get(),
            damage,
            "attack resolved"
        );
        out_events.push(Event::UnitAttacked {
            attacker,
            target,
            damage,
        });
        self.apply_damage(target, damage, out_events);
    }

    fn apply_damage(&mut self, id: UnitId, amount: u32, out_events: &mut Vec<Event>) {
        let unit = self.unit_mut(id);
        let Some(health) = unit.health else {
            panic!("unit {} cannot take damage", id.get());
        };
        let health = health.damaged(amount);
        unit.health = Some(health);
        let tile = unit.tile;

        if health.is_depleted() {
            self.destroy(id, tile);
            out_events.push(Event::UnitDestroyed { unit: id, tile });
        }

        out_events.push(Event::UnitDamaged {
            unit: id,
            health_fraction: health.fraction(),
        });
    }

    fn destroy(&mut self, id: UnitId, tile: TileCoord) {
        let removed = self.units.remove(id);
        assert!(removed.is_some(), "unit {} destroyed twice", id.get());
        self.occupancy.clear(tile);
        if self.selected == Some(id) {
            self.selected = None;
        }
        for unit in self.units.iter_mut() {
            let _ = unit.attackable_targets.remove(&id);
        }
        tracing::debug!(unit = id.get(), %tile, "unit destroyed");
    }

    fn resolve_move(&mut self, id: UnitId, path: Vec<TileCoord>, out_events: &mut Vec<Event>) {
        let Some(&destination) = path.last() else {
            panic!("unit {} was asked to move along an empty path", id.get());
        };
        let from = self.unit(id).tile;

        self.occupancy.relocate(id, from, destination);
        let unit = self.unit_mut(id);
        unit.tile = destination;
        unit.clear_selection();

        let steps = u32::try_from(path.len()).unwrap_or(u32::MAX);
        let duration = self.step_duration.saturating_mul(steps);
        tracing::debug!(unit = id.get(), %from, to = %destination, steps, "move started");
        out_events.push(Event::UnitMoveStarted {
            unit: id,
            from,
            to: destination,
            duration,
        });

        for (step_index, tile) in (0_u32..).zip(path) {
            out_events.push(Event::UnitStepped {
                unit: id,
                tile,
                step_index,
                step_duration: self.step_duration,
            });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// # Panics
///
/// Commands naming units that are not part of the battle, moves onto occupied
/// tiles and attacks on units without health violate the world's contract and
/// panic.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureStepDuration { step_duration } => {
            world.step_duration = step_duration;
        }
        Command::SelectUnit {
            unit,
            movement_allowed,
            attack_allowed,
        } => world.select(unit, movement_allowed, attack_allowed, out_events),
        Command::ClearSelection => world.clear_selection(out_events),
        Command::ResolveAttack { attacker, target } => {
            world.resolve_attack(attacker, target, out_events);
        }
        Command::ResolveMove { unit, path } => world.resolve_move(unit, path, out_events),
        Command::CompleteMove { unit, from, to } => {
            let tile = world.unit(unit).tile;
            assert_eq!(
                tile,
                to,
                "unit {} completed a move it is not positioned for",
                unit.get()
            );
            out_events.push(Event::UnitMoved { unit, from, to });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{collections::BTreeSet, time::Duration};

    use super::{
        navigation::{Navigator, PathGoal},
        World,
    };
    use tactics_core::{
        Faction, OccupancyView, TerrainIndex, TileCoord, UnitId, UnitKind, UnitSnapshot, UnitView,
    };

    /// Dimensions of the grid as `(columns, rows)`.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        world.occupancy.view().dimensions()
    }

    /// Reports whether the tile lies on the grid.
    #[must_use]
    pub fn in_bounds(world: &World, tile: TileCoord) -> bool {
        world.occupancy.index(tile).is_some()
    }

    /// Returns the unit occupying the tile. Out-of-bounds tiles hold nothing.
    #[must_use]
    pub fn occupant_at(world: &World, tile: TileCoord) -> Option<UnitId> {
        world.occupancy.occupant(tile)
    }

    /// Terrain index of the tile, if the level supplied terrain data.
    #[must_use]
    pub fn terrain_at(world: &World, tile: TileCoord) -> Option<TerrainIndex> {
        world
            .occupancy
            .index(tile)
            .and_then(|index| world.terrain.get(index).copied())
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        world.occupancy.view()
    }

    /// Binds a navigator to the current occupancy.
    #[must_use]
    pub fn navigator(world: &World) -> Navigator<'_> {
        Navigator::new(world.occupancy.view())
    }

    /// Captures the state of a single living unit.
    #[must_use]
    pub fn unit(world: &World, unit: UnitId) -> Option<UnitSnapshot> {
        world.units.get(unit).map(|unit| unit.snapshot())
    }

    /// Captures a read-only view of every living unit.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        UnitView::from_snapshots(world.units.iter().map(|unit| unit.snapshot()).collect())
    }

    /// Living characters of the faction in registration order.
    #[must_use]
    pub fn characters(world: &World, faction: Faction) -> Vec<UnitId> {
        world
            .units
            .iter()
            .filter(|unit| unit.kind == UnitKind::Character && unit.faction == faction)
            .map(|unit| unit.id)
            .collect()
    }

    /// Opposing units within the unit's cross attack range, in registration order.
    ///
    /// Evaluated against the unit's current tile, independent of any selection.
    #[must_use]
    pub fn targets_in_range(world: &World, unit: UnitId) -> Vec<UnitId> {
        world
            .units
            .get(unit)
            .map(|attacker| world.targets_in_cross_range(attacker))
            .unwrap_or_default()
    }

    /// Searches a path for `mover` toward `target` bounded by `max_distance`.
    ///
    /// When `adjacent_target` is supplied, `target` must be the tile it occupies
    /// and the path ends next to it instead of on it.
    ///
    /// # Panics
    ///
    /// Panics when `mover` is not part of the battle, or when `adjacent_target`
    /// does not occupy `target`.
    #[must_use]
    pub fn path(
        world: &World,
        mover: UnitId,
        target: TileCoord,
        max_distance: u32,
        adjacent_target: Option<UnitId>,
    ) -> Option<Vec<TileCoord>> {
        let from = world.unit(mover).tile;
        let goal = match adjacent_target {
            Some(occupant) => {
                assert_eq!(
                    world.occupancy.occupant(target),
                    Some(occupant),
                    "adjacent path target must occupy {target}"
                );
                PathGoal::AdjacentTo(target)
            }
            None => PathGoal::Tile(target),
        };
        navigator(world).path(from, goal, max_distance)
    }

    /// Tiles the selected unit may move to. Empty unless computed by a selection.
    #[must_use]
    pub fn reachable_tiles(world: &World, unit: UnitId) -> BTreeSet<TileCoord> {
        world
            .units
            .get(unit)
            .map(|unit| unit.reachable_tiles.clone())
            .unwrap_or_default()
    }

    /// Units the selected unit may attack. Empty unless computed by a selection.
    #[must_use]
    pub fn attackable_targets(world: &World, unit: UnitId) -> BTreeSet<UnitId> {
        world
            .units
            .get(unit)
            .map(|unit| unit.attackable_targets.clone())
            .unwrap_or_default()
    }

    /// Reports whether the unit's latest selection allows moving to `tile`.
    #[must_use]
    pub fn can_move_to(world: &World, unit: UnitId, tile: TileCoord) -> bool {
        world
            .units
            .get(unit)
            .is_some_and(|unit| unit.reachable_tiles.contains(&tile))
    }

    /// Reports whether the unit's latest selection allows attacking `target`.
    #[must_use]
    pub fn can_attack(world: &World, unit: UnitId, target: UnitId) -> bool {
        world
            .units
            .get(unit)
            .is_some_and(|unit| unit.attackable_targets.contains(&target))
    }

    /// Unit holding the world's selection, if any.
    #[must_use]
    pub fn selected(world: &World) -> Option<UnitId> {
        world.selected
    }

    /// Modeled time a unit needs to traverse one tile.
    #[must_use]
    pub fn step_duration(world: &World) -> Duration {
        world.step_duration
    }
}

#[derive(Clone, Debug)]
struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<UnitId>>,
}

impl OccupancyGrid {
    /// Returns `None` when tiles past the grid edge could not be addressed
    /// with `i32` coordinates or the cell count overflows `usize`.
    fn new(columns: u32, rows: u32) -> Option<Self> {
        let _ = i32::try_from(columns).ok()?;
        let _ = i32::try_from(rows).ok()?;
        let capacity = usize::try_from(columns)
            .ok()?
            .checked_mul(usize::try_from(rows).ok()?)?;
        Some(Self {
            columns,
            rows,
            cells: vec![None; capacity],
        })
    }

    fn view(&self) -> tactics_core::OccupancyView<'_> {
        tactics_core::OccupancyView::new(&self.cells, self.columns, self.rows)
    }

    fn occupant(&self, tile: TileCoord) -> Option<UnitId> {
        self.index(tile)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    fn slot_mut(&mut self, tile: TileCoord) -> &mut Option<UnitId> {
        let Some(index) = self.index(tile) else {
            panic!("tile {tile} lies outside the grid");
        };
        &mut self.cells[index]
    }

    fn place(&mut self, unit: UnitId, tile: TileCoord) {
        let slot = self.slot_mut(tile);
        assert!(slot.is_none(), "tile {tile} is already occupied");
        *slot = Some(unit);
    }

    fn clear(&mut self, tile: TileCoord) {
        *self.slot_mut(tile) = None;
    }

    fn relocate(&mut self, unit: UnitId, from: TileCoord, to: TileCoord) {
        assert_eq!(
            self.occupant(from),
            Some(unit),
            "unit {} does not occupy {from}",
            unit.get()
        );
        self.place(unit, to);
        self.clear(from);
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        let column = u32::try_from(tile.x()).ok()?;
        let row = u32::try_from(tile.y()).ok()?;
        if column < self.columns && row < self.rows {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
