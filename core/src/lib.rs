#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tactics battle engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the turn systems. Adapters submit [`Intent`]
//! values on behalf of the player, systems translate them into [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values that view
//! layers drain and render.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Modeled time a unit spends traversing a single tile.
pub const DEFAULT_STEP_DURATION: Duration = Duration::from_millis(200);

/// Phase of the player's turn as tracked by the battle controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// No unit is selected; awaiting a click on a player character.
    Idle,
    /// A player character is selected and awaits a second click.
    CharacterSelected,
    /// A move or the automated turn is resolving; clicks are ignored.
    ActionInProgress,
}

/// Inputs the view layer reports on behalf of the human player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// The player clicked the tile at the provided coordinate.
    ///
    /// The coordinate may lie outside the grid.
    Click {
        /// Tile under the cursor when the click happened.
        tile: TileCoord,
    },
    /// The player asked to hand the turn to the automated faction.
    EndTurn,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Updates the modeled time a unit needs to traverse one tile.
    ConfigureStepDuration {
        /// Duration of a single movement step.
        step_duration: Duration,
    },
    /// Selects a unit and recomputes its reachable tiles and attackable targets.
    SelectUnit {
        /// Unit being selected.
        unit: UnitId,
        /// Whether reachable tiles should be computed.
        movement_allowed: bool,
        /// Whether attackable targets should be computed.
        attack_allowed: bool,
    },
    /// Drops the current selection, clearing its caches.
    ClearSelection,
    /// Requests that `attacker` strike `target` with its fixed damage.
    ResolveAttack {
        /// Unit performing the attack.
        attacker: UnitId,
        /// Unit receiving the damage.
        target: UnitId,
    },
    /// Requests that a unit travel along the provided path.
    ///
    /// The path excludes the unit's current tile and ends at the destination.
    ResolveMove {
        /// Unit that moves.
        unit: UnitId,
        /// Ordered tiles visited by the unit.
        path: Vec<TileCoord>,
    },
    /// Confirms that the modeled travel time of a move has elapsed.
    CompleteMove {
        /// Unit that finished moving.
        unit: UnitId,
        /// Tile the unit left.
        from: TileCoord,
        /// Tile the unit arrived at.
        to: TileCoord,
    },
}

/// Notifications broadcast to the view layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A unit was selected.
    UnitSelected {
        /// Selected unit.
        unit: UnitId,
    },
    /// A previously selected unit lost its selection.
    UnitDeselected {
        /// Unit that is no longer selected.
        unit: UnitId,
    },
    /// A unit became an attack target of the current selection.
    UnitTargeted {
        /// Unit that may be attacked.
        unit: UnitId,
    },
    /// The per-turn action budget of the player faction changed.
    ActionsChanged {
        /// Player characters that may still move this turn.
        movable: Vec<UnitId>,
        /// Player characters that may still attack this turn.
        attackable: Vec<UnitId>,
    },
    /// A unit performed an attack.
    UnitAttacked {
        /// Unit that attacked.
        attacker: UnitId,
        /// Unit that was attacked.
        target: UnitId,
        /// Damage dealt by the attack.
        damage: u32,
    },
    /// A unit started travelling along a path.
    UnitMoveStarted {
        /// Unit that moves.
        unit: UnitId,
        /// Tile the unit leaves.
        from: TileCoord,
        /// Tile the unit will occupy once the move completes.
        to: TileCoord,
        /// Modeled duration of the whole move.
        duration: Duration,
    },
    /// Animation hint describing one step of a move.
    UnitStepped {
        /// Unit that moves.
        unit: UnitId,
        /// Tile entered by the step.
        tile: TileCoord,
        /// Zero-based index of the step within the path.
        step_index: u32,
        /// Modeled duration of the step.
        step_duration: Duration,
    },
    /// A unit finished moving.
    UnitMoved {
        /// Unit that moved.
        unit: UnitId,
        /// Tile the unit left.
        from: TileCoord,
        /// Tile the unit now occupies.
        to: TileCoord,
    },
    /// A unit lost health.
    UnitDamaged {
        /// Unit that was damaged.
        unit: UnitId,
        /// Remaining health as a fraction of maximum health, clamped to `0..=1`.
        health_fraction: f32,
    },
    /// A unit was removed from the battle.
    UnitDestroyed {
        /// Unit that was destroyed.
        unit: UnitId,
        /// Tile the unit occupied.
        tile: TileCoord,
    },
    /// A click landed outside the grid.
    ClickOutOfBounds {
        /// Tile that was clicked.
        tile: TileCoord,
    },
    /// The player handed the turn to the automated faction.
    PlayerTurnEnded,
    /// A fresh player turn began.
    PlayerTurnStarted,
    /// The battle ended.
    BattleOver {
        /// Whether the player faction won.
        player_won: bool,
    },
}

/// Location of a single tile expressed as column and row coordinates.
///
/// Coordinates are signed so that clicks outside the grid can be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Squared straight-line distance between two tiles.
    ///
    /// Comparing squared distances orders tiles exactly like Euclidean distance
    /// without floating point.
    #[must_use]
    pub fn distance_squared(self, other: TileCoord) -> u64 {
        let dx = u64::from(self.x.abs_diff(other.x));
        let dy = u64::from(self.y.abs_diff(other.y));
        dx * dx + dy * dy
    }

    /// Reports whether `other` lies within `range` tiles along a shared row or column.
    ///
    /// Diagonal tiles never qualify, regardless of distance.
    #[must_use]
    pub fn within_cross_range(self, other: TileCoord, range: u32) -> bool {
        if self.y == other.y {
            self.x.abs_diff(other.x) <= range
        } else if self.x == other.x {
            self.y.abs_diff(other.y) <= range
        } else {
            false
        }
    }

    /// Orthogonal neighbors scanned north, east, south, west.
    ///
    /// Neighbors may lie outside the grid; callers filter bounds.
    #[must_use]
    pub fn neighbors(self) -> [TileCoord; 4] {
        [
            TileCoord::new(self.x, self.y - 1),
            TileCoord::new(self.x + 1, self.y),
            TileCoord::new(self.x, self.y + 1),
            TileCoord::new(self.x - 1, self.y),
        ]
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Unique identifier assigned to a unit.
///
/// Identifiers are allocated in registration order, so sorting by identifier
/// reproduces the battle's iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Broad category of a unit placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Combatant with stats that can act.
    Character,
    /// Inert blocker that never acts.
    Obstacle,
}

/// Ownership group of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Human-controlled side.
    Player,
    /// Automated side.
    Enemy,
    /// Obstacles and other units that belong to nobody.
    Neutral,
}

impl Faction {
    /// Returns the opposing playing faction, if this faction takes part in combat.
    #[must_use]
    pub const fn opponent(self) -> Option<Faction> {
        match self {
            Self::Player => Some(Self::Enemy),
            Self::Enemy => Some(Self::Player),
            Self::Neutral => None,
        }
    }
}

/// Stat block shared by every character of a given configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterStats {
    /// Health a character starts the battle with.
    pub max_health: u32,
    /// Fixed damage dealt by each attack.
    pub attack_damage: u32,
    /// Maximum cross distance at which targets can be attacked.
    pub attack_range: u32,
    /// Maximum number of tiles travelled by a single move.
    pub move_distance: u32,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self {
            max_health: 10,
            attack_damage: 4,
            attack_range: 1,
            move_distance: 3,
        }
    }
}

/// Current and maximum health of a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Health {
    current: i64,
    max: u32,
}

impl Health {
    /// Creates a full health pool.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self {
            current: max as i64,
            max,
        }
    }

    /// Remaining health points. Negative once the unit was overkilled.
    #[must_use]
    pub const fn current(&self) -> i64 {
        self.current
    }

    /// Maximum health points.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Subtracts the provided damage.
    #[must_use]
    pub const fn damaged(self, amount: u32) -> Self {
        Self {
            current: self.current - amount as i64,
            max: self.max,
        }
    }

    /// Reports whether the health pool is exhausted.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    /// Remaining health as a fraction of maximum health, clamped to `0..=1`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        (self.current as f32 / self.max as f32).clamp(0.0, 1.0)
    }
}

/// Opaque terrain index handed through from level data for the view layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainIndex(u8);

impl TerrainIndex {
    /// Wraps the provided terrain index.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the raw terrain index.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Initial placement of a single unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Tile occupied by the unit when the battle starts.
    pub tile: TileCoord,
    /// Category of the unit.
    pub kind: UnitKind,
    /// Owning faction.
    pub faction: Faction,
    /// Stat block; required for characters and ignored for obstacles.
    pub stats: Option<CharacterStats>,
}

impl Placement {
    /// Describes a character belonging to `faction`.
    #[must_use]
    pub const fn character(tile: TileCoord, faction: Faction, stats: CharacterStats) -> Self {
        Self {
            tile,
            kind: UnitKind::Character,
            faction,
            stats: Some(stats),
        }
    }

    /// Describes a neutral obstacle.
    #[must_use]
    pub const fn obstacle(tile: TileCoord) -> Self {
        Self {
            tile,
            kind: UnitKind::Obstacle,
            faction: Faction::Neutral,
            stats: None,
        }
    }
}

/// Already-parsed level description consumed when a battle loads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Row-major terrain indices, one per tile. May be empty when terrain is unused.
    pub terrain: Vec<TerrainIndex>,
    /// Units in registration order.
    pub placements: Vec<Placement>,
}

impl LevelLayout {
    /// Creates a layout without terrain information.
    #[must_use]
    pub fn new(columns: u32, rows: u32, placements: Vec<Placement>) -> Self {
        Self {
            columns,
            rows,
            terrain: Vec::new(),
            placements,
        }
    }
}

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitSnapshot {
    /// Identifier assigned to the unit.
    pub id: UnitId,
    /// Category of the unit.
    pub kind: UnitKind,
    /// Owning faction.
    pub faction: Faction,
    /// Tile currently occupied by the unit.
    pub tile: TileCoord,
    /// Stat block, present for characters only.
    pub stats: Option<CharacterStats>,
    /// Health pool, present for characters only.
    pub health: Option<Health>,
}

impl UnitSnapshot {
    /// Reports whether the unit is a character of the provided faction.
    #[must_use]
    pub fn is_character_of(&self, faction: Faction) -> bool {
        self.kind == UnitKind::Character && self.faction == faction
    }
}

/// Read-only snapshot describing all living units.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single unit.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&unit, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<UnitSnapshot> {
        self.snapshots
    }
}

/// Read-only view into the dense occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<UnitId>],
    columns: u32,
    rows: u32,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided row-major slice.
    #[must_use]
    pub fn new(cells: &'a [Option<UnitId>], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Reports whether the tile lies on the grid.
    #[must_use]
    pub fn in_bounds(&self, tile: TileCoord) -> bool {
        self.index(tile).is_some()
    }

    /// Returns the unit occupying the tile. Out-of-bounds tiles hold nothing.
    #[must_use]
    pub fn occupant(&self, tile: TileCoord) -> Option<UnitId> {
        self.index(tile)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    /// Reports whether the tile is on the grid and unoccupied.
    #[must_use]
    pub fn is_free(&self, tile: TileCoord) -> bool {
        self.in_bounds(tile) && self.occupant(tile).is_none()
    }

    /// Returns an iterator over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Option<UnitId>> + 'a {
        self.cells.iter().copied()
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn cross_range_accepts_row_and_column_only() {
        let origin = TileCoord::new(5, 5);
        for tile in [
            TileCoord::new(5, 3),
            TileCoord::new(5, 7),
            TileCoord::new(3, 5),
            TileCoord::new(7, 5),
        ] {
            assert!(
                origin.within_cross_range(tile, 2),
                "{tile:?} should be in range"
            );
        }
        assert!(!origin.within_cross_range(TileCoord::new(6, 6), 2));
        assert!(!origin.within_cross_range(TileCoord::new(7, 7), 2));
        assert!(!origin.within_cross_range(TileCoord::new(5, 8), 2));
    }

    #[test]
    fn neighbors_scan_north_east_south_west() {
        let tile = TileCoord::new(2, 2);
        assert_eq!(
            tile.neighbors(),
            [
                TileCoord::new(2, 1),
                TileCoord::new(3, 2),
                TileCoord::new(2, 3),
                TileCoord::new(1, 2),
            ]
        );
    }

    #[test]
    fn health_fraction_is_clamped() {
        let health = Health::full(10);
        assert!((health.fraction() - 1.0).abs() < f32::EPSILON);
        let hurt = health.damaged(4);
        assert_eq!(hurt.current(), 6);
        assert!((hurt.fraction() - 0.6).abs() < 1e-6);
        let overkilled = hurt.damaged(20);
        assert!(overkilled.is_depleted());
        assert_eq!(overkilled.fraction(), 0.0);
    }

    #[test]
    fn occupancy_view_treats_out_of_bounds_as_empty() {
        let cells = [None, Some(UnitId::new(3)), None, None];
        let view = OccupancyView::new(&cells, 2, 2);
        assert_eq!(view.occupant(TileCoord::new(1, 0)), Some(UnitId::new(3)));
        assert_eq!(view.occupant(TileCoord::new(-1, 0)), None);
        assert_eq!(view.occupant(TileCoord::new(2, 0)), None);
        assert!(!view.is_free(TileCoord::new(0, 5)));
        assert!(view.is_free(TileCoord::new(0, 1)));
    }

    #[test]
    fn opponent_faction_is_symmetric() {
        assert_eq!(Faction::Player.opponent(), Some(Faction::Enemy));
        assert_eq!(Faction::Enemy.opponent(), Some(Faction::Player));
        assert_eq!(Faction::Neutral.opponent(), None);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn level_layout_round_trips_through_bincode() {
        let layout = LevelLayout {
            columns: 4,
            rows: 3,
            terrain: vec![TerrainIndex::new(2); 12],
            placements: vec![
                Placement::character(
                    TileCoord::new(0, 0),
                    Faction::Player,
                    CharacterStats::default(),
                ),
                Placement::obstacle(TileCoord::new(1, 2)),
            ],
        };
        assert_round_trip(&layout);
    }
}
