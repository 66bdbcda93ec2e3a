#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Decision procedure driving units of the automated faction.
//!
//! Each automated unit either attacks an opponent already in cross range or
//! walks toward the closest opposing character. Once a move completes the
//! controller asks for a single follow-up attack through
//! [`Opponent::follow_up`].

use tactics_core::{Command, OccupancyView, UnitId, UnitSnapshot, UnitView};
use tactics_world::navigation::{Navigator, PathGoal};

/// Pure system that turns world snapshots into commands for automated units.
#[derive(Clone, Copy, Debug, Default)]
pub struct Opponent;

impl Opponent {
    /// Creates the opponent system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides the opening action of `unit` for this turn.
    ///
    /// Emits at most one command: an attack on the first opponent in cross
    /// range, or a move toward the closest opposing character. Nothing is
    /// emitted when the unit is gone, has no opponent, or cannot get closer.
    pub fn handle(
        &self,
        unit: UnitId,
        units: &UnitView,
        occupancy: OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        let Some(actor) = units.get(unit) else {
            return;
        };

        if let Some(target) = first_in_range(actor, units) {
            tracing::debug!(unit = unit.get(), target = target.get(), "opponent attacks");
            out.push(Command::ResolveAttack {
                attacker: unit,
                target,
            });
            return;
        }

        let Some(target) = closest_opponent(actor, units) else {
            tracing::debug!(unit = unit.get(), "opponent has nobody to approach");
            return;
        };

        let move_distance = actor.stats.map_or(0, |stats| stats.move_distance);
        let path = Navigator::new(occupancy).path(
            actor.tile,
            PathGoal::AdjacentTo(target.tile),
            move_distance,
        );
        match path {
            Some(path) if !path.is_empty() => {
                tracing::debug!(
                    unit = unit.get(),
                    target = target.id.get(),
                    steps = path.len(),
                    "opponent approaches"
                );
                out.push(Command::ResolveMove { unit, path });
            }
            _ => {
                tracing::debug!(
                    unit = unit.get(),
                    target = target.id.get(),
                    "opponent holds position"
                );
            }
        }
    }

    /// Retries the attack once after `unit` finished moving.
    pub fn follow_up(&self, unit: UnitId, units: &UnitView, out: &mut Vec<Command>) {
        let Some(actor) = units.get(unit) else {
            return;
        };

        if let Some(target) = first_in_range(actor, units) {
            tracing::debug!(
                unit = unit.get(),
                target = target.get(),
                "opponent attacks after moving"
            );
            out.push(Command::ResolveAttack {
                attacker: unit,
                target,
            });
        }
    }
}

fn first_in_range(actor: &UnitSnapshot, units: &UnitView) -> Option<UnitId> {
    let opponent = actor.faction.opponent()?;
    let range = actor.stats.map_or(0, |stats| stats.attack_range);
    units
        .iter()
        .filter(|unit| unit.faction == opponent)
        .find(|unit| actor.tile.within_cross_range(unit.tile, range))
        .map(|unit| unit.id)
}

fn closest_opponent<'a>(actor: &UnitSnapshot, units: &'a UnitView) -> Option<&'a UnitSnapshot> {
    let opponent = actor.faction.opponent()?;
    units
        .iter()
        .filter(|unit| unit.is_character_of(opponent))
        .min_by_key(|unit| actor.tile.distance_squared(unit.tile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::{CharacterStats, Faction, Health, TileCoord, UnitKind};

    fn snapshot(id: u32, faction: Faction, x: i32, y: i32) -> UnitSnapshot {
        let stats = CharacterStats::default();
        UnitSnapshot {
            id: UnitId::new(id),
            kind: UnitKind::Character,
            faction,
            tile: TileCoord::new(x, y),
            stats: Some(stats),
            health: Some(Health::full(stats.max_health)),
        }
    }

    #[test]
    fn first_in_range_prefers_registration_order() {
        let units = UnitView::from_snapshots(vec![
            snapshot(0, Faction::Enemy, 2, 2),
            snapshot(2, Faction::Player, 2, 1),
            snapshot(1, Faction::Player, 3, 2),
        ]);
        let actor = units.get(UnitId::new(0)).expect("actor");
        assert_eq!(first_in_range(actor, &units), Some(UnitId::new(1)));
    }

    #[test]
    fn diagonal_neighbors_are_out_of_range() {
        let units = UnitView::from_snapshots(vec![
            snapshot(0, Faction::Enemy, 2, 2),
            snapshot(1, Faction::Player, 3, 3),
        ]);
        let actor = units.get(UnitId::new(0)).expect("actor");
        assert_eq!(first_in_range(actor, &units), None);
    }

    #[test]
    fn closest_opponent_breaks_ties_by_registration_order() {
        let units = UnitView::from_snapshots(vec![
            snapshot(0, Faction::Enemy, 0, 0),
            snapshot(1, Faction::Player, 0, 4),
            snapshot(2, Faction::Player, 4, 0),
            snapshot(3, Faction::Enemy, 0, 1),
        ]);
        let actor = units.get(UnitId::new(0)).expect("actor");
        let target = closest_opponent(actor, &units).map(|unit| unit.id);
        assert_eq!(target, Some(UnitId::new(1)));
    }

    #[test]
    fn obstacles_are_never_approached() {
        let mut obstacle = snapshot(1, Faction::Neutral, 1, 0);
        obstacle.kind = UnitKind::Obstacle;
        obstacle.stats = None;
        obstacle.health = None;
        let units = UnitView::from_snapshots(vec![snapshot(0, Faction::Enemy, 0, 0), obstacle]);
        let actor = units.get(UnitId::new(0)).expect("actor");
        assert!(closest_opponent(actor, &units).is_none());
    }
}
