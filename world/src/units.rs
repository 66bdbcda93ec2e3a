//! Authoritative unit state management utilities.

use std::collections::{BTreeMap, BTreeSet};

use tactics_core::{
    CharacterStats, Faction, Health, Placement, TileCoord, UnitId, UnitKind, UnitSnapshot,
};

/// Combatant or obstacle stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Unit {
    /// Identifier allocated by the world for the unit.
    pub(crate) id: UnitId,
    /// Category of the unit.
    pub(crate) kind: UnitKind,
    /// Owning faction.
    pub(crate) faction: Faction,
    /// Tile currently occupied by the unit.
    pub(crate) tile: TileCoord,
    /// Stat block, present for characters only.
    pub(crate) stats: Option<CharacterStats>,
    /// Health pool, present for characters only.
    pub(crate) health: Option<Health>,
    /// Tiles the unit may move to, computed on selection.
    pub(crate) reachable_tiles: BTreeSet<TileCoord>,
    /// Units the unit may attack, computed on selection.
    pub(crate) attackable_targets: BTreeSet<UnitId>,
}

impl Unit {
    fn from_placement(id: UnitId, placement: &Placement) -> Self {
        let stats = match placement.kind {
            UnitKind::Character => placement.stats,
            UnitKind::Obstacle => None,
        };
        Self {
            id,
            kind: placement.kind,
            faction: placement.faction,
            tile: placement.tile,
            stats,
            health: stats.map(|stats| Health::full(stats.max_health)),
            reachable_tiles: BTreeSet::new(),
            attackable_targets: BTreeSet::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            kind: self.kind,
            faction: self.faction,
            tile: self.tile,
            stats: self.stats,
            health: self.health,
        }
    }

    pub(crate) fn clear_selection(&mut self) {
        self.reachable_tiles.clear();
        self.attackable_targets.clear();
    }
}

/// Registry that stores units and manages identifier allocation.
///
/// Identifiers grow monotonically, so iterating the registry yields units in
/// registration order.
#[derive(Debug)]
pub(crate) struct UnitRegistry {
    entries: BTreeMap<UnitId, Unit>,
    next_unit_id: UnitId,
}

impl UnitRegistry {
    /// Creates an empty unit registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_unit_id: UnitId::new(0),
        }
    }

    /// Registers a unit built from the placement and returns its identifier.
    pub(crate) fn register(&mut self, placement: &Placement) -> UnitId {
        let id = self.next_unit_id;
        self.next_unit_id = UnitId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(id, Unit::from_placement(id, placement));
        id
    }

    pub(crate) fn get(&self, id: UnitId) -> Option<&Unit> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.entries.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_allocates_identifiers_in_registration_order() {
        let mut registry = UnitRegistry::new();
        let first = registry.register(&Placement::obstacle(TileCoord::new(3, 3)));
        let second = registry.register(&Placement::character(
            TileCoord::new(0, 0),
            Faction::Player,
            CharacterStats::default(),
        ));

        assert_eq!(first, UnitId::new(0));
        assert_eq!(second, UnitId::new(1));
        let order: Vec<_> = registry.iter().map(|unit| unit.id).collect();
        assert_eq!(order, vec![first, second]);
    }

    #[test]
    fn obstacles_carry_no_health() {
        let mut registry = UnitRegistry::new();
        let mut placement = Placement::obstacle(TileCoord::new(1, 1));
        placement.stats = Some(CharacterStats::default());
        let id = registry.register(&placement);
        let unit = registry.get(id).expect("registered");
        assert!(unit.health.is_none());
        assert!(unit.stats.is_none());
    }

    #[test]
    fn characters_start_at_full_health() {
        let mut registry = UnitRegistry::new();
        let stats = CharacterStats {
            max_health: 7,
            ..CharacterStats::default()
        };
        let id = registry.register(&Placement::character(
            TileCoord::new(0, 0),
            Faction::Enemy,
            stats,
        ));
        let snapshot = registry.get(id).expect("registered").snapshot();
        assert_eq!(snapshot.health, Some(Health::full(7)));
        assert_eq!(snapshot.stats, Some(stats));
    }
}
