//! Human-readable battle log rendered from world and controller events.

use std::collections::BTreeMap;

use tactics_core::{Event, Faction, UnitId, UnitKind, UnitView};

/// Turns events into log lines. Names are captured up front so destroyed
/// units stay printable.
#[derive(Debug)]
pub(crate) struct BattleLog {
    names: BTreeMap<UnitId, String>,
}

impl BattleLog {
    pub(crate) fn new(units: &UnitView) -> Self {
        let names = units
            .iter()
            .map(|unit| (unit.id, unit_name(unit.kind, unit.faction, unit.id)))
            .collect();
        Self { names }
    }

    pub(crate) fn describe(&self, event: &Event) -> Option<String> {
        let line = match event {
            Event::UnitAttacked {
                attacker,
                target,
                damage,
            } => format!(
                "{} dealt {damage} dmg to {}!",
                self.name(*attacker),
                self.name(*target)
            ),
            Event::UnitMoved { unit, from, to } => format!("{} {from}->{to}", self.name(*unit)),
            Event::UnitDestroyed { unit, tile } => {
                format!("{} was destroyed at {tile}", self.name(*unit))
            }
            Event::ClickOutOfBounds { tile } => format!("click at {tile} is outside the grid"),
            Event::PlayerTurnStarted => "-- player turn --".to_owned(),
            Event::PlayerTurnEnded => "-- enemy turn --".to_owned(),
            Event::BattleOver { player_won: true } => "Player wins!".to_owned(),
            Event::BattleOver { player_won: false } => "Enemy wins!".to_owned(),
            _ => return None,
        };
        Some(line)
    }

    fn name(&self, unit: UnitId) -> String {
        self.names
            .get(&unit)
            .cloned()
            .unwrap_or_else(|| format!("Unit#{}", unit.get()))
    }
}

fn unit_name(kind: UnitKind, faction: Faction, id: UnitId) -> String {
    format!("{kind:?}_{faction:?}#{}", id.get())
}
