#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn state machine orchestrating a battle between the player and the
//! automated faction.
//!
//! The controller consumes [`Intent`]s, validates them against the world and
//! the per-turn action budget, and issues world commands. Moves and the
//! automated faction's turn run inside a [`Sequencer`], so they complete only
//! once their modeled duration elapsed through [`BattleController::advance`].

use std::time::Duration;

use tactics_core::{Command, Event, Faction, Intent, TileCoord, TurnState, UnitId, UnitKind};
use tactics_system_opponent::Opponent;
use tactics_system_sequencer::{Completion, Continuation, Sequencer};
use tactics_world::{self as world, query, World};

/// Final result of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BattleOutcome {
    /// Every enemy character was destroyed.
    PlayerWon,
    /// Every player character was destroyed while enemies remained.
    PlayerLost,
}

impl BattleOutcome {
    /// Reports whether the player faction won.
    #[must_use]
    pub const fn player_won(self) -> bool {
        matches!(self, Self::PlayerWon)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    PlayerMove {
        unit: UnitId,
        path: Vec<TileCoord>,
    },
    FinishPlayerMove {
        unit: UnitId,
        from: TileCoord,
        to: TileCoord,
    },
    AutomatedTurn(UnitId),
    FinishAutomatedMove {
        unit: UnitId,
        from: TileCoord,
        to: TileCoord,
    },
    FinishAutomatedPhase,
}

/// Owns the world and drives turns, selection and victory detection.
#[derive(Debug)]
pub struct BattleController {
    world: World,
    opponent: Opponent,
    sequencer: Sequencer<Step>,
    state: TurnState,
    selected: Option<UnitId>,
    movable: Vec<UnitId>,
    attackable: Vec<UnitId>,
    outcome: Option<BattleOutcome>,
}

impl BattleController {
    /// Takes ownership of the world and starts the first player turn.
    ///
    /// A world that already lacks one of the factions ends the battle at once.
    pub fn new(world: World, out: &mut Vec<Event>) -> Self {
        let mut controller = Self {
            world,
            opponent: Opponent::new(),
            sequencer: Sequencer::default(),
            state: TurnState::Idle,
            selected: None,
            movable: Vec::new(),
            attackable: Vec::new(),
            outcome: None,
        };

        if !controller.check_victory(out) {
            controller.start_player_turn(out);
        }
        controller
    }

    /// Processes an intent reported by the view layer.
    ///
    /// Intents that are not valid in the current state leave the battle
    /// untouched.
    pub fn handle(&mut self, intent: Intent, out: &mut Vec<Event>) {
        if self.outcome.is_some() || self.state == TurnState::ActionInProgress {
            return;
        }

        match intent {
            Intent::Click { tile } => self.click(tile, out),
            Intent::EndTurn => self.end_turn(out),
        }
    }

    /// Advances the modeled clock, completing moves and automated turns whose
    /// duration elapsed.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.drive(dt, out);
    }

    /// Current phase of the player's turn.
    #[must_use]
    pub fn turn_state(&self) -> TurnState {
        self.state
    }

    /// Player character currently selected.
    #[must_use]
    pub fn selected(&self) -> Option<UnitId> {
        self.selected
    }

    /// Player characters that may still move this turn, in registration order.
    #[must_use]
    pub fn movable(&self) -> &[UnitId] {
        &self.movable
    }

    /// Player characters that may still attack this turn, in registration order.
    #[must_use]
    pub fn attackable(&self) -> &[UnitId] {
        &self.attackable
    }

    /// Result of the battle once it ended.
    #[must_use]
    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    /// Reports whether a move or the automated turn is still resolving.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.sequencer.is_idle()
    }

    /// Read-only access to the battle world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    fn click(&mut self, tile: TileCoord, out: &mut Vec<Event>) {
        if !query::in_bounds(&self.world, tile) {
            out.push(Event::ClickOutOfBounds { tile });
            return;
        }

        let clicked = query::occupant_at(&self.world, tile)
            .and_then(|occupant| query::unit(&self.world, occupant));
        match clicked {
            Some(unit) if unit.kind == UnitKind::Obstacle => {}
            Some(unit) if unit.faction == Faction::Player => self.select(unit.id, out),
            Some(unit) => {
                if let Some(selected) = self.selected {
                    self.try_attack(selected, unit.id, out);
                }
            }
            None => {
                if let Some(selected) = self.selected {
                    self.try_move(selected, tile, out);
                }
            }
        }
    }

    fn try_attack(&mut self, attacker: UnitId, target: UnitId, out: &mut Vec<Event>) {
        if !self.attackable.contains(&attacker) || !query::can_attack(&self.world, attacker, target)
        {
            return;
        }

        self.attackable.retain(|unit| *unit != attacker);
        self.push_actions(out);
        self.apply(Command::ResolveAttack { attacker, target }, out);
        if self.check_victory(out) {
            return;
        }

        let next = if self.movable.contains(&attacker) {
            attacker
        } else {
            self.next_actionable().unwrap_or(attacker)
        };
        self.select(next, out);
    }

    fn try_move(&mut self, unit: UnitId, tile: TileCoord, out: &mut Vec<Event>) {
        if !self.movable.contains(&unit) || !query::can_move_to(&self.world, unit, tile) {
            return;
        }

        let move_distance = query::unit(&self.world, unit)
            .and_then(|snapshot| snapshot.stats)
            .map_or(0, |stats| stats.move_distance);
        let Some(path) = query::path(&self.world, unit, tile, move_distance, None) else {
            return;
        };

        self.state = TurnState::ActionInProgress;
        self.sequencer.push(Step::PlayerMove { unit, path });
        self.drive(Duration::ZERO, out);
    }

    fn end_turn(&mut self, out: &mut Vec<Event>) {
        self.apply(Command::ClearSelection, out);
        self.selected = None;
        self.state = TurnState::ActionInProgress;
        out.push(Event::PlayerTurnEnded);
        tracing::info!("player turn ended");

        for unit in query::characters(&self.world, Faction::Enemy) {
            self.sequencer.push(Step::AutomatedTurn(unit));
        }
        self.sequencer.push(Step::FinishAutomatedPhase);
        self.drive(Duration::ZERO, out);
    }

    fn select(&mut self, unit: UnitId, out: &mut Vec<Event>) {
        self.apply(
            Command::SelectUnit {
                unit,
                movement_allowed: self.movable.contains(&unit),
                attack_allowed: self.attackable.contains(&unit),
            },
            out,
        );
        self.selected = Some(unit);
        self.state = TurnState::CharacterSelected;
    }

    fn next_actionable(&self) -> Option<UnitId> {
        self.movable
            .first()
            .or_else(|| self.attackable.first())
            .copied()
    }

    fn start_player_turn(&mut self, out: &mut Vec<Event>) {
        let characters = query::characters(&self.world, Faction::Player);
        self.movable = characters.clone();
        self.attackable = characters;
        self.selected = None;
        self.state = TurnState::Idle;
        self.push_actions(out);
        out.push(Event::PlayerTurnStarted);
        tracing::info!(units = self.movable.len(), "player turn started");
    }

    fn push_actions(&self, out: &mut Vec<Event>) {
        out.push(Event::ActionsChanged {
            movable: self.movable.clone(),
            attackable: self.attackable.clone(),
        });
    }

    /// Returns `true` once the battle is over, announcing the outcome the
    /// first time it is detected.
    fn check_victory(&mut self, out: &mut Vec<Event>) -> bool {
        if self.outcome.is_some() {
            return true;
        }

        let outcome = if query::characters(&self.world, Faction::Enemy).is_empty() {
            BattleOutcome::PlayerWon
        } else if query::characters(&self.world, Faction::Player).is_empty() {
            BattleOutcome::PlayerLost
        } else {
            return false;
        };

        self.outcome = Some(outcome);
        self.apply(Command::ClearSelection, out);
        self.selected = None;
        self.state = TurnState::Idle;
        tracing::info!(player_won = outcome.player_won(), "battle over");
        out.push(Event::BattleOver {
            player_won: outcome.player_won(),
        });
        true
    }

    fn apply(&mut self, command: Command, out: &mut Vec<Event>) {
        world::apply(&mut self.world, command, out);
    }

    fn drive(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let mut sequencer = std::mem::take(&mut self.sequencer);
        sequencer.run(dt, |step, continuation| self.execute(step, continuation, out));
        self.sequencer = sequencer;
    }

    fn execute(
        &mut self,
        step: Step,
        continuation: &mut Continuation<Step>,
        out: &mut Vec<Event>,
    ) -> Completion {
        match step {
            Step::PlayerMove { unit, path } => {
                let started = self.begin_move(unit, path, out, |unit, from, to| {
                    Step::FinishPlayerMove { unit, from, to }
                });
                started.map_or(Completion::Ready, |(follow_up, duration)| {
                    continuation.then(follow_up);
                    Completion::After(duration)
                })
            }
            Step::FinishPlayerMove { unit, from, to } => {
                self.finish_player_move(unit, from, to, out);
                Completion::Ready
            }
            Step::AutomatedTurn(unit) => self.automated_turn(unit, continuation, out),
            Step::FinishAutomatedMove { unit, from, to } => {
                self.apply(Command::CompleteMove { unit, from, to }, out);
                if self.outcome.is_none() {
                    let mut commands = Vec::new();
                    self.opponent
                        .follow_up(unit, &query::unit_view(&self.world), &mut commands);
                    for command in commands {
                        self.apply(command, out);
                    }
                    let _ = self.check_victory(out);
                }
                Completion::Ready
            }
            Step::FinishAutomatedPhase => {
                if !self.check_victory(out) {
                    self.start_player_turn(out);
                }
                Completion::Ready
            }
        }
    }

    fn begin_move<F>(
        &mut self,
        unit: UnitId,
        path: Vec<TileCoord>,
        out: &mut Vec<Event>,
        finish: F,
    ) -> Option<(Step, Duration)>
    where
        F: FnOnce(UnitId, TileCoord, TileCoord) -> Step,
    {
        let start = out.len();
        self.apply(Command::ResolveMove { unit, path }, out);
        let (from, to, duration) = out[start..].iter().find_map(|event| match event {
            Event::UnitMoveStarted {
                unit: moved,
                from,
                to,
                duration,
            } if *moved == unit => Some((*from, *to, *duration)),
            _ => None,
        })?;
        Some((finish(unit, from, to), duration))
    }

    fn finish_player_move(
        &mut self,
        unit: UnitId,
        from: TileCoord,
        to: TileCoord,
        out: &mut Vec<Event>,
    ) {
        self.apply(Command::CompleteMove { unit, from, to }, out);
        self.movable.retain(|candidate| *candidate != unit);
        self.push_actions(out);
        if self.check_victory(out) {
            return;
        }

        let next = if self.attackable.contains(&unit) {
            Some(unit)
        } else {
            self.next_actionable()
        };
        match next {
            Some(next) => self.select(next, out),
            None => {
                self.apply(Command::ClearSelection, out);
                self.selected = None;
                self.state = TurnState::Idle;
            }
        }
    }

    fn automated_turn(
        &mut self,
        unit: UnitId,
        continuation: &mut Continuation<Step>,
        out: &mut Vec<Event>,
    ) -> Completion {
        if self.outcome.is_some() {
            return Completion::Ready;
        }

        let mut commands = Vec::new();
        self.opponent.handle(
            unit,
            &query::unit_view(&self.world),
            query::occupancy_view(&self.world),
            &mut commands,
        );

        let mut completion = Completion::Ready;
        for command in commands {
            match command {
                Command::ResolveMove { unit, path } => {
                    let started = self.begin_move(unit, path, out, |unit, from, to| {
                        Step::FinishAutomatedMove { unit, from, to }
                    });
                    if let Some((follow_up, duration)) = started {
                        continuation.then(follow_up);
                        completion = Completion::After(duration);
                    }
                }
                command => {
                    self.apply(command, out);
                    let _ = self.check_victory(out);
                }
            }
        }
        completion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::{CharacterStats, LevelLayout, Placement};

    fn character(x: i32, y: i32, faction: Faction) -> Placement {
        Placement::character(TileCoord::new(x, y), faction, CharacterStats::default())
    }

    fn controller(placements: Vec<Placement>) -> (BattleController, Vec<Event>) {
        let world = World::from_layout(&LevelLayout::new(5, 5, placements)).expect("valid layout");
        let mut events = Vec::new();
        let controller = BattleController::new(world, &mut events);
        (controller, events)
    }

    #[test]
    fn first_turn_grants_every_player_character_both_actions() {
        let (controller, events) = controller(vec![
            character(0, 0, Faction::Player),
            character(4, 4, Faction::Enemy),
            character(1, 0, Faction::Player),
        ]);

        let players = vec![UnitId::new(0), UnitId::new(2)];
        assert_eq!(controller.movable(), players.as_slice());
        assert_eq!(controller.attackable(), players.as_slice());
        assert_eq!(controller.turn_state(), TurnState::Idle);
        assert_eq!(
            events,
            vec![
                Event::ActionsChanged {
                    movable: players.clone(),
                    attackable: players,
                },
                Event::PlayerTurnStarted,
            ]
        );
    }

    #[test]
    fn battle_without_enemies_is_won_immediately() {
        let (controller, events) = controller(vec![character(0, 0, Faction::Player)]);
        assert_eq!(controller.outcome(), Some(BattleOutcome::PlayerWon));
        assert_eq!(events, vec![Event::BattleOver { player_won: true }]);
    }

    #[test]
    fn out_of_bounds_click_is_reported_and_ignored() {
        let (mut controller, _) = controller(vec![
            character(0, 0, Faction::Player),
            character(4, 4, Faction::Enemy),
        ]);
        let mut events = Vec::new();
        controller.handle(
            Intent::Click {
                tile: TileCoord::new(-1, 7),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::ClickOutOfBounds {
                tile: TileCoord::new(-1, 7)
            }]
        );
        assert_eq!(controller.turn_state(), TurnState::Idle);
    }

    #[test]
    fn clicks_on_enemies_or_obstacles_while_idle_are_ignored() {
        let (mut controller, _) = controller(vec![
            character(0, 0, Faction::Player),
            character(4, 4, Faction::Enemy),
            Placement::obstacle(TileCoord::new(2, 2)),
        ]);
        let mut events = Vec::new();
        for tile in [
            TileCoord::new(4, 4),
            TileCoord::new(2, 2),
            TileCoord::new(3, 3),
        ] {
            controller.handle(Intent::Click { tile }, &mut events);
        }
        assert!(events.is_empty());
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn move_waits_for_its_modeled_duration() {
        let (mut controller, _) = controller(vec![
            character(0, 0, Faction::Player),
            character(4, 4, Faction::Enemy),
        ]);
        let player = UnitId::new(0);
        let mut events = Vec::new();
        controller.handle(
            Intent::Click {
                tile: TileCoord::new(0, 0),
            },
            &mut events,
        );
        controller.handle(
            Intent::Click {
                tile: TileCoord::new(0, 2),
            },
            &mut events,
        );

        assert_eq!(controller.turn_state(), TurnState::ActionInProgress);
        assert!(controller.is_busy());
        assert_eq!(
            query::occupant_at(controller.world(), TileCoord::new(0, 2)),
            Some(player)
        );

        events.clear();
        controller.advance(Duration::from_millis(399), &mut events);
        assert!(events.is_empty());
        controller.advance(Duration::from_millis(1), &mut events);

        assert_eq!(
            events.first(),
            Some(&Event::UnitMoved {
                unit: player,
                from: TileCoord::new(0, 0),
                to: TileCoord::new(0, 2),
            })
        );
        assert!(!controller.is_busy());
        assert_eq!(controller.turn_state(), TurnState::CharacterSelected);
        assert_eq!(controller.selected(), Some(player));
        assert!(controller.movable().is_empty());
        assert_eq!(controller.attackable(), &[player]);
    }
}
