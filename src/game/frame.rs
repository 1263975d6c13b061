//! Frame Processor
//!
//! The authoritative turn loop. Owns the world, the alive set and the full
//! match history, and runs the passes in a fixed order:
//!
//! ```text
//! moves ─▶ movement ─▶ combat ─▶ damage ─▶ docking ─▶ production ─▶ drag ─▶ cooldowns ─▶ alive
//! ```
//!
//! Every pass is a function over `&mut World` plus the turn's event log.
//! Given the same initial world, constants, moves and timeouts the
//! processor produces identical worlds, events and hashes.

use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

use crate::game::combat::{apply_damage, process_combat, process_cooldowns};
use crate::game::config::GameConstants;
use crate::game::docking::process_docking;
use crate::game::events::Event;
use crate::game::movement::{process_drag, process_movement};
use crate::game::moves::{apply_moves, MoveQueue};
use crate::game::production::process_production;
use crate::game::stats::{PlayerStatistics, StatsTracker};
use crate::game::entity::PlayerId;
use crate::game::world::World;

/// Everything recorded over a match.
///
/// `worlds[0]` is the initial world; `worlds[k]`, `events[k - 1]`,
/// `moves[k - 1]` and `timeouts[k - 1]` belong to turn `k`.
#[derive(Clone, Debug, Default)]
pub struct History {
    pub worlds: Vec<World>,
    pub events: Vec<Vec<Event>>,
    pub moves: Vec<MoveQueue>,
    pub timeouts: Vec<BTreeSet<PlayerId>>,
    /// Players eliminated before turn 1 (failed initialization)
    pub initial_timeouts: BTreeSet<PlayerId>,
}

impl History {
    pub fn turns(&self) -> usize {
        self.events.len()
    }
}

/// Short summary of one processed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub turn: u32,
    pub events: usize,
    pub alive: usize,
    pub terminal: bool,
}

pub struct FrameProcessor {
    world: World,
    constants: GameConstants,
    turn: u32,
    max_turns: u32,
    eliminated: BTreeSet<PlayerId>,
    alive: BTreeSet<PlayerId>,
    stats: StatsTracker,
    history: History,
}

impl FrameProcessor {
    pub fn new(world: World, constants: GameConstants, max_turns: u32) -> Self {
        let alive = world.players().filter(|p| world.owns_any(*p)).collect();
        let stats = StatsTracker::new(&world);
        let history = History {
            worlds: vec![world.clone()],
            ..Default::default()
        };
        Self {
            world,
            constants,
            turn: 0,
            max_turns,
            eliminated: BTreeSet::new(),
            alive,
            stats,
            history,
        }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn constants(&self) -> &GameConstants {
        &self.constants
    }

    /// Players still taking part: not eliminated and owning an entity.
    pub fn alive_players(&self) -> &BTreeSet<PlayerId> {
        &self.alive
    }

    pub fn eliminated_players(&self) -> &BTreeSet<PlayerId> {
        &self.eliminated
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    /// The match is over at the turn limit, or when fewer than two players
    /// remain (a solo match runs until its player is gone).
    pub fn is_terminal(&self) -> bool {
        if self.turn >= self.max_turns {
            return true;
        }
        if self.world.player_count() <= 1 {
            self.alive.is_empty()
        } else {
            self.alive.len() < 2
        }
    }

    /// Eliminate players before the first turn (failed initialization).
    pub fn eliminate_before_start(&mut self, players: &BTreeSet<PlayerId>) {
        for player in players {
            self.stats.mark_eliminated(*player, &self.world);
            self.eliminated.insert(*player);
            self.alive.remove(player);
            self.history.initial_timeouts.insert(*player);
        }
    }

    pub fn record_init_response(&mut self, player: PlayerId, elapsed: Duration) {
        self.stats.record_init_response(player, elapsed);
    }

    pub fn record_frame_response(&mut self, player: PlayerId, elapsed: Duration) {
        self.stats.record_frame_response(player, elapsed);
    }

    /// Advance the world by one turn.
    ///
    /// Moves from players not alive at the start of the turn are ignored.
    /// Players in `timed_out` are eliminated after their `last_frame_alive`
    /// is stamped with this turn; their entities stay in the world.
    pub fn process_frame(&mut self, mut moves: MoveQueue, timed_out: &BTreeSet<PlayerId>) -> FrameSummary {
        self.turn += 1;
        let turn = self.turn;

        for player in &self.alive {
            self.stats.mark_alive(*player, turn);
        }
        for player in timed_out {
            if self.alive.remove(player) {
                self.stats.mark_eliminated(*player, &self.world);
            }
            if self.eliminated.insert(*player) {
                debug!(%player, turn, "player eliminated by timeout");
            }
        }
        moves.retain(|player, _| self.alive.contains(player));

        let mut events = Vec::new();

        // 1. Apply moves
        apply_moves(&mut self.world, &self.constants, &moves);

        // 2. Movement
        process_movement(&mut self.world);

        // 3. Collision and attack detection
        let report = process_combat(&mut self.world, &self.constants, &mut events);
        for (player, amount) in &report.damage_dealt {
            self.stats.record_damage(*player, *amount);
        }

        // 4. Damage application and destruction
        apply_damage(&mut self.world, &self.constants, &report.damage, &mut events);

        // 5. Docking timers
        process_docking(&mut self.world);

        // 6. Production and spawning
        for owner in process_production(&mut self.world, &self.constants, &mut events) {
            self.stats.record_spawn(owner);
        }

        // 7. Drag
        process_drag(&mut self.world, &self.constants);

        // 8. Cooldowns
        process_cooldowns(&mut self.world);

        // 9. Alive set
        let world = &self.world;
        let wiped_out: Vec<PlayerId> = self.alive.iter().copied().filter(|p| !world.owns_any(*p)).collect();
        for player in wiped_out {
            self.alive.remove(&player);
            self.stats.mark_eliminated(player, &self.world);
        }

        #[cfg(feature = "debug-tracing")]
        for event in &events {
            tracing::trace!(turn, event = %event.to_json(), "frame event");
        }

        let summary = FrameSummary {
            turn,
            events: events.len(),
            alive: self.alive.len(),
            terminal: self.is_terminal(),
        };

        self.history.worlds.push(self.world.clone());
        self.history.events.push(events);
        self.history.moves.push(moves);
        self.history.timeouts.push(timed_out.clone());

        summary
    }

    /// Final ranked statistics for the current state.
    pub fn statistics(&self) -> Vec<PlayerStatistics> {
        self.stats.finish(&self.world, &self.alive)
    }
}

// =============================================================================
// TESTS
// =============================================================================
