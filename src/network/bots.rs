//! In-Process Bots
//!
//! Simple strategies that answer instantly from the world snapshot. Used by
//! the demo binary and by tests; a bot can also be told to stall from a given
//! turn on, which exercises the timeout path.

use std::future::pending;
use tracing::debug;

use crate::core::fixed::{Fixed, FIXED_SCALE};
use crate::core::vec2::FixedVec2;
use crate::game::config::GameConstants;
use crate::game::docking::can_dock;
use crate::game::entity::{PlayerId, Ship};
use crate::game::moves::Move;
use crate::game::world::World;
use crate::network::transport::{format_commands, AgentHandle, TransportError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// Never issues a command
    Idle,
    /// Docks on the nearest free planet, fights when none is left
    Settler,
    /// Chases the nearest enemy ship
    Raider,
}

#[derive(Clone, Debug)]
pub struct BotAgent {
    behavior: Behavior,
    constants: GameConstants,
    player: PlayerId,
    stall_from: Option<u32>,
}

impl BotAgent {
    pub fn new(behavior: Behavior, constants: GameConstants) -> Self {
        Self {
            behavior,
            constants,
            player: PlayerId::default(),
            stall_from: None,
        }
    }

    /// Stop answering from `turn` on.
    pub fn stalling_from(mut self, turn: u32) -> Self {
        self.stall_from = Some(turn);
        self
    }

    /// Commands for this bot's ships, independent of any transport.
    pub fn decide(&self, world: &World) -> Vec<Move> {
        match self.behavior {
            Behavior::Idle => Vec::new(),
            Behavior::Settler => world
                .ships_of(self.player)
                .filter(|s| s.is_undocked())
                .filter_map(|s| self.settle(world, s).or_else(|| self.raid(world, s)))
                .collect(),
            Behavior::Raider => world
                .ships_of(self.player)
                .filter(|s| s.is_undocked())
                .filter_map(|s| self.raid(world, s))
                .collect(),
        }
    }

    fn settle(&self, world: &World, ship: &Ship) -> Option<Move> {
        let target = world
            .planets
            .values()
            .filter(|p| p.accepts(self.player) && p.has_free_spot())
            .min_by_key(|p| (ship.position.distance_squared(p.position), p.id))?;

        if can_dock(world, &self.constants, ship.id, target.id) {
            return Some(Move::Dock { ship: ship.id, planet: target.id });
        }
        let stop_short = self.constants.dock_range(target.radius) - self.constants.dock_radius / 2;
        Some(self.thrust_toward(ship, target.position, stop_short))
    }

    fn raid(&self, world: &World, ship: &Ship) -> Option<Move> {
        let target = world
            .ships
            .values()
            .filter(|s| s.owner() != self.player)
            .min_by_key(|s| (ship.position.distance_squared(s.position), s.id))?;

        let stop_short = self.constants.ship_attack_range() / 2;
        Some(self.thrust_toward(ship, target.position, stop_short))
    }

    fn thrust_toward(&self, ship: &Ship, target: FixedVec2, stop_short: Fixed) -> Move {
        let delta = target - ship.position;
        let travel = (delta.length() - stop_short).clamp(0, self.constants.max_speed);
        Move::Thrust {
            ship: ship.id,
            // Whole units, as a wire agent would send them
            magnitude: (travel >> FIXED_SCALE) << FIXED_SCALE,
            angle_degrees: delta.heading_degrees(),
        }
    }
}

impl AgentHandle for BotAgent {
    async fn initialize(&mut self, player: PlayerId, _world: &World) -> Result<String, TransportError> {
        self.player = player;
        Ok(format!("{:?}-{}", self.behavior, player.0).to_lowercase())
    }

    async fn request_commands(&mut self, turn: u32, world: &World) -> Result<Vec<Move>, TransportError> {
        if self.stall_from.is_some_and(|from| turn >= from) {
            pending::<()>().await;
        }
        let moves = self.decide(world);
        debug!(player = %self.player, turn, commands = %format_commands(&moves), "bot commands");
        Ok(moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;
    use crate::game::entity::ShipId;

    fn world() -> World {
        let mut world = World::new(from_int(100), from_int(100), 2);
        world.add_planet(FixedVec2::from_ints(50, 50), from_int(5), 1275, 2);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(10, 50), 255);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(57, 50), 255);
        world.spawn_ship(PlayerId(1), FixedVec2::from_ints(90, 90), 255);
        world
    }

    #[tokio::test]
    async fn test_settler_docks_or_approaches() {
        let world = world();
        let mut bot = BotAgent::new(Behavior::Settler, GameConstants::default());
        let name = bot.initialize(PlayerId(0), &world).await.expect("init");
        assert_eq!(name, "settler-0");

        let moves = bot.request_commands(1, &world).await.expect("commands");
        assert_eq!(moves.len(), 2);
        assert_eq!(
            moves[0],
            Move::Thrust { ship: ShipId::new(PlayerId(0), 0), magnitude: from_int(7), angle_degrees: 0 }
        );
        assert!(matches!(moves[1], Move::Dock { .. }));
    }

    #[tokio::test]
    async fn test_raider_heads_for_enemy() {
        let world = world();
        let mut bot = BotAgent::new(Behavior::Raider, GameConstants::default());
        bot.initialize(PlayerId(1), &world).await.expect("init");

        let moves = bot.request_commands(1, &world).await.expect("commands");
        assert_eq!(moves.len(), 1);
        // Nearest enemy is down-left of (90, 90)
        assert!(matches!(
            moves[0],
            Move::Thrust { angle_degrees, .. } if angle_degrees > 180 && angle_degrees < 270
        ));
    }

    #[tokio::test]
    async fn test_idle_bot_is_silent() {
        let world = world();
        let mut bot = BotAgent::new(Behavior::Idle, GameConstants::default());
        bot.initialize(PlayerId(0), &world).await.expect("init");
        assert!(bot.request_commands(1, &world).await.expect("commands").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalling_bot_never_answers() {
        let world = world();
        let mut bot = BotAgent::new(Behavior::Idle, GameConstants::default()).stalling_from(2);
        bot.initialize(PlayerId(0), &world).await.expect("init");
        assert!(bot.request_commands(1, &world).await.is_ok());

        let stalled = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            bot.request_commands(2, &world),
        )
        .await;
        assert!(stalled.is_err());
    }
}
