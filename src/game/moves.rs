//! Player Moves
//!
//! A move is a per-ship command for one turn. Moves are validated against the
//! world snapshot when collected and re-checked when applied; invalid moves are
//! dropped, never fatal.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::fixed::Fixed;
use crate::game::config::GameConstants;
use crate::game::docking::{begin_dock, begin_undock, can_dock};
use crate::game::entity::{PlanetId, PlayerId, ShipId};
use crate::game::movement::apply_thrust;
use crate::game::world::World;

/// A single ship command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Thrust { ship: ShipId, magnitude: Fixed, angle_degrees: i32 },
    Dock { ship: ShipId, planet: PlanetId },
    Undock { ship: ShipId },
    Noop { ship: ShipId },
}

impl Move {
    pub fn ship(&self) -> ShipId {
        match *self {
            Move::Thrust { ship, .. }
            | Move::Dock { ship, .. }
            | Move::Undock { ship }
            | Move::Noop { ship } => ship,
        }
    }
}

/// Accepted moves per player for one turn.
pub type MoveQueue = BTreeMap<PlayerId, Vec<Move>>;

/// Why a move was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("ship {0} does not exist")]
    UnknownShip(ShipId),

    #[error("ship {ship} is not owned by {player}")]
    NotOwner { ship: ShipId, player: PlayerId },

    #[error("ship {0} already has a move this turn")]
    DuplicateShip(ShipId),

    #[error("ship {0} must be undocked")]
    NotUndocked(ShipId),

    #[error("negative thrust magnitude")]
    NegativeThrust,

    #[error("planet {0} does not exist")]
    UnknownPlanet(PlanetId),

    #[error("ship {ship} cannot dock at {planet}")]
    DockRefused { ship: ShipId, planet: PlanetId },
}

/// Check a single move's preconditions against the world.
pub fn validate_move(
    world: &World,
    constants: &GameConstants,
    player: PlayerId,
    mv: &Move,
) -> Result<(), MoveRejection> {
    let ship_id = mv.ship();
    if ship_id.owner != player {
        return Err(MoveRejection::NotOwner { ship: ship_id, player });
    }
    let ship = world.ships.get(&ship_id).ok_or(MoveRejection::UnknownShip(ship_id))?;

    match *mv {
        Move::Thrust { magnitude, .. } => {
            if magnitude < 0 {
                return Err(MoveRejection::NegativeThrust);
            }
            if !ship.is_undocked() {
                return Err(MoveRejection::NotUndocked(ship_id));
            }
        }
        Move::Dock { planet, .. } => {
            if !world.planets.contains_key(&planet) {
                return Err(MoveRejection::UnknownPlanet(planet));
            }
            if !can_dock(world, constants, ship_id, planet) {
                return Err(MoveRejection::DockRefused { ship: ship_id, planet });
            }
        }
        Move::Undock { .. } | Move::Noop { .. } => {}
    }
    Ok(())
}

/// Filter a raw batch down to the valid moves, first move per ship wins.
pub fn validate_batch(
    world: &World,
    constants: &GameConstants,
    player: PlayerId,
    moves: Vec<Move>,
) -> Vec<Move> {
    let mut seen = BTreeSet::new();
    let mut accepted = Vec::with_capacity(moves.len());

    for mv in moves {
        let result = if seen.insert(mv.ship()) {
            validate_move(world, constants, player, &mv)
        } else {
            Err(MoveRejection::DuplicateShip(mv.ship()))
        };
        match result {
            Ok(()) => accepted.push(mv),
            Err(reason) => debug!(%player, %reason, "dropping move"),
        }
    }
    accepted
}

/// Apply every queued move to the world, in player order.
///
/// Docking requests on one unowned planet from two or more different players
/// cancel each other.
pub fn apply_moves(world: &mut World, constants: &GameConstants, queue: &MoveQueue) {
    let mut dock_claims: BTreeMap<PlanetId, BTreeSet<PlayerId>> = BTreeMap::new();
    for (player, moves) in queue {
        for mv in moves {
            if let Move::Dock { planet, .. } = mv {
                let unowned = world.planets.get(planet).is_some_and(|p| p.owner.is_none());
                if unowned {
                    dock_claims.entry(*planet).or_default().insert(*player);
                }
            }
        }
    }
    let contested: BTreeSet<PlanetId> = dock_claims
        .into_iter()
        .filter(|(_, players)| players.len() > 1)
        .map(|(planet, _)| planet)
        .collect();

    for (player, moves) in queue {
        for mv in moves {
            if mv.ship().owner != *player {
                continue;
            }
            match *mv {
                Move::Thrust { ship, magnitude, angle_degrees } => {
                    if let Some(s) = world.ships.get_mut(&ship) {
                        if s.is_undocked() {
                            apply_thrust(s, magnitude, angle_degrees, constants);
                        }
                    }
                }
                Move::Dock { ship, planet } => {
                    if contested.contains(&planet) {
                        debug!(%ship, %planet, "contested dock cancelled");
                        continue;
                    }
                    if !begin_dock(world, constants, ship, planet) {
                        debug!(%ship, %planet, "dock no longer legal");
                    }
                }
                Move::Undock { ship } => begin_undock(world, constants, ship),
                Move::Noop { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;
    use crate::core::vec2::FixedVec2;
    use crate::game::entity::DockingStatus;

    fn setup() -> (World, GameConstants) {
        let mut world = World::new(from_int(100), from_int(100), 2);
        world.add_planet(FixedVec2::from_ints(50, 50), from_int(5), 1275, 1);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(42, 50), 255);
        world.spawn_ship(PlayerId(1), FixedVec2::from_ints(58, 50), 255);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(10, 10), 255);
        (world, GameConstants::default())
    }

    const P0S0: ShipId = ShipId::new(PlayerId(0), 0);
    const P0S1: ShipId = ShipId::new(PlayerId(0), 1);
    const P1S0: ShipId = ShipId::new(PlayerId(1), 0);

    #[test]
    fn test_validate_rejects_foreign_ship() {
        let (world, constants) = setup();
        let mv = Move::Noop { ship: P1S0 };
        assert_eq!(
            validate_move(&world, &constants, PlayerId(0), &mv),
            Err(MoveRejection::NotOwner { ship: P1S0, player: PlayerId(0) })
        );
    }

    #[test]
    fn test_validate_batch_first_move_wins() {
        let (world, constants) = setup();
        let moves = vec![
            Move::Thrust { ship: P0S0, magnitude: from_int(2), angle_degrees: 0 },
            Move::Noop { ship: P0S0 },
            Move::Noop { ship: ShipId::new(PlayerId(0), 9) },
            Move::Dock { ship: P0S1, planet: PlanetId(0) },
        ];
        let accepted = validate_batch(&world, &constants, PlayerId(0), moves);
        assert_eq!(accepted, vec![Move::Thrust { ship: P0S0, magnitude: from_int(2), angle_degrees: 0 }]);
    }

    #[test]
    fn test_contested_dock_cancels_both() {
        let (mut world, constants) = setup();
        let mut queue = MoveQueue::new();
        queue.insert(PlayerId(0), vec![Move::Dock { ship: P0S0, planet: PlanetId(0) }]);
        queue.insert(PlayerId(1), vec![Move::Dock { ship: P1S0, planet: PlanetId(0) }]);

        apply_moves(&mut world, &constants, &queue);

        assert_eq!(world.ships[&P0S0].docking, DockingStatus::Undocked);
        assert_eq!(world.ships[&P1S0].docking, DockingStatus::Undocked);
        assert_eq!(world.planets[&PlanetId(0)].owner, None);
    }

    #[test]
    fn test_uncontested_dock_applies() {
        let (mut world, constants) = setup();
        let mut queue = MoveQueue::new();
        queue.insert(PlayerId(0), vec![Move::Dock { ship: P0S0, planet: PlanetId(0) }]);

        apply_moves(&mut world, &constants, &queue);

        assert!(matches!(world.ships[&P0S0].docking, DockingStatus::Docking { .. }));
        assert_eq!(world.planets[&PlanetId(0)].docked_ships, vec![P0S0]);
    }

    #[test]
    fn test_thrust_updates_velocity_only() {
        let (mut world, constants) = setup();
        let mut queue = MoveQueue::new();
        queue.insert(PlayerId(0), vec![Move::Thrust { ship: P0S1, magnitude: from_int(3), angle_degrees: 90 }]);

        apply_moves(&mut world, &constants, &queue);

        let ship = &world.ships[&P0S1];
        assert_eq!(ship.velocity, FixedVec2::from_ints(0, 3));
        assert_eq!(ship.position, FixedVec2::from_ints(10, 10));
    }
}
