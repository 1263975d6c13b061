//! Docking
//!
//! Linear timers drive the docking state machine:
//!
//! ```text
//! Undocked ──dock──▶ Docking(n) ──n turns──▶ Docked
//!     ▲                                        │
//!     └──────── Undocking(n) ◀──undock─────────┘
//! ```
//!
//! A ship is listed on its planet from the moment docking starts until
//! undocking completes.

use crate::core::vec2::FixedVec2;
use crate::game::config::GameConstants;
use crate::game::entity::{DockingStatus, PlanetId, ShipId};
use crate::game::world::World;

/// Whether `ship` may start docking at `planet` right now.
pub fn can_dock(world: &World, constants: &GameConstants, ship: ShipId, planet: PlanetId) -> bool {
    let (Some(s), Some(p)) = (world.ships.get(&ship), world.planets.get(&planet)) else {
        return false;
    };
    s.is_undocked()
        && p.has_free_spot()
        && p.accepts(s.owner())
        && s.position.within(p.position, constants.dock_range(p.radius))
}

/// Start docking. The ship stops and the planet is claimed for its owner.
///
/// Returns false (no change) when docking is not currently legal.
pub fn begin_dock(world: &mut World, constants: &GameConstants, ship: ShipId, planet: PlanetId) -> bool {
    if !can_dock(world, constants, ship, planet) {
        return false;
    }
    if let Some(s) = world.ships.get_mut(&ship) {
        s.velocity = FixedVec2::ZERO;
        s.docking = DockingStatus::Docking { planet, turns_left: constants.dock_turns };
    }
    if let Some(p) = world.planets.get_mut(&planet) {
        p.docked_ships.push(ship);
        p.owner = Some(ship.owner);
    }
    true
}

/// Start undocking a fully docked ship. Anything else is a no-op.
pub fn begin_undock(world: &mut World, constants: &GameConstants, ship: ShipId) {
    if let Some(s) = world.ships.get_mut(&ship) {
        if let DockingStatus::Docked { planet } = s.docking {
            s.docking = DockingStatus::Undocking { planet, turns_left: constants.dock_turns };
        }
    }
}

/// Advance every docking timer by one turn.
pub fn process_docking(world: &mut World) {
    let mut released = Vec::new();

    for ship in world.ships.values_mut() {
        match ship.docking {
            DockingStatus::Docking { planet, turns_left } => {
                let turns_left = turns_left.saturating_sub(1);
                ship.docking = if turns_left == 0 {
                    DockingStatus::Docked { planet }
                } else {
                    DockingStatus::Docking { planet, turns_left }
                };
            }
            DockingStatus::Undocking { planet, turns_left } => {
                let turns_left = turns_left.saturating_sub(1);
                if turns_left == 0 {
                    ship.docking = DockingStatus::Undocked;
                    released.push((ship.id, planet));
                } else {
                    ship.docking = DockingStatus::Undocking { planet, turns_left };
                }
            }
            DockingStatus::Undocked | DockingStatus::Docked { .. } => {}
        }
    }

    for (ship, planet) in released {
        if let Some(p) = world.planets.get_mut(&planet) {
            p.detach(ship);
        }
    }
}
