//! Movement & Drag
//!
//! Thrust accumulates into velocity; velocity integrates into position once
//! per turn; drag bleeds speed off afterwards. Docked ships never move.

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::game::config::GameConstants;
use crate::game::entity::Ship;
use crate::game::world::World;

/// Apply a thrust command to a ship's velocity.
///
/// Magnitude is clamped to `[0, max_acceleration]` and the resulting speed
/// to `max_speed`.
pub fn apply_thrust(ship: &mut Ship, magnitude: Fixed, angle_degrees: i32, constants: &GameConstants) {
    let magnitude = magnitude.clamp(0, constants.max_acceleration);
    let thrust = FixedVec2::from_polar(magnitude, angle_degrees);
    ship.velocity = (ship.velocity + thrust).clamp_length(constants.max_speed);
}

/// Integrate velocity into position for every undocked ship.
pub fn process_movement(world: &mut World) {
    let (width, height) = (world.width, world.height);
    for ship in world.ships.values_mut() {
        if !ship.is_undocked() || ship.velocity == FixedVec2::ZERO {
            continue;
        }
        ship.position = (ship.position + ship.velocity).clamp_to_bounds(width, height);
    }
}

/// Reduce every ship's speed by the drag amount, never reversing it.
pub fn process_drag(world: &mut World, constants: &GameConstants) {
    for ship in world.ships.values_mut() {
        ship.velocity = ship.velocity.shorten(constants.drag);
    }
}
