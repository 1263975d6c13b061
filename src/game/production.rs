//! Production & Spawning
//!
//! Owned planets accumulate credit for every fully docked ship. Crossing the
//! cost threshold spawns one ship near the planet per turn; any excess credit
//! carries over.

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::game::config::GameConstants;
use crate::game::entity::{DockingStatus, EntityId, Planet, PlayerId};
use crate::game::events::Event;
use crate::game::world::World;

/// Angular step between spawn candidates.
const SPAWN_STEP_DEGREES: i32 = 15;

/// Run production for every planet. Returns the owners of spawned ships,
/// one entry per spawn.
pub fn process_production(world: &mut World, constants: &GameConstants, events: &mut Vec<Event>) -> Vec<PlayerId> {
    let mut spawned = Vec::new();
    let planet_ids: Vec<_> = world.planets.keys().copied().collect();

    for planet_id in planet_ids {
        let Some(planet) = world.planets.get(&planet_id) else {
            continue;
        };
        let Some(owner) = planet.owner else {
            continue;
        };

        let docked = planet
            .docked_ships
            .iter()
            .filter(|id| {
                world.ships.get(id).is_some_and(|s| matches!(s.docking, DockingStatus::Docked { .. }))
            })
            .count() as u32;
        let credit = planet.production + constants.productivity_per_ship * docked;

        let spawn_at = if credit >= constants.production_per_ship {
            find_spawn_location(world, constants, planet)
        } else {
            None
        };
        let planet_location = planet.position;

        let remaining = match spawn_at {
            Some(location) => {
                let ship = world.spawn_ship(owner, location, constants.base_ship_health);
                events.push(Event::Spawn {
                    entity: EntityId::Ship(ship),
                    location,
                    planet_location,
                });
                spawned.push(owner);
                credit - constants.production_per_ship
            }
            None => credit,
        };

        if let Some(planet) = world.planets.get_mut(&planet_id) {
            planet.production = remaining;
        }
    }

    spawned
}

/// First free spot around `planet`, scanning outward from the direction of
/// the map centre in alternating angular steps.
pub fn find_spawn_location(world: &World, constants: &GameConstants, planet: &Planet) -> Option<FixedVec2> {
    let distance = constants.spawn_distance(planet.radius);
    let toward_center = world.center() - planet.position;
    let base = if toward_center == FixedVec2::ZERO {
        FixedVec2::RIGHT
    } else {
        toward_center.normalize()
    };
    let offset = base.scale(distance);

    let mut step = 0;
    while step * SPAWN_STEP_DEGREES <= 180 {
        let angles = if step == 0 || step * SPAWN_STEP_DEGREES == 180 {
            vec![step * SPAWN_STEP_DEGREES]
        } else {
            vec![step * SPAWN_STEP_DEGREES, -step * SPAWN_STEP_DEGREES]
        };
        for angle in angles {
            let candidate = planet.position + offset.rotate_degrees(angle);
            if is_free(world, constants, candidate) {
                return Some(candidate);
            }
        }
        step += 1;
    }
    None
}

fn is_free(world: &World, constants: &GameConstants, location: FixedVec2) -> bool {
    let r: Fixed = constants.ship_radius;
    location.is_in_bounds(world.width, world.height)
        && !world.ships.values().any(|s| s.position.within(location, r * 2))
        && !world.planets.values().any(|p| p.position.within(location, p.radius + r))
}
