//! Collision, Combat & Lifecycle
//!
//! Interactions are detected from the state at the start of the pass, damage
//! for every pair is computed from that same pre-damage state, accumulated in a
//! [`DamageMap`], and only then applied in entity id order. The order pairs are
//! visited in therefore never changes the outcome.

use std::collections::BTreeMap;

use crate::game::config::GameConstants;
use crate::game::entity::{EntityId, PlayerId, ShipId};
use crate::game::events::Event;
use crate::game::world::World;

/// Pending damage per entity for the current turn.
pub type DamageMap = BTreeMap<EntityId, u32>;

/// Everything in range of everything else this turn.
#[derive(Debug, Default)]
pub struct Interactions {
    /// Interacting pairs, lower id first
    pub pairs: Vec<(EntityId, EntityId)>,
    /// Targets of every ship able to fire, in id order
    pub targets: BTreeMap<ShipId, Vec<EntityId>>,
}

/// Outcome of the combat pass.
#[derive(Debug, Default)]
pub struct CombatReport {
    pub damage: DamageMap,
    /// Weapon damage credited to each attacking player
    pub damage_dealt: BTreeMap<PlayerId, u64>,
}

/// Find every interacting pair.
///
/// Ships of different owners interact within `2 * ship_radius + weapon_radius`.
/// A ship interacts with a planet it does not own within
/// `ship_radius + planet_radius`. Planets never interact with each other.
pub fn detect_interactions(world: &World, constants: &GameConstants) -> Interactions {
    let mut interactions = Interactions::default();
    let attack_range = constants.ship_attack_range();
    let ships: Vec<_> = world.ships.values().collect();

    for (i, a) in ships.iter().enumerate() {
        for b in &ships[i + 1..] {
            if a.owner() == b.owner() || !a.position.within(b.position, attack_range) {
                continue;
            }
            interactions.pairs.push((EntityId::Ship(a.id), EntityId::Ship(b.id)));
            if a.can_attack() {
                interactions.targets.entry(a.id).or_default().push(EntityId::Ship(b.id));
            }
            if b.can_attack() {
                interactions.targets.entry(b.id).or_default().push(EntityId::Ship(a.id));
            }
        }
    }

    for ship in &ships {
        for planet in world.planets.values() {
            if planet.owner == Some(ship.owner()) {
                continue;
            }
            if ship.position.within(planet.position, constants.crash_range(planet.radius)) {
                interactions.pairs.push((EntityId::Ship(ship.id), EntityId::Planet(planet.id)));
            }
        }
    }

    interactions
}

/// Damage exchanged by one interacting pair, as `(to_a, to_b)`.
///
/// Ship/ship: a ship able to fire splits `weapon_damage` evenly (integer
/// division) across all of its targets. Ship/planet: the ship crashes and
/// both sides take damage equal to the ship's health.
pub fn compute_damage(
    world: &World,
    constants: &GameConstants,
    interactions: &Interactions,
    a: EntityId,
    b: EntityId,
) -> (u32, u32) {
    let volley = |attacker: ShipId| -> u32 {
        interactions
            .targets
            .get(&attacker)
            .map_or(0, |targets| constants.weapon_damage / targets.len() as u32)
    };

    match (a, b) {
        (EntityId::Ship(sa), EntityId::Ship(sb)) => (volley(sb), volley(sa)),
        (EntityId::Ship(ship), EntityId::Planet(_)) | (EntityId::Planet(_), EntityId::Ship(ship)) => {
            let health = world.ships.get(&ship).map_or(0, |s| s.health);
            (health, health)
        }
        (EntityId::Planet(_), EntityId::Planet(_)) => (0, 0),
    }
}

/// Detect interactions, accumulate damage and emit one Attack event per
/// firing ship. Firing ships start their weapon cooldown.
pub fn process_combat(world: &mut World, constants: &GameConstants, events: &mut Vec<Event>) -> CombatReport {
    let interactions = detect_interactions(world, constants);
    let mut report = CombatReport::default();

    for &(a, b) in &interactions.pairs {
        let (to_a, to_b) = compute_damage(world, constants, &interactions, a, b);
        for (target, amount, source) in [(a, to_a, b), (b, to_b, a)] {
            if amount == 0 {
                continue;
            }
            *report.damage.entry(target).or_insert(0) += amount;
            if let (EntityId::Ship(attacker), EntityId::Ship(_)) = (source, target) {
                *report.damage_dealt.entry(attacker.owner).or_insert(0) += amount as u64;
            }
        }
    }

    for (attacker, targets) in &interactions.targets {
        let Some(location) = world.ships.get(attacker).map(|s| s.position) else {
            continue;
        };
        let target_locations = targets
            .iter()
            .filter_map(|t| world.entity_position(*t))
            .collect();
        events.push(Event::Attack {
            entity: EntityId::Ship(*attacker),
            location,
            targets: targets.clone(),
            target_locations,
        });
        if let Some(ship) = world.ships.get_mut(attacker) {
            ship.weapon_cooldown = constants.weapon_cooldown;
        }
    }

    report
}

/// Apply accumulated damage in id order, destroying anything that reaches zero.
pub fn apply_damage(world: &mut World, constants: &GameConstants, damage: &DamageMap, events: &mut Vec<Event>) {
    for (&id, &amount) in damage {
        let destroyed = match id {
            EntityId::Ship(s) => world.ships.get_mut(&s).map(|ship| {
                ship.health = ship.health.saturating_sub(amount);
                ship.health == 0
            }),
            EntityId::Planet(p) => world.planets.get_mut(&p).map(|planet| {
                planet.health = planet.health.saturating_sub(amount);
                planet.health == 0
            }),
        };
        // None: already removed by an earlier cascade this turn
        if destroyed == Some(true) {
            kill_entity(world, constants, id, events);
        }
    }
}

/// Remove an entity and everything that depends on it.
///
/// A ship is detached from its planet; a planet takes every ship on its
/// docked list with it. Exactly one Destroyed event per removed entity.
pub fn kill_entity(world: &mut World, constants: &GameConstants, id: EntityId, events: &mut Vec<Event>) {
    match id {
        EntityId::Ship(ship_id) => {
            let Some(ship) = world.ships.remove(&ship_id) else {
                return;
            };
            if let Some(planet) = ship.docking.planet().and_then(|p| world.planets.get_mut(&p)) {
                planet.detach(ship_id);
            }
            events.push(Event::Destroyed {
                entity: id,
                location: ship.position,
                radius: constants.explosion_radius,
            });
        }
        EntityId::Planet(planet_id) => {
            let Some(planet) = world.planets.remove(&planet_id) else {
                return;
            };
            events.push(Event::Destroyed {
                entity: id,
                location: planet.position,
                radius: planet.radius,
            });
            for docked in planet.docked_ships {
                kill_entity(world, constants, EntityId::Ship(docked), events);
            }
        }
    }
}

/// Count every weapon cooldown down by one turn.
pub fn process_cooldowns(world: &mut World) {
    for ship in world.ships.values_mut() {
        ship.weapon_cooldown = ship.weapon_cooldown.saturating_sub(1);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;
    use crate::core::vec2::FixedVec2;
    use crate::game::entity::{DockingStatus, PlanetId};
    use proptest::prelude::*;

    fn duel(distance: i32) -> (World, GameConstants, ShipId, ShipId) {
        let mut world = World::new(from_int(200), from_int(200), 2);
        let a = world.spawn_ship(PlayerId(0), FixedVec2::from_ints(50, 50), 255);
        let b = world.spawn_ship(PlayerId(1), FixedVec2::from_ints(50 + distance, 50), 255);
        (world, GameConstants::default(), a, b)
    }

    #[test]
    fn test_opposing_ships_trade_full_volleys() {
        let (mut world, constants, a, b) = duel(5);
        let mut events = Vec::new();

        let report = process_combat(&mut world, &constants, &mut events);
        apply_damage(&mut world, &constants, &report.damage, &mut events);

        assert_eq!(world.ships[&a].health, 255 - constants.weapon_damage);
        assert_eq!(world.ships[&b].health, 255 - constants.weapon_damage);

        let attacks: Vec<_> = events.iter().filter(|e| e.kind() == "attack").collect();
        assert_eq!(attacks.len(), 2);
        for event in attacks {
            if let Event::Attack { entity, targets, .. } = event {
                let other = if *entity == EntityId::Ship(a) { b } else { a };
                assert_eq!(targets, &vec![EntityId::Ship(other)]);
            }
        }
        assert_eq!(report.damage_dealt[&PlayerId(0)], constants.weapon_damage as u64);
    }

    fn dock_at(world: &mut World, ship: ShipId, planet: PlanetId) {
        if let Some(s) = world.ships.get_mut(&ship) {
            s.docking = DockingStatus::Docked { planet };
        }
        if let Some(p) = world.planets.get_mut(&planet) {
            p.docked_ships.push(ship);
            p.owner = Some(ship.owner);
        }
    }

    #[test]
    fn test_range_is_inclusive() {
        let (mut world, constants, _, b) = duel(6);
        assert_eq!(detect_interactions(&world, &constants).pairs.len(), 1);

        if let Some(ship) = world.ships.get_mut(&b) {
            ship.position.x += 1;
        }
        assert!(detect_interactions(&world, &constants).pairs.is_empty());
    }

    #[test]
    fn test_damage_split_across_targets() {
        let (mut world, constants, a, _) = duel(3);
        world.spawn_ship(PlayerId(1), FixedVec2::from_ints(50, 53), 255);

        let mut events = Vec::new();
        let report = process_combat(&mut world, &constants, &mut events);

        // a has two targets, each enemy has one
        assert_eq!(report.damage[&EntityId::Ship(a)], constants.weapon_damage * 2);
        assert_eq!(
            report.damage[&EntityId::Ship(ShipId::new(PlayerId(1), 0))],
            constants.weapon_damage / 2
        );
    }

    #[test]
    fn test_cooldown_and_docked_ships_hold_fire() {
        let (mut world, constants, a, b) = duel(4);
        if let Some(ship) = world.ships.get_mut(&a) {
            ship.weapon_cooldown = 1;
        }
        if let Some(ship) = world.ships.get_mut(&b) {
            ship.docking = DockingStatus::Docked { planet: PlanetId(0) };
        }

        let mut events = Vec::new();
        let report = process_combat(&mut world, &constants, &mut events);

        assert!(report.damage.is_empty());
        assert!(events.is_empty());

        process_cooldowns(&mut world);
        assert_eq!(world.ships[&a].weapon_cooldown, 0);
    }

    #[test]
    fn test_same_owner_never_interacts() {
        let mut world = World::new(from_int(100), from_int(100), 1);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(10, 10), 255);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(11, 10), 255);
        assert!(detect_interactions(&world, &GameConstants::default()).pairs.is_empty());
    }

    #[test]
    fn test_crash_into_planet() {
        let constants = GameConstants::default();
        let mut world = World::new(from_int(100), from_int(100), 1);
        let planet = world.add_planet(FixedVec2::from_ints(50, 50), from_int(5), 1000, 2);
        let ship = world.spawn_ship(PlayerId(0), FixedVec2::from_ints(55, 50), 200);

        let mut events = Vec::new();
        let report = process_combat(&mut world, &constants, &mut events);
        apply_damage(&mut world, &constants, &report.damage, &mut events);

        assert!(!world.ships.contains_key(&ship));
        assert_eq!(world.planets[&planet].health, 800);
        assert_eq!(events.len(), 1);
        assert!(report.damage_dealt.is_empty());
    }

    #[test]
    fn test_planet_destruction_cascades() {
        let constants = GameConstants::default();
        let mut world = World::new(from_int(100), from_int(100), 2);
        let planet = world.add_planet(FixedVec2::from_ints(50, 50), from_int(5), 1000, 3);
        for y in [44, 50, 56] {
            let ship = world.spawn_ship(PlayerId(0), FixedVec2::from_ints(57, y), 255);
            dock_at(&mut world, ship, planet);
        }

        let mut events = Vec::new();
        kill_entity(&mut world, &constants, EntityId::Planet(planet), &mut events);

        assert_eq!(events.len(), 4);
        assert!(world.ships.is_empty());
        assert!(events.iter().all(|e| e.kind() == "destroyed"));
        if let Event::Destroyed { radius, .. } = &events[0] {
            assert_eq!(*radius, from_int(5));
        }
    }

    #[test]
    fn test_destroyed_docked_ship_releases_planet() {
        let constants = GameConstants::default();
        let mut world = World::new(from_int(100), from_int(100), 1);
        let planet = world.add_planet(FixedVec2::from_ints(50, 50), from_int(5), 1000, 3);
        let ship = world.spawn_ship(PlayerId(0), FixedVec2::from_ints(57, 50), 255);
        dock_at(&mut world, ship, planet);

        let mut events = Vec::new();
        kill_entity(&mut world, &constants, EntityId::Ship(ship), &mut events);

        assert_eq!(world.planets[&planet].owner, None);
        assert!(world.planets[&planet].docked_ships.is_empty());
    }

    proptest! {
        #[test]
        fn prop_damage_independent_of_pair_order(
            positions in prop::collection::vec((0i32..30, 0i32..30, 0u8..3), 2..12)
        ) {
            let constants = GameConstants::default();
            let mut world = World::new(from_int(30), from_int(30), 3);
            for (x, y, owner) in positions {
                world.spawn_ship(PlayerId(owner), FixedVec2::from_ints(x, y), 255);
            }

            let interactions = detect_interactions(&world, &constants);
            let accumulate = |pairs: &[(EntityId, EntityId)]| {
                let mut damage = DamageMap::new();
                for &(a, b) in pairs {
                    let (to_a, to_b) = compute_damage(&world, &constants, &interactions, a, b);
                    *damage.entry(a).or_insert(0) += to_a;
                    *damage.entry(b).or_insert(0) += to_b;
                }
                damage
            };

            let forward = accumulate(&interactions.pairs);
            let mut reversed_pairs = interactions.pairs.clone();
            reversed_pairs.reverse();
            let reversed = accumulate(&reversed_pairs);
            prop_assert_eq!(forward, reversed);
        }

        #[test]
        fn prop_volley_never_exceeds_weapon_damage(
            positions in prop::collection::vec((0i32..20, 0i32..20, 0u8..2), 2..10)
        ) {
            let constants = GameConstants::default();
            let mut world = World::new(from_int(20), from_int(20), 2);
            for (x, y, owner) in positions {
                world.spawn_ship(PlayerId(owner), FixedVec2::from_ints(x, y), 255);
            }
            let mut events = Vec::new();
            let report = process_combat(&mut world, &constants, &mut events);
            let attackers = events.len() as u64;
            let dealt: u64 = report.damage_dealt.values().sum();
            prop_assert!(dealt <= attackers * constants.weapon_damage as u64);
        }
    }
}
