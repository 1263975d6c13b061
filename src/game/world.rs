//! World State
//!
//! Index-stable registry of ships and planets. Uses BTreeMap for
//! deterministic iteration order; every pass walks entities in id order.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::hash::{StateHash, StateHasher};
use crate::core::vec2::FixedVec2;
use crate::game::entity::{EntityId, Planet, PlanetId, PlayerId, Ship, ShipId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    pub width: Fixed,
    pub height: Fixed,
    pub ships: BTreeMap<ShipId, Ship>,
    pub planets: BTreeMap<PlanetId, Planet>,
    /// Next ship index per player, indexed by `PlayerId.0`
    next_ship_index: Vec<u32>,
}

impl World {
    pub fn new(width: Fixed, height: Fixed, player_count: u8) -> Self {
        Self {
            width,
            height,
            ships: BTreeMap::new(),
            planets: BTreeMap::new(),
            next_ship_index: vec![0; player_count as usize],
        }
    }

    pub fn player_count(&self) -> u8 {
        self.next_ship_index.len() as u8
    }

    /// All player ids, in order.
    pub fn players(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.player_count()).map(PlayerId)
    }

    pub fn center(&self) -> FixedVec2 {
        FixedVec2::new(self.width / 2, self.height / 2)
    }

    /// Create a ship with a fresh id for `owner`.
    pub fn spawn_ship(&mut self, owner: PlayerId, position: FixedVec2, health: u32) -> ShipId {
        if self.next_ship_index.len() <= owner.0 as usize {
            self.next_ship_index.resize(owner.0 as usize + 1, 0);
        }
        let slot = &mut self.next_ship_index[owner.0 as usize];
        let id = ShipId::new(owner, *slot);
        *slot += 1;
        self.ships.insert(id, Ship::new(id, position, health));
        id
    }

    /// Add a planet with the next free planet id.
    pub fn add_planet(&mut self, position: FixedVec2, radius: Fixed, health: u32, docking_spots: u32) -> PlanetId {
        let id = PlanetId(self.planets.keys().next_back().map_or(0, |last| last.0 + 1));
        self.planets.insert(id, Planet::new(id, position, radius, health, docking_spots));
        id
    }

    pub fn entity_position(&self, id: EntityId) -> Option<FixedVec2> {
        match id {
            EntityId::Ship(s) => self.ships.get(&s).map(|ship| ship.position),
            EntityId::Planet(p) => self.planets.get(&p).map(|planet| planet.position),
        }
    }

    /// Ships belonging to `player`, in id order.
    pub fn ships_of(&self, player: PlayerId) -> impl Iterator<Item = &Ship> {
        let start = ShipId::new(player, 0);
        let end = ShipId::new(player, u32::MAX);
        self.ships.range(start..=end).map(|(_, ship)| ship)
    }

    pub fn ship_count(&self, player: PlayerId) -> u32 {
        self.ships_of(player).count() as u32
    }

    pub fn total_ship_health(&self, player: PlayerId) -> u64 {
        self.ships_of(player).map(|s| s.health as u64).sum()
    }

    /// True while the player still owns at least one ship or planet.
    pub fn owns_any(&self, player: PlayerId) -> bool {
        self.ships_of(player).next().is_some()
            || self.planets.values().any(|p| p.owner == Some(player))
    }

    /// Compute hash of the world for verification.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_world();
        hasher.update_fixed(self.width);
        hasher.update_fixed(self.height);

        // BTreeMap guarantees sorted order
        hasher.update_len(self.ships.len());
        for ship in self.ships.values() {
            ship.hash_into(&mut hasher);
        }

        hasher.update_len(self.planets.len());
        for planet in self.planets.values() {
            planet.hash_into(&mut hasher);
        }

        hasher.update_len(self.next_ship_index.len());
        for next in &self.next_ship_index {
            hasher.update_u32(*next);
        }

        hasher.finalize()
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Serializable form of a [`World`], used by replays and the pipe protocol.
///
/// Entities are flat lists; map keys are implied by the ids they carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub width: Fixed,
    pub height: Fixed,
    pub ships: Vec<Ship>,
    pub planets: Vec<Planet>,
    pub next_ship_index: Vec<u32>,
}

impl From<&World> for WorldSnapshot {
    fn from(world: &World) -> Self {
        Self {
            width: world.width,
            height: world.height,
            ships: world.ships.values().cloned().collect(),
            planets: world.planets.values().cloned().collect(),
            next_ship_index: world.next_ship_index.clone(),
        }
    }
}

impl From<WorldSnapshot> for World {
    fn from(snapshot: WorldSnapshot) -> Self {
        Self {
            width: snapshot.width,
            height: snapshot.height,
            ships: snapshot.ships.into_iter().map(|s| (s.id, s)).collect(),
            planets: snapshot.planets.into_iter().map(|p| (p.id, p)).collect(),
            next_ship_index: snapshot.next_ship_index,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
