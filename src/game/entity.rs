//! Entity Definitions
//!
//! Ids, ships and planets. Entities never hold references to each other;
//! relationships are ids resolved through the [`World`](super::world::World)
//! registry.

use std::fmt;
use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;

// =============================================================================
// IDS
// =============================================================================

/// Player tag, stable for the whole match.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Ship identifier. Indices are allocated per owner and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShipId {
    pub owner: PlayerId,
    pub index: u32,
}

impl ShipId {
    pub const fn new(owner: PlayerId, index: u32) -> Self {
        Self { owner, index }
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:s{}", self.owner, self.index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlanetId(pub u32);

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "planet{}", self.0)
    }
}

/// Any entity in the world.
///
/// Variant order matters: ships sort before planets, ships grouped by owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Ship(ShipId),
    Planet(PlanetId),
}

impl EntityId {
    /// JSON form used in replay events.
    pub fn to_json(self) -> Value {
        match self {
            EntityId::Ship(id) => json!({
                "type": "ship",
                "owner": id.owner.0,
                "id": id.index,
            }),
            EntityId::Planet(id) => json!({
                "type": "planet",
                "id": id.0,
            }),
        }
    }
}

impl From<ShipId> for EntityId {
    fn from(id: ShipId) -> Self {
        EntityId::Ship(id)
    }
}

impl From<PlanetId> for EntityId {
    fn from(id: PlanetId) -> Self {
        EntityId::Planet(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Ship(id) => id.fmt(f),
            EntityId::Planet(id) => id.fmt(f),
        }
    }
}

// =============================================================================
// SHIP
// =============================================================================

/// Docking state machine of a ship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DockingStatus {
    #[default]
    Undocked,
    Docking { planet: PlanetId, turns_left: u32 },
    Docked { planet: PlanetId },
    Undocking { planet: PlanetId, turns_left: u32 },
}

impl DockingStatus {
    /// Planet this ship is attached to, if any.
    pub fn planet(self) -> Option<PlanetId> {
        match self {
            DockingStatus::Undocked => None,
            DockingStatus::Docking { planet, .. }
            | DockingStatus::Docked { planet }
            | DockingStatus::Undocking { planet, .. } => Some(planet),
        }
    }

    fn hash_tag(self) -> u8 {
        match self {
            DockingStatus::Undocked => 0,
            DockingStatus::Docking { .. } => 1,
            DockingStatus::Docked { .. } => 2,
            DockingStatus::Undocking { .. } => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub position: FixedVec2,
    pub velocity: FixedVec2,
    pub health: u32,
    pub docking: DockingStatus,
    /// Turns until the weapon may fire again (0 = ready)
    pub weapon_cooldown: u32,
}

impl Ship {
    pub fn new(id: ShipId, position: FixedVec2, health: u32) -> Self {
        Self {
            id,
            position,
            velocity: FixedVec2::ZERO,
            health,
            docking: DockingStatus::Undocked,
            weapon_cooldown: 0,
        }
    }

    #[inline]
    pub fn owner(&self) -> PlayerId {
        self.id.owner
    }

    #[inline]
    pub fn is_undocked(&self) -> bool {
        self.docking == DockingStatus::Undocked
    }

    /// Undocked with the weapon ready.
    #[inline]
    pub fn can_attack(&self) -> bool {
        self.is_undocked() && self.weapon_cooldown == 0
    }

    pub(crate) fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.id.owner.0);
        hasher.update_u32(self.id.index);
        hasher.update_vec2(self.position);
        hasher.update_vec2(self.velocity);
        hasher.update_u32(self.health);
        hasher.update_u8(self.docking.hash_tag());
        match self.docking {
            DockingStatus::Undocked => {}
            DockingStatus::Docked { planet } => hasher.update_u32(planet.0),
            DockingStatus::Docking { planet, turns_left }
            | DockingStatus::Undocking { planet, turns_left } => {
                hasher.update_u32(planet.0);
                hasher.update_u32(turns_left);
            }
        }
        hasher.update_u32(self.weapon_cooldown);
    }
}

// =============================================================================
// PLANET
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub position: FixedVec2,
    pub radius: Fixed,
    pub health: u32,
    pub owner: Option<PlayerId>,
    pub docking_spots: u32,
    /// Ships attached to this planet, in attach order
    pub docked_ships: Vec<ShipId>,
    /// Accumulated production toward the next ship
    pub production: u32,
}

impl Planet {
    pub fn new(id: PlanetId, position: FixedVec2, radius: Fixed, health: u32, docking_spots: u32) -> Self {
        Self {
            id,
            position,
            radius,
            health,
            owner: None,
            docking_spots,
            docked_ships: Vec::new(),
            production: 0,
        }
    }

    #[inline]
    pub fn has_free_spot(&self) -> bool {
        (self.docked_ships.len() as u32) < self.docking_spots
    }

    /// Unowned planets accept anyone; owned planets only their owner.
    #[inline]
    pub fn accepts(&self, player: PlayerId) -> bool {
        self.owner.map_or(true, |owner| owner == player)
    }

    /// Remove a ship from the docked list; the planet is released when empty.
    pub fn detach(&mut self, ship: ShipId) {
        self.docked_ships.retain(|id| *id != ship);
        if self.docked_ships.is_empty() {
            self.owner = None;
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_vec2(self.position);
        hasher.update_fixed(self.radius);
        hasher.update_u32(self.health);
        hasher.update_u8(self.owner.map_or(u8::MAX, |p| p.0));
        hasher.update_u32(self.docking_spots);
        hasher.update_len(self.docked_ships.len());
        for ship in &self.docked_ships {
            hasher.update_u8(ship.owner.0);
            hasher.update_u32(ship.index);
        }
        hasher.update_u32(self.production);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;

    #[test]
    fn test_entity_ordering_ships_before_planets() {
        let ship = EntityId::Ship(ShipId::new(PlayerId(3), 99));
        let planet = EntityId::Planet(PlanetId(0));
        assert!(ship < planet);

        let a = ShipId::new(PlayerId(0), 5);
        let b = ShipId::new(PlayerId(1), 0);
        assert!(a < b, "ships are grouped by owner first");
    }

    #[test]
    fn test_entity_json() {
        let ship = EntityId::Ship(ShipId::new(PlayerId(1), 4)).to_json();
        assert_eq!(ship["type"], "ship");
        assert_eq!(ship["owner"], 1);
        assert_eq!(ship["id"], 4);

        let planet = EntityId::Planet(PlanetId(2)).to_json();
        assert_eq!(planet["type"], "planet");
        assert!(planet.get("owner").is_none());
    }

    #[test]
    fn test_planet_detach_releases_owner() {
        let mut planet = Planet::new(PlanetId(0), FixedVec2::ZERO, from_int(5), 1000, 2);
        let s1 = ShipId::new(PlayerId(0), 0);
        let s2 = ShipId::new(PlayerId(0), 1);
        planet.owner = Some(PlayerId(0));
        planet.docked_ships = vec![s1, s2];
        assert!(!planet.has_free_spot());

        planet.detach(s1);
        assert_eq!(planet.owner, Some(PlayerId(0)));
        planet.detach(s2);
        assert_eq!(planet.owner, None);
        assert!(planet.accepts(PlayerId(7)));
    }

    #[test]
    fn test_ship_can_attack() {
        let mut ship = Ship::new(ShipId::new(PlayerId(0), 0), FixedVec2::ZERO, 255);
        assert!(ship.can_attack());
        ship.weapon_cooldown = 1;
        assert!(!ship.can_attack());
        ship.weapon_cooldown = 0;
        ship.docking = DockingStatus::Docked { planet: PlanetId(0) };
        assert!(!ship.can_attack());
        assert_eq!(ship.docking.planet(), Some(PlanetId(0)));
    }
}
