//! Balance Constants
//!
//! Every rule parameter of the simulation lives in [`GameConstants`]. The
//! constants travel with the replay so a recorded match can be re-simulated
//! under exactly the rules it was played with.
//!
//! Distances are raw Q16.16 values when (de)serialized.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, to_fixed, from_int};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConstants {
    /// Collision radius of every ship
    pub ship_radius: Fixed,
    /// Health of a freshly spawned ship
    pub base_ship_health: u32,
    /// Weapon reach beyond the two hulls
    pub weapon_radius: Fixed,
    /// Damage per volley, split across all targets
    pub weapon_damage: u32,
    /// Turns between volleys
    pub weapon_cooldown: u32,
    /// Visual radius reported for destroyed ships
    pub explosion_radius: Fixed,
    /// Docking reach beyond the planet and ship surfaces
    pub dock_radius: Fixed,
    /// Turns spent docking and undocking
    pub dock_turns: u32,
    /// Production credit per docked ship per turn
    pub productivity_per_ship: u32,
    /// Credit required for one new ship
    pub production_per_ship: u32,
    /// Spawn distance beyond the planet surface
    pub spawn_radius: Fixed,
    pub max_speed: Fixed,
    pub max_acceleration: Fixed,
    /// Speed lost per turn
    pub drag: Fixed,
}

impl Default for GameConstants {
    fn default() -> Self {
        Self {
            ship_radius: to_fixed(0.5),
            base_ship_health: 255,
            weapon_radius: from_int(5),
            weapon_damage: 64,
            weapon_cooldown: 1,
            explosion_radius: from_int(10),
            dock_radius: from_int(4),
            dock_turns: 5,
            productivity_per_ship: 6,
            production_per_ship: 72,
            spawn_radius: from_int(2),
            max_speed: from_int(7),
            max_acceleration: from_int(7),
            drag: from_int(7),
        }
    }
}

impl GameConstants {
    /// Centre distance at which two ships can exchange fire.
    #[inline]
    pub fn ship_attack_range(&self) -> Fixed {
        self.ship_radius * 2 + self.weapon_radius
    }

    /// Centre distance at which a ship crashes into a planet.
    #[inline]
    pub fn crash_range(&self, planet_radius: Fixed) -> Fixed {
        self.ship_radius + planet_radius
    }

    /// Centre distance within which a ship may start docking.
    #[inline]
    pub fn dock_range(&self, planet_radius: Fixed) -> Fixed {
        planet_radius + self.ship_radius + self.dock_radius
    }

    /// Centre distance from a planet at which new ships appear.
    #[inline]
    pub fn spawn_distance(&self, planet_radius: Fixed) -> Fixed {
        planet_radius + self.spawn_radius
    }
}
