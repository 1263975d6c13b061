//! Map Generation
//!
//! Builds the starting world from `(width, height, seed, player_count)`.
//! The default generator lays out a rotationally symmetric "solar system":
//! a central planet, rings of orbiting planets repeated once per player, and
//! a small starting fleet per player on the outskirts.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::fixed::{Fixed, from_int, fixed_mul};
use crate::core::angle::{cos_degrees, sin_degrees};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::config::GameConstants;
use crate::game::entity::PlayerId;
use crate::game::world::World;

/// Maximum players a generated map supports.
pub const MAX_PLAYERS: u8 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapGenError {
    #[error("unsupported player count {0}")]
    UnsupportedPlayerCount(u8),

    #[error("map {width}x{height} is too small")]
    MapTooSmall { width: u32, height: u32 },

    #[error("map {width}x{height} exceeds the fixed-point coordinate range")]
    MapTooLarge { width: u32, height: u32 },

    #[error("no room for any planet")]
    NoRoomForPlanets,
}

/// Notable map features, recorded in the replay header for visualizers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointOfInterest {
    Orbit { center: FixedVec2, radius: Fixed },
    Spawn { player: PlayerId, location: FixedVec2 },
}

#[derive(Clone, Debug)]
pub struct GeneratedWorld {
    pub world: World,
    pub points_of_interest: Vec<PointOfInterest>,
}

/// Produces an initial world.
pub trait WorldGenerator {
    fn generate(&self, width: u32, height: u32, seed: u64, player_count: u8) -> Result<GeneratedWorld, MapGenError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarSystemConfig {
    pub ships_per_player: u32,
    /// Orbit rings attempted; each ring holds one planet per player
    pub planets_per_player: u32,
    pub central_planet: bool,
    /// Planet radius range, whole units
    pub min_planet_radius: i32,
    pub max_planet_radius: i32,
    pub planet_health_per_radius: u32,
    pub ship_health: u32,
    /// Minimum free space between planet surfaces
    pub planet_gap: Fixed,
    /// Minimum distance between a planet surface and a starting fleet
    pub spawn_clearance: Fixed,
    pub edge_margin: Fixed,
    pub placement_attempts: u32,
}

impl Default for SolarSystemConfig {
    fn default() -> Self {
        Self {
            ships_per_player: 3,
            planets_per_player: 4,
            central_planet: true,
            min_planet_radius: 3,
            max_planet_radius: 8,
            planet_health_per_radius: 255,
            ship_health: GameConstants::default().base_ship_health,
            planet_gap: from_int(3),
            spawn_clearance: from_int(12),
            edge_margin: from_int(4),
            placement_attempts: 64,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SolarSystemGenerator {
    config: SolarSystemConfig,
}

impl SolarSystemGenerator {
    pub fn new(config: SolarSystemConfig) -> Self {
        Self { config }
    }

    /// Default layout with ship health taken from the match constants.
    pub fn for_constants(constants: &GameConstants) -> Self {
        Self::new(SolarSystemConfig {
            ship_health: constants.base_ship_health,
            ..SolarSystemConfig::default()
        })
    }

    fn planet_fits(
        &self,
        world: &World,
        spawns: &[FixedVec2],
        position: FixedVec2,
        radius: Fixed,
    ) -> bool {
        let c = &self.config;
        let margin = radius + c.edge_margin;
        let in_bounds = position.x >= margin
            && position.y >= margin
            && position.x <= world.width - margin
            && position.y <= world.height - margin;

        in_bounds
            && world
                .planets
                .values()
                .all(|p| !p.position.within(position, p.radius + radius + c.planet_gap))
            && spawns.iter().all(|s| !s.within(position, radius + c.spawn_clearance))
    }

    fn add_planet(&self, world: &mut World, position: FixedVec2, radius_units: i32) {
        let radius = from_int(radius_units);
        let health = self.config.planet_health_per_radius * radius_units as u32;
        let spots = (radius_units / 2 + 1) as u32;
        world.add_planet(position, radius, health, spots);
    }
}

impl WorldGenerator for SolarSystemGenerator {
    fn generate(&self, width: u32, height: u32, seed: u64, player_count: u8) -> Result<GeneratedWorld, MapGenError> {
        if player_count == 0 || player_count > MAX_PLAYERS {
            return Err(MapGenError::UnsupportedPlayerCount(player_count));
        }

        if width > i16::MAX as u32 || height > i16::MAX as u32 {
            return Err(MapGenError::MapTooLarge { width, height });
        }

        let c = &self.config;
        let max_radius = from_int(c.max_planet_radius);
        let half_min = from_int(width.min(height) as i32) / 2;
        let min_orbit = max_radius * 2;
        let max_orbit = half_min - c.edge_margin - max_radius;
        if max_orbit <= min_orbit {
            return Err(MapGenError::MapTooSmall { width, height });
        }

        let mut rng = DeterministicRng::new(seed);
        let mut world = World::new(from_int(width as i32), from_int(height as i32), player_count);
        let center = world.center();
        let mut points_of_interest = Vec::new();

        // Starting fleets on an ellipse around the centre
        let step = 360 / player_count as i32;
        let base = if player_count == 4 { 225 } else { 180 };
        let (rx, ry) = (world.width / 8 * 3, world.height / 8 * 3);
        let mut spawns = Vec::with_capacity(player_count as usize);
        for player in world.players().collect::<Vec<_>>() {
            let angle = base + player.0 as i32 * step;
            let anchor = center + FixedVec2::new(
                fixed_mul(rx, cos_degrees(angle)),
                fixed_mul(ry, sin_degrees(angle)),
            );
            for k in 0..c.ships_per_player as i32 {
                let offset = FixedVec2::from_ints(0, 2 * k - (c.ships_per_player as i32 - 1));
                world.spawn_ship(player, anchor + offset, c.ship_health);
            }
            spawns.push(anchor);
            points_of_interest.push(PointOfInterest::Spawn { player, location: anchor });
        }

        if c.central_planet && self.planet_fits(&world, &spawns, center, max_radius) {
            self.add_planet(&mut world, center, c.max_planet_radius);
        }

        // Rings: one planet per player, rotated copies of a random placement
        for _ in 0..c.planets_per_player {
            for _ in 0..c.placement_attempts {
                let radius_units = rng.next_int_range(c.min_planet_radius, c.max_planet_radius);
                let radius = from_int(radius_units);
                let orbit = rng.next_fixed_range(min_orbit, max_orbit);
                let angle = rng.next_int_range(0, step - 1);

                let positions: Vec<FixedVec2> = (0..player_count as i32)
                    .map(|i| center + FixedVec2::from_polar(orbit, angle + i * step))
                    .collect();
                let copies_clear = positions.iter().enumerate().all(|(i, a)| {
                    positions[i + 1..]
                        .iter()
                        .all(|b| !a.within(*b, radius * 2 + c.planet_gap))
                });
                if !copies_clear || !positions.iter().all(|p| self.planet_fits(&world, &spawns, *p, radius)) {
                    continue;
                }

                for position in positions {
                    self.add_planet(&mut world, position, radius_units);
                }
                points_of_interest.push(PointOfInterest::Orbit { center, radius: orbit });
                break;
            }
        }

        if world.planets.is_empty() {
            return Err(MapGenError::NoRoomForPlanets);
        }

        debug!(
            width,
            height,
            seed,
            planets = world.planets.len(),
            ships = world.ships.len(),
            "generated solar system"
        );

        Ok(GeneratedWorld { world, points_of_interest })
    }
}

// =============================================================================
// TESTS
// =============================================================================
