//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `entity`: Ids, ships, planets
//! - `world`: Entity registry and snapshots
//! - `config`: Balance constants
//! - `moves`: Player commands, validation, application
//! - `movement`: Thrust, integration, drag
//! - `combat`: Collisions, damage, destruction, cooldowns
//! - `docking`: Docking state machine
//! - `production`: Ship production and spawning
//! - `frame`: Authoritative turn loop and history
//! - `stats`: Statistics and ranking
//! - `events`: Game events for replays
//! - `mapgen`: Initial world generation

pub mod entity;
pub mod world;
pub mod config;
pub mod moves;
pub mod movement;
pub mod combat;
pub mod docking;
pub mod production;
pub mod frame;
pub mod stats;
pub mod events;
pub mod mapgen;

// Re-export key types
pub use entity::{EntityId, PlanetId, PlayerId, Ship, ShipId, Planet, DockingStatus};
pub use world::{World, WorldSnapshot};
pub use config::GameConstants;
pub use moves::{Move, MoveQueue};
pub use frame::{FrameProcessor, History};
pub use stats::{GameStatistics, PlayerStatistics};
pub use events::Event;
pub use mapgen::{WorldGenerator, SolarSystemGenerator, GeneratedWorld, MapGenError};
