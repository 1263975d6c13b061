//! Game Events
//!
//! Discrete things that happened during a turn, recorded for replays.
//! Events are immutable once pushed; a turn's events move wholesale into the
//! match history.

use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::core::fixed::{Fixed, to_float};
use crate::core::vec2::FixedVec2;
use crate::game::entity::EntityId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Entity removed from the world
    Destroyed {
        entity: EntityId,
        location: FixedVec2,
        /// Explosion radius for visualization
        radius: Fixed,
    },

    /// A ship fired at every target in range
    Attack {
        entity: EntityId,
        location: FixedVec2,
        targets: Vec<EntityId>,
        target_locations: Vec<FixedVec2>,
    },

    /// A planet produced a ship
    Spawn {
        entity: EntityId,
        location: FixedVec2,
        planet_location: FixedVec2,
    },
}

impl Event {
    /// Replay tag of this event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Destroyed { .. } => "destroyed",
            Event::Attack { .. } => "attack",
            Event::Spawn { .. } => "spawned",
        }
    }

    pub fn entity(&self) -> EntityId {
        match self {
            Event::Destroyed { entity, .. }
            | Event::Attack { entity, .. }
            | Event::Spawn { entity, .. } => *entity,
        }
    }

    /// Visualizer JSON form. Pure function of the variant.
    pub fn to_json(&self) -> Value {
        match self {
            Event::Destroyed { entity, location, radius } => json!({
                "event": self.kind(),
                "entity": entity.to_json(),
                "x": to_float(location.x),
                "y": to_float(location.y),
                "radius": to_float(*radius),
            }),
            Event::Attack { entity, location, targets, target_locations } => json!({
                "event": self.kind(),
                "entity": entity.to_json(),
                "x": to_float(location.x),
                "y": to_float(location.y),
                "targets": targets.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
                "target_locations": target_locations
                    .iter()
                    .map(|l| json!({ "x": to_float(l.x), "y": to_float(l.y) }))
                    .collect::<Vec<_>>(),
            }),
            Event::Spawn { entity, location, planet_location } => json!({
                "event": self.kind(),
                "entity": entity.to_json(),
                "x": to_float(location.x),
                "y": to_float(location.y),
                "planet_x": to_float(planet_location.x),
                "planet_y": to_float(planet_location.y),
            }),
        }
    }
}
