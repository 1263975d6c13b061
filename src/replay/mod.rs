//! Match Replays
//!
//! Records everything needed to re-run a match: the header (rules, seed,
//! roster, final statistics) and one frame per turn with the world, events,
//! moves, timeouts and state hash. Encoded as JSON by default, or bincode for
//! compact storage.
//!
//! ```text
//! ┌────────────── Replay ───────────────┐
//! │ header: version, seed, constants... │
//! │ frames[0]  turn 0   initial world   │
//! │ frames[1]  turn 1   world, events,  │
//! │  ...                moves, hash     │
//! └─────────────────────────────────────┘
//! ```

pub mod verify;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use crate::core::fixed::{to_float, Fixed};
use crate::core::hash::{hash_with_domain, StateHash};
use crate::game::config::GameConstants;
use crate::game::entity::{DockingStatus, PlayerId};
use crate::game::events::Event;
use crate::game::frame::History;
use crate::game::mapgen::PointOfInterest;
use crate::game::moves::{Move, MoveQueue};
use crate::game::stats::GameStatistics;
use crate::game::world::WorldSnapshot;

pub use verify::{verify_replay, VerificationError, VerificationResult};

/// Current replay format version.
pub const REPLAY_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode encoding failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("replay version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayFormat {
    #[default]
    Json,
    Bincode,
}

impl ReplayFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReplayFormat::Json => "json",
            ReplayFormat::Bincode => "bin",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayHeader {
    pub version: u8,
    pub match_id: u32,
    pub seed: u64,
    pub width: Fixed,
    pub height: Fixed,
    pub player_names: Vec<String>,
    pub constants: GameConstants,
    pub points_of_interest: Vec<PointOfInterest>,
    pub max_turns: u32,
    /// Players eliminated by a failed handshake
    pub initial_timeouts: BTreeSet<PlayerId>,
    pub stats: GameStatistics,
    pub created_at: DateTime<Utc>,
}

/// One player's accepted moves for a turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMoves {
    pub player: PlayerId,
    pub moves: Vec<Move>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub turn: u32,
    /// World after the turn was processed
    pub world: WorldSnapshot,
    pub events: Vec<Event>,
    pub moves: Vec<PlayerMoves>,
    pub timed_out: BTreeSet<PlayerId>,
    /// Hex SHA-256 of the world
    pub state_hash: String,
}

impl ReplayFrame {
    /// Rebuild the move queue this frame was produced from.
    pub fn move_queue(&self) -> MoveQueue {
        self.moves.iter().map(|pm| (pm.player, pm.moves.clone())).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    pub header: ReplayHeader,
    pub frames: Vec<ReplayFrame>,
}

impl Replay {
    /// Build a replay from a finished match history.
    ///
    /// `history.worlds[k]` becomes frame `k`; frame 0 carries no moves or
    /// events.
    pub fn from_history(mut header: ReplayHeader, history: &History) -> Self {
        header.initial_timeouts = history.initial_timeouts.clone();

        let frames = history
            .worlds
            .iter()
            .enumerate()
            .map(|(k, world)| {
                let (events, moves, timed_out) = match k.checked_sub(1) {
                    Some(i) => (
                        history.events[i].clone(),
                        history.moves[i]
                            .iter()
                            .map(|(player, moves)| PlayerMoves { player: *player, moves: moves.clone() })
                            .collect(),
                        history.timeouts[i].clone(),
                    ),
                    None => (Vec::new(), Vec::new(), BTreeSet::new()),
                };
                ReplayFrame {
                    turn: k as u32,
                    world: WorldSnapshot::from(world),
                    events,
                    moves,
                    timed_out,
                    state_hash: hex::encode(world.compute_hash()),
                }
            })
            .collect();

        Self { header, frames }
    }

    pub fn turns(&self) -> u32 {
        self.frames.last().map_or(0, |f| f.turn)
    }

    pub fn encode(&self, format: ReplayFormat) -> Result<Vec<u8>, ReplayError> {
        Ok(match format {
            ReplayFormat::Json => serde_json::to_vec(self)?,
            ReplayFormat::Bincode => bincode::serialize(self)?,
        })
    }

    pub fn decode(bytes: &[u8], format: ReplayFormat) -> Result<Self, ReplayError> {
        let replay: Replay = match format {
            ReplayFormat::Json => serde_json::from_slice(bytes)?,
            ReplayFormat::Bincode => bincode::deserialize(bytes)?,
        };
        if replay.header.version != REPLAY_VERSION {
            return Err(ReplayError::VersionMismatch {
                expected: REPLAY_VERSION,
                got: replay.header.version,
            });
        }
        Ok(replay)
    }

    /// Digest of the compact encoding, for logging and deduplication.
    pub fn digest(&self) -> Result<StateHash, ReplayError> {
        Ok(hash_with_domain(b"ARMADA_REPLAY_V1", &self.encode(ReplayFormat::Bincode)?))
    }

    /// Float-coordinate rendering for visualizers.
    pub fn to_visualizer_json(&self) -> Value {
        let header = &self.header;
        let frames: Vec<Value> = self.frames.iter().map(frame_json).collect();

        json!({
            "version": header.version,
            "match_id": header.match_id,
            "seed": header.seed,
            "width": to_float(header.width),
            "height": to_float(header.height),
            "num_players": header.player_names.len(),
            "num_frames": frames.len(),
            "player_names": header.player_names,
            "constants": header.constants,
            "poi": header.points_of_interest,
            "frames": frames,
            "stats": header.stats,
        })
    }
}

fn frame_json(frame: &ReplayFrame) -> Value {
    let ships: Vec<Value> = frame
        .world
        .ships
        .iter()
        .map(|ship| {
            let (x, y) = ship.position.to_floats();
            let (vel_x, vel_y) = ship.velocity.to_floats();
            let (status, planet, progress) = match ship.docking {
                DockingStatus::Undocked => ("undocked", None, 0),
                DockingStatus::Docking { planet, turns_left } => ("docking", Some(planet.0), turns_left),
                DockingStatus::Docked { planet } => ("docked", Some(planet.0), 0),
                DockingStatus::Undocking { planet, turns_left } => ("undocking", Some(planet.0), turns_left),
            };
            json!({
                "owner": ship.id.owner.0,
                "id": ship.id.index,
                "x": x,
                "y": y,
                "vel_x": vel_x,
                "vel_y": vel_y,
                "health": ship.health,
                "cooldown": ship.weapon_cooldown,
                "docking": { "status": status, "planet": planet, "turns_left": progress },
            })
        })
        .collect();

    let planets: Vec<Value> = frame
        .world
        .planets
        .iter()
        .map(|planet| {
            let (x, y) = planet.position.to_floats();
            json!({
                "id": planet.id.0,
                "x": x,
                "y": y,
                "r": to_float(planet.radius),
                "health": planet.health,
                "owner": planet.owner.map(|p| p.0),
                "docked_ships": planet.docked_ships.iter().map(|s| s.index).collect::<Vec<_>>(),
                "remaining_production": planet.production,
            })
        })
        .collect();

    json!({
        "turn": frame.turn,
        "ships": ships,
        "planets": planets,
        "events": frame.events.iter().map(Event::to_json).collect::<Vec<_>>(),
        "timed_out": frame.timed_out.iter().map(|p| p.0).collect::<Vec<_>>(),
    })
}

/// Write a replay into `directory`, returning the file path.
///
/// The file name carries the creation time and match id, so repeated matches
/// never overwrite each other.
pub fn write_replay(replay: &Replay, directory: &Path, format: ReplayFormat) -> Result<PathBuf, ReplayError> {
    fs::create_dir_all(directory)?;
    let path = replay_path(&replay.header, directory, format);
    let bytes = replay.encode(format)?;
    fs::write(&path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), frames = replay.frames.len(), "replay written");
    Ok(path)
}

/// Where [`write_replay`] puts the replay described by `header`.
pub fn replay_path(header: &ReplayHeader, directory: &Path, format: ReplayFormat) -> PathBuf {
    directory.join(format!(
        "replay-{}-{}.{}",
        header.created_at.format("%Y%m%d-%H%M%S"),
        header.match_id,
        format.extension(),
    ))
}

/// Read a replay file written by [`write_replay`]. The format follows the
/// file extension.
pub fn read_replay(path: &Path) -> Result<Replay, ReplayError> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => ReplayFormat::Bincode,
        _ => ReplayFormat::Json,
    };
    Replay::decode(&fs::read(path)?, format)
}

// =============================================================================
// TESTS
// =============================================================================
