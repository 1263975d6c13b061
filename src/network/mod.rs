//! Agent Layer
//!
//! Everything between the engine and the players: the transport seam, agent
//! adapters, deadline-bounded command collection and the match session.
//! This layer is **non-deterministic** (timing, processes); all game rules
//! run through `game/`.

pub mod transport;
pub mod collector;
pub mod bots;
pub mod pipe;
pub mod agent;
pub mod session;

pub use transport::{AgentHandle, TransportError, parse_commands, format_commands};
pub use collector::{CommandCollector, CollectionOutcome, InitOutcome, FailureKind};
pub use bots::{BotAgent, Behavior};
pub use pipe::{PipeAgent, PipeConfig};
pub use agent::Agent;
pub use session::{MatchSession, SessionConfig, SessionError};
