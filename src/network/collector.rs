//! Command Collector
//!
//! Fans a request out to every alive player's handle and joins the replies
//! against one shared deadline. A handle that misses the deadline is dropped
//! (its future cancelled) and reported as a timeout; the others are never
//! held up by it.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::game::config::GameConstants;
use crate::game::entity::PlayerId;
use crate::game::moves::{validate_batch, MoveQueue};
use crate::game::world::World;
use crate::network::transport::{AgentHandle, TransportError};

/// Default per-turn deadline.
pub const DEFAULT_TURN_DEADLINE: Duration = Duration::from_millis(2000);

/// Default deadline for the initialization handshake.
pub const DEFAULT_INIT_DEADLINE: Duration = Duration::from_secs(30);

/// Why a player produced no usable batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Timeout,
    Malformed,
    Disconnected,
}

impl From<&TransportError> for FailureKind {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout => FailureKind::Timeout,
            TransportError::Malformed(_) | TransportError::Encode(_) => FailureKind::Malformed,
            TransportError::Disconnected(_) | TransportError::Io(_) => FailureKind::Disconnected,
        }
    }
}

/// Result of one turn's collection.
#[derive(Debug, Default)]
pub struct CollectionOutcome {
    /// Validated moves of every player that answered in time
    pub moves: MoveQueue,
    pub failures: BTreeMap<PlayerId, FailureKind>,
    /// Response latency of every player that answered in time
    pub response_times: BTreeMap<PlayerId, Duration>,
}

impl CollectionOutcome {
    pub fn failed_players(&self) -> BTreeSet<PlayerId> {
        self.failures.keys().copied().collect()
    }
}

/// Result of the initialization handshake.
#[derive(Debug, Default)]
pub struct InitOutcome {
    pub names: BTreeMap<PlayerId, String>,
    pub failures: BTreeMap<PlayerId, FailureKind>,
    pub response_times: BTreeMap<PlayerId, Duration>,
}

impl InitOutcome {
    pub fn failed_players(&self) -> BTreeSet<PlayerId> {
        self.failures.keys().copied().collect()
    }
}

/// Concurrent, deadline-bounded command retrieval.
///
/// `agents[i]` always speaks for `PlayerId(i)`.
#[derive(Clone, Debug)]
pub struct CommandCollector {
    turn_deadline: Duration,
    init_deadline: Duration,
    ignore_timeout: bool,
}

impl Default for CommandCollector {
    fn default() -> Self {
        Self::new(DEFAULT_TURN_DEADLINE, DEFAULT_INIT_DEADLINE, false)
    }
}

impl CommandCollector {
    pub fn new(turn_deadline: Duration, init_deadline: Duration, ignore_timeout: bool) -> Self {
        Self {
            turn_deadline,
            init_deadline,
            ignore_timeout,
        }
    }

    fn deadline(&self, budget: Duration) -> Option<Instant> {
        (!self.ignore_timeout).then(|| Instant::now() + budget)
    }

    /// Run the handshake with every agent.
    pub async fn initialize<H: AgentHandle>(&self, agents: &mut [H], world: &World) -> InitOutcome {
        let deadline = self.deadline(self.init_deadline);

        let requests = agents.iter_mut().enumerate().map(|(index, agent)| async move {
            let player = PlayerId(index as u8);
            let started = Instant::now();
            let result = bounded(deadline, agent.initialize(player, world)).await;
            (player, result, started.elapsed())
        });

        let mut outcome = InitOutcome::default();
        for (player, result, elapsed) in join_all(requests).await {
            match result {
                Ok(name) => {
                    debug!(%player, %name, ?elapsed, "agent initialized");
                    outcome.names.insert(player, name);
                    outcome.response_times.insert(player, elapsed);
                }
                Err(err) => {
                    warn!(%player, error = %err, "initialization failed");
                    outcome.failures.insert(player, FailureKind::from(&err));
                }
            }
        }
        outcome
    }

    /// Collect one turn of commands from the alive players.
    ///
    /// Batches are validated against `world` before they are queued.
    pub async fn collect<H: AgentHandle>(
        &self,
        agents: &mut [H],
        alive: &BTreeSet<PlayerId>,
        turn: u32,
        world: &World,
        constants: &GameConstants,
    ) -> CollectionOutcome {
        let deadline = self.deadline(self.turn_deadline);

        let requests = agents
            .iter_mut()
            .enumerate()
            .map(|(index, agent)| (PlayerId(index as u8), agent))
            .filter(|(player, _)| alive.contains(player))
            .map(|(player, agent)| async move {
                let started = Instant::now();
                let result = bounded(deadline, agent.request_commands(turn, world)).await;
                (player, result, started.elapsed())
            });

        let mut outcome = CollectionOutcome::default();
        for (player, result, elapsed) in join_all(requests).await {
            match result {
                Ok(raw) => {
                    let moves = validate_batch(world, constants, player, raw);
                    outcome.moves.insert(player, moves);
                    outcome.response_times.insert(player, elapsed);
                }
                Err(err) => {
                    warn!(%player, turn, error = %err, "no commands received");
                    outcome.failures.insert(player, FailureKind::from(&err));
                }
            }
        }
        outcome
    }
}

async fn bounded<T>(
    deadline: Option<Instant>,
    request: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    match deadline {
        Some(deadline) => timeout_at(deadline, request)
            .await
            .unwrap_or_else(|_| Err(TransportError::Timeout)),
        None => request.await,
    }
}
