//! Match Session
//!
//! Runs one complete match: generates the world, performs the agent
//! handshake, drives the frame processor turn by turn with commands from the
//! collector, and finally ranks the players and records the replay.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::fixed::isqrt_u64;
use crate::core::rng::derive_match_seed;
use crate::game::config::GameConstants;
use crate::game::frame::FrameProcessor;
use crate::game::entity::PlayerId;
use crate::game::mapgen::{MapGenError, SolarSystemGenerator, WorldGenerator, MAX_PLAYERS};
use crate::game::stats::GameStatistics;
use crate::network::collector::{CommandCollector, DEFAULT_INIT_DEADLINE, DEFAULT_TURN_DEADLINE};
use crate::network::transport::AgentHandle;
use crate::replay::{replay_path, write_replay, Replay, ReplayError, ReplayFormat, ReplayHeader, REPLAY_VERSION};

/// Turn limit used when none is configured: grows with the map area.
pub fn default_max_turns(width: u32, height: u32) -> u32 {
    100 + isqrt_u64(width as u64 * height as u64) as u32
}

/// Configuration for a match session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Map width in whole units.
    pub width: u32,
    /// Map height in whole units.
    pub height: u32,
    /// Map seed. Derived from the match id and roster when absent.
    pub seed: Option<u64>,
    pub constants: GameConstants,
    /// Per-turn command deadline.
    pub turn_deadline: Duration,
    /// Handshake deadline.
    pub init_deadline: Duration,
    /// Disable deadlines and timeout elimination.
    pub ignore_timeout: bool,
    /// Turn limit. Defaults to [`default_max_turns`].
    pub max_turns: Option<u32>,
    /// Suppress per-turn progress logs.
    pub quiet: bool,
    pub replay_format: ReplayFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 160,
            seed: None,
            constants: GameConstants::default(),
            turn_deadline: DEFAULT_TURN_DEADLINE,
            init_deadline: DEFAULT_INIT_DEADLINE,
            ignore_timeout: false,
            max_turns: None,
            quiet: false,
            replay_format: ReplayFormat::Json,
        }
    }
}

impl SessionConfig {
    pub fn max_turns(&self) -> u32 {
        self.max_turns.unwrap_or_else(|| default_max_turns(self.width, self.height))
    }
}

/// Session errors. All of them happen before turn 1.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a match needs at least one player")]
    NoPlayers,

    #[error("{0} players exceed the supported maximum")]
    TooManyPlayers(usize),

    #[error("{names} player names given for {agents} agents")]
    AgentCountMismatch { names: usize, agents: usize },

    #[error("map generation failed: {0}")]
    MapGen(#[from] MapGenError),

    #[error("replay failed: {0}")]
    Replay(#[from] ReplayError),
}

/// One match between a fixed roster of agents. `agents[i]` plays as
/// `PlayerId(i)`.
pub struct MatchSession<H, G = SolarSystemGenerator> {
    config: SessionConfig,
    agents: Vec<H>,
    generator: G,
    last_replay: Option<Replay>,
}

impl<H: AgentHandle> MatchSession<H> {
    pub fn new(config: SessionConfig, agents: Vec<H>) -> Self {
        let generator = SolarSystemGenerator::for_constants(&config.constants);
        Self::with_generator(config, agents, generator)
    }
}

impl<H: AgentHandle, G: WorldGenerator> MatchSession<H, G> {
    pub fn with_generator(config: SessionConfig, agents: Vec<H>, generator: G) -> Self {
        Self {
            config,
            agents,
            generator,
            last_replay: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replay of the most recent match, kept whether or not it was written.
    pub fn last_replay(&self) -> Option<&Replay> {
        self.last_replay.as_ref()
    }

    /// Play one match to completion.
    ///
    /// `player_names` may be empty, in which case the names the agents send
    /// at handshake are used. When `enable_replay` is set the replay is
    /// written into `replay_directory` and its path is reported in
    /// `output_filename`.
    #[instrument(skip(self, player_names, replay_directory))]
    pub async fn run_game(
        &mut self,
        player_names: Vec<String>,
        match_id: u32,
        enable_replay: bool,
        replay_directory: &Path,
    ) -> Result<GameStatistics, SessionError> {
        // 1. Roster checks
        let agent_count = self.agents.len();
        if agent_count == 0 {
            return Err(SessionError::NoPlayers);
        }
        if agent_count > MAX_PLAYERS as usize {
            return Err(SessionError::TooManyPlayers(agent_count));
        }
        if !player_names.is_empty() && player_names.len() != agent_count {
            return Err(SessionError::AgentCountMismatch {
                names: player_names.len(),
                agents: agent_count,
            });
        }

        // 2. World
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(|| derive_match_seed(match_id, &player_names));
        let generated = self
            .generator
            .generate(config.width, config.height, seed, agent_count as u8)?;
        info!(
            seed,
            width = config.width,
            height = config.height,
            planets = generated.world.planets.len(),
            "world generated"
        );

        // 3. Handshake
        let collector = CommandCollector::new(config.turn_deadline, config.init_deadline, config.ignore_timeout);
        let init = collector.initialize(&mut self.agents, &generated.world).await;

        let names: Vec<String> = if player_names.is_empty() {
            (0..agent_count)
                .map(|i| {
                    let player = PlayerId(i as u8);
                    init.names.get(&player).cloned().unwrap_or_else(|| player.to_string())
                })
                .collect()
        } else {
            player_names
        };

        let max_turns = config.max_turns();
        let mut processor = FrameProcessor::new(generated.world, config.constants.clone(), max_turns);
        for (player, elapsed) in &init.response_times {
            processor.record_init_response(*player, *elapsed);
        }

        let mut timeout_tags = BTreeSet::new();
        let mut timeout_log_filenames = Vec::new();
        if !config.ignore_timeout {
            let failed = init.failed_players();
            self.record_timeouts(&failed, &mut timeout_tags, &mut timeout_log_filenames);
            processor.eliminate_before_start(&failed);
        }

        // 4. Turn loop
        while !processor.is_terminal() {
            let turn = processor.turn() + 1;
            let outcome = collector
                .collect(
                    &mut self.agents,
                    processor.alive_players(),
                    turn,
                    processor.world(),
                    processor.constants(),
                )
                .await;

            for (player, elapsed) in &outcome.response_times {
                processor.record_frame_response(*player, *elapsed);
            }
            let timed_out = if self.config.ignore_timeout {
                BTreeSet::new()
            } else {
                outcome.failed_players()
            };
            self.record_timeouts(&timed_out, &mut timeout_tags, &mut timeout_log_filenames);

            let summary = processor.process_frame(outcome.moves, &timed_out);
            if self.config.quiet {
                debug!(turn, events = summary.events, alive = summary.alive, "turn processed");
            } else {
                info!(turn, events = summary.events, alive = summary.alive, "turn processed");
            }
        }

        // 5. Results
        let mut stats = GameStatistics {
            player_statistics: processor.statistics(),
            output_filename: None,
            timeout_tags,
            timeout_log_filenames,
        };

        let mut header = ReplayHeader {
            version: REPLAY_VERSION,
            match_id,
            seed,
            width: processor.world().width,
            height: processor.world().height,
            player_names: names.clone(),
            constants: self.config.constants.clone(),
            points_of_interest: generated.points_of_interest,
            max_turns,
            initial_timeouts: BTreeSet::new(),
            stats: GameStatistics::default(),
            created_at: chrono::Utc::now(),
        };
        if enable_replay {
            let path = replay_path(&header, replay_directory, self.config.replay_format);
            stats.output_filename = Some(path.display().to_string());
        }
        header.stats = stats.clone();
        let replay = Replay::from_history(header, processor.history());

        if enable_replay {
            write_replay(&replay, replay_directory, self.config.replay_format)?;
        }
        self.last_replay = Some(replay);

        for player in &stats.player_statistics {
            let name = names.get(player.tag.0 as usize).map(String::as_str).unwrap_or("?");
            info!(
                player = %player.tag,
                name,
                rank = player.rank,
                last_frame_alive = player.last_frame_alive,
                ships = player.final_ship_count,
                damage = player.damage_dealt,
                "final standing"
            );
        }
        info!(turns = processor.turn(), winner = ?stats.winner(), "match finished");

        Ok(stats)
    }

    fn record_timeouts(
        &self,
        players: &BTreeSet<PlayerId>,
        tags: &mut BTreeSet<PlayerId>,
        log_filenames: &mut Vec<String>,
    ) {
        for player in players {
            if !tags.insert(*player) {
                continue;
            }
            warn!(%player, "player timed out and is eliminated");
            if let Some(log) = self.agents.get(player.0 as usize).and_then(AgentHandle::log_filename) {
                log_filenames.push(log);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::moves::Move;
    use crate::game::world::World;
    use crate::network::bots::{Behavior, BotAgent};
    use crate::network::transport::TransportError;
    use crate::replay::verify_replay;

    fn small_config() -> SessionConfig {
        SessionConfig {
            width: 80,
            height: 80,
            seed: Some(2024),
            turn_deadline: Duration::from_millis(50),
            init_deadline: Duration::from_millis(200),
            max_turns: Some(60),
            quiet: true,
            ..Default::default()
        }
    }

    fn bots(behaviors: &[Behavior]) -> Vec<BotAgent> {
        behaviors
            .iter()
            .map(|b| BotAgent::new(*b, GameConstants::default()))
            .collect()
    }

    fn no_dir() -> &'static Path {
        Path::new("unused-replays")
    }

    #[test]
    fn test_default_max_turns() {
        assert_eq!(default_max_turns(240, 160), 100 + 195);
        assert_eq!(SessionConfig { max_turns: Some(7), ..Default::default() }.max_turns(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_match_ranks_everyone() {
        let mut session = MatchSession::new(small_config(), bots(&[Behavior::Settler, Behavior::Raider]));
        let stats = session.run_game(Vec::new(), 1, false, no_dir()).await.expect("match runs");

        assert_eq!(stats.player_statistics.len(), 2);
        let mut ranks: Vec<u32> = stats.player_statistics.iter().map(|p| p.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2]);
        assert!(stats.timeout_tags.is_empty());
        assert!(stats.output_filename.is_none());

        let replay = session.last_replay().expect("replay kept");
        assert_eq!(replay.header.player_names, vec!["settler-0".to_string(), "raider-1".to_string()]);
        assert!(verify_replay(replay).valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_same_match() {
        let run = || async {
            let mut session = MatchSession::new(small_config(), bots(&[Behavior::Settler, Behavior::Settler]));
            session.run_game(Vec::new(), 3, false, no_dir()).await.expect("match runs");
            let replay = session.last_replay().cloned().expect("replay kept");
            replay.frames.into_iter().map(|f| f.state_hash).collect::<Vec<_>>()
        };
        assert_eq!(run().await, run().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_freezes_last_frame_alive() {
        let agents = vec![
            BotAgent::new(Behavior::Settler, GameConstants::default()),
            BotAgent::new(Behavior::Idle, GameConstants::default()).stalling_from(5),
        ];
        let mut session = MatchSession::new(small_config(), agents);
        let stats = session
            .run_game(vec!["a".into(), "b".into()], 9, false, no_dir())
            .await
            .expect("match runs");

        assert_eq!(stats.timeout_tags, BTreeSet::from([PlayerId(1)]));
        let staller = stats.player_statistics.iter().find(|p| p.tag == PlayerId(1)).expect("listed");
        assert_eq!(staller.last_frame_alive, 5);
        assert_eq!(staller.rank, 2);
        assert_eq!(stats.winner(), Some(PlayerId(0)));

        let replay = session.last_replay().expect("replay kept");
        assert_eq!(replay.turns(), 5, "one player left ends the match");
        assert!(verify_replay(replay).valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_handshake_eliminates_before_start() {
        struct Silent;
        impl AgentHandle for Silent {
            async fn initialize(&mut self, _: PlayerId, _: &World) -> Result<String, TransportError> {
                std::future::pending().await
            }
            async fn request_commands(&mut self, _: u32, _: &World) -> Result<Vec<Move>, TransportError> {
                Ok(Vec::new())
            }
        }

        let mut session = MatchSession::new(small_config(), vec![Silent, Silent]);
        let stats = session.run_game(Vec::new(), 4, false, no_dir()).await.expect("match runs");
        assert_eq!(stats.timeout_tags.len(), 2);
        assert!(stats.player_statistics.iter().all(|p| p.last_frame_alive == 0));

        let replay = session.last_replay().expect("replay kept");
        assert_eq!(replay.header.player_names, vec!["p0".to_string(), "p1".to_string()]);
        assert_eq!(replay.header.initial_timeouts.len(), 2);
        assert!(verify_replay(replay).valid);
    }

    #[tokio::test]
    async fn test_setup_errors() {
        let mut empty: MatchSession<BotAgent> = MatchSession::new(small_config(), Vec::new());
        assert!(matches!(
            empty.run_game(Vec::new(), 0, false, no_dir()).await,
            Err(SessionError::NoPlayers)
        ));

        let mut session = MatchSession::new(small_config(), bots(&[Behavior::Idle, Behavior::Idle]));
        assert!(matches!(
            session.run_game(vec!["solo".into()], 0, false, no_dir()).await,
            Err(SessionError::AgentCountMismatch { names: 1, agents: 2 })
        ));

        let tiny = SessionConfig { width: 20, height: 20, ..small_config() };
        let mut session = MatchSession::new(tiny, bots(&[Behavior::Idle]));
        assert!(matches!(
            session.run_game(Vec::new(), 0, false, no_dir()).await,
            Err(SessionError::MapGen(MapGenError::MapTooSmall { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_written_when_enabled() {
        let dir = std::env::temp_dir().join(format!("armada-session-{}", std::process::id()));
        let config = SessionConfig { max_turns: Some(5), replay_format: ReplayFormat::Bincode, ..small_config() };
        let mut session = MatchSession::new(config, bots(&[Behavior::Raider, Behavior::Raider]));

        let stats = session.run_game(Vec::new(), 77, true, &dir).await.expect("match runs");
        let path = stats.output_filename.expect("replay path");
        let replay = crate::replay::read_replay(Path::new(&path)).expect("readable");
        assert_eq!(replay.header.match_id, 77);
        assert_eq!(replay.header.stats.output_filename.as_deref(), Some(path.as_str()));
        assert_eq!(replay.header.stats.player_statistics.len(), 2);
        assert!(verify_replay(&replay).valid);

        let _ = std::fs::remove_dir_all(dir);
    }
}
