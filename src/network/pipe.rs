//! Child-Process Agents
//!
//! Runs a bot executable and talks to it over stdin/stdout, one line per
//! message:
//!
//! ```text
//! engine ─▶ agent   {"turn": 0, "player": 1, "world": {...}}   (handshake)
//! agent  ─▶ engine  my-bot-name
//! engine ─▶ agent   {"turn": 1, "player": 1, "world": {...}}
//! agent  ─▶ engine  t 0 7 90 d 1 3
//! ```
//!
//! The agent's stderr goes to a per-player log file when a log directory is
//! configured.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use crate::game::entity::PlayerId;
use crate::game::moves::Move;
use crate::game::world::{World, WorldSnapshot};
use crate::network::transport::{parse_commands, AgentHandle, TransportError};

/// How to launch an agent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Directory for the agent's stderr log
    pub log_dir: Option<PathBuf>,
}

impl PipeConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// One message from the engine to an agent.
#[derive(Serialize)]
struct TurnMessage {
    turn: u32,
    player: PlayerId,
    world: WorldSnapshot,
}

struct Connection {
    // Kept so the process is killed when the agent is dropped
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// An agent running as a child process. The process starts at handshake.
pub struct PipeAgent {
    config: PipeConfig,
    player: PlayerId,
    log_path: Option<PathBuf>,
    connection: Option<Connection>,
}

impl PipeAgent {
    pub fn new(config: PipeConfig) -> Self {
        Self {
            config,
            player: PlayerId::default(),
            log_path: None,
            connection: None,
        }
    }

    fn spawn(&mut self) -> Result<(), TransportError> {
        let stderr = match &self.config.log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(format!("agent-{}.log", self.player.0));
                let file = std::fs::File::create(&path)?;
                self.log_path = Some(path);
                Stdio::from(file)
            }
            None => Stdio::null(),
        };

        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Disconnected("stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Disconnected("stdout unavailable".into()))?;

        info!(player = %self.player, command = %self.config.command, "agent process started");
        self.connection = Some(Connection {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        });
        Ok(())
    }

    async fn exchange(&mut self, turn: u32, world: &World) -> Result<String, TransportError> {
        let message = TurnMessage {
            turn,
            player: self.player,
            world: WorldSnapshot::from(world),
        };
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');

        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| TransportError::Disconnected("agent not started".into()))?;
        connection.stdin.write_all(line.as_bytes()).await?;
        connection.stdin.flush().await?;

        let reply = connection
            .stdout
            .next_line()
            .await?
            .ok_or_else(|| TransportError::Disconnected("agent closed its output".into()))?;
        debug!(player = %self.player, turn, bytes = reply.len(), "agent replied");
        Ok(reply)
    }
}

impl AgentHandle for PipeAgent {
    async fn initialize(&mut self, player: PlayerId, world: &World) -> Result<String, TransportError> {
        self.player = player;
        self.spawn()?;
        let name = self.exchange(0, world).await?;
        Ok(name.trim().to_string())
    }

    async fn request_commands(&mut self, turn: u32, world: &World) -> Result<Vec<Move>, TransportError> {
        let reply = self.exchange(turn, world).await?;
        parse_commands(self.player, &reply)
    }

    fn log_filename(&self) -> Option<String> {
        self.log_path.as_ref().map(|p| p.display().to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;
    use crate::core::vec2::FixedVec2;
    use crate::game::entity::ShipId;

    fn world() -> World {
        let mut world = World::new(from_int(50), from_int(50), 1);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(10, 10), 255);
        world
    }

    fn shell(script: &str) -> PipeConfig {
        PipeConfig::new("sh").with_args(["-c", script])
    }

    #[tokio::test]
    async fn test_pipe_handshake_and_commands() {
        let world = world();
        let script = r#"read init; echo "shell-bot"; while read turn; do echo "t 0 2 45"; done"#;
        let mut agent = PipeAgent::new(shell(script));

        let name = agent.initialize(PlayerId(0), &world).await.expect("handshake");
        assert_eq!(name, "shell-bot");

        for turn in 1..=3 {
            let moves = agent.request_commands(turn, &world).await.expect("commands");
            assert_eq!(
                moves,
                vec![Move::Thrust { ship: ShipId::new(PlayerId(0), 0), magnitude: from_int(2), angle_degrees: 45 }]
            );
        }
    }

    #[tokio::test]
    async fn test_pipe_sees_world_json() {
        let world = world();
        // Answer with a no-op only if the snapshot carries our ship list
        let script = r#"read init; echo ok; read turn; case "$turn" in *'"ships":[{'*) echo "n 0";; *) echo "?";; esac"#;
        let mut agent = PipeAgent::new(shell(script));
        agent.initialize(PlayerId(0), &world).await.expect("handshake");

        let moves = agent.request_commands(1, &world).await.expect("commands");
        assert_eq!(moves, vec![Move::Noop { ship: ShipId::new(PlayerId(0), 0) }]);
    }

    #[tokio::test]
    async fn test_pipe_exit_is_disconnect() {
        let world = world();
        let mut agent = PipeAgent::new(shell("read init; echo quitter"));
        agent.initialize(PlayerId(0), &world).await.expect("handshake");

        let err = agent.request_commands(1, &world).await.expect_err("agent exited");
        assert!(matches!(err, TransportError::Disconnected(_) | TransportError::Io(_)));
    }

    #[tokio::test]
    async fn test_missing_executable_fails_handshake() {
        let world = world();
        let mut agent = PipeAgent::new(PipeConfig::new("/nonexistent/armada-agent"));
        let err = agent.initialize(PlayerId(0), &world).await.expect_err("no such binary");
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[tokio::test]
    async fn test_stderr_log_file() {
        let dir = std::env::temp_dir().join(format!("armada-pipe-log-{}", std::process::id()));
        let mut config = shell("read init; echo noisy >&2; echo logger");
        config.log_dir = Some(dir.clone());
        let mut agent = PipeAgent::new(config);

        agent.initialize(PlayerId(2), &world()).await.expect("handshake");
        let log = agent.log_filename().expect("log configured");
        assert!(log.ends_with("agent-2.log"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
