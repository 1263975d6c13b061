//! Armada Engine
//!
//! Runs a demo match between built-in bots (and optionally external agent
//! executables), writes the replay and verifies it by re-simulation.
//!
//! Environment overrides:
//!
//! | Variable               | Meaning                                      |
//! |------------------------|----------------------------------------------|
//! | `ARMADA_WIDTH`         | map width (default 240)                      |
//! | `ARMADA_HEIGHT`        | map height (default 160)                     |
//! | `ARMADA_SEED`          | map seed (default: derived from the match)   |
//! | `ARMADA_PLAYERS`       | player count, 1 to 4 (default 2)             |
//! | `ARMADA_MAX_TURNS`     | turn limit                                   |
//! | `ARMADA_MATCH_ID`      | match id (default 1)                         |
//! | `ARMADA_CONSTANTS`     | JSON object overriding balance constants     |
//! | `ARMADA_AGENTS`        | `;`-separated agent command lines            |
//! | `ARMADA_TURN_MS`       | per-turn deadline in milliseconds            |
//! | `ARMADA_IGNORE_TIMEOUT`| `1` disables deadlines                       |
//! | `ARMADA_REPLAY_DIR`    | replay directory (default `replays`)         |
//! | `ARMADA_REPLAY_FORMAT` | `json` or `bincode`                          |
//! | `ARMADA_QUIET`         | `1` hides per-turn logs                      |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use armada::{
    VERSION,
    game::config::GameConstants,
    network::{Agent, Behavior, BotAgent, MatchSession, PipeAgent, PipeConfig, SessionConfig},
    replay::{verify_replay, ReplayFormat},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Armada Engine v{}", VERSION);

    let config = session_config()?;
    let replay_dir = env_var::<PathBuf>("ARMADA_REPLAY_DIR")?.unwrap_or_else(|| PathBuf::from("replays"));
    let match_id = env_var::<u32>("ARMADA_MATCH_ID")?.unwrap_or(1);
    let agents = roster(&config)?;

    info!(
        players = agents.len(),
        width = config.width,
        height = config.height,
        max_turns = config.max_turns(),
        "=== Starting Match ==="
    );

    let mut session = MatchSession::new(config, agents);
    let stats = session.run_game(Vec::new(), match_id, true, &replay_dir).await?;

    if let Some(path) = &stats.output_filename {
        info!("Replay: {}", path);
    }
    for tag in &stats.timeout_tags {
        info!("Player {} timed out", tag);
    }

    // Verify determinism by re-simulating the recording
    info!("=== Verifying Replay ===");
    let replay = session.last_replay().context("session produced no replay")?;
    info!("Replay digest: {}", hex::encode(replay.digest()?));

    let result = verify_replay(replay);
    if !result.valid {
        bail!("replay verification failed: {:?}", result.error);
    }
    info!(frames = result.frames_checked, final_hash = %result.computed_final_hash, "REPLAY VERIFIED");

    Ok(())
}

fn session_config() -> Result<SessionConfig> {
    let mut config = SessionConfig::default();

    if let Some(width) = env_var("ARMADA_WIDTH")? {
        config.width = width;
    }
    if let Some(height) = env_var("ARMADA_HEIGHT")? {
        config.height = height;
    }
    config.seed = env_var("ARMADA_SEED")?;
    config.max_turns = env_var("ARMADA_MAX_TURNS")?;
    if let Some(ms) = env_var::<u64>("ARMADA_TURN_MS")? {
        config.turn_deadline = Duration::from_millis(ms);
    }
    config.ignore_timeout = env_flag("ARMADA_IGNORE_TIMEOUT");
    config.quiet = env_flag("ARMADA_QUIET");

    if let Ok(json) = std::env::var("ARMADA_CONSTANTS") {
        config.constants = serde_json::from_str::<GameConstants>(&json).context("invalid ARMADA_CONSTANTS")?;
    }

    config.replay_format = match std::env::var("ARMADA_REPLAY_FORMAT").as_deref() {
        Ok("bincode") | Ok("bin") => ReplayFormat::Bincode,
        Ok("json") | Err(_) => ReplayFormat::Json,
        Ok(other) => bail!("unknown replay format '{}'", other),
    };

    Ok(config)
}

/// External agents first, then bots until the roster is full.
fn roster(config: &SessionConfig) -> Result<Vec<Agent>> {
    let players = env_var::<usize>("ARMADA_PLAYERS")?.unwrap_or(2);
    let mut agents: Vec<Agent> = Vec::with_capacity(players);

    if let Ok(commands) = std::env::var("ARMADA_AGENTS") {
        for line in commands.split(';').map(str::trim).filter(|l| !l.is_empty()) {
            let mut parts = line.split_whitespace();
            let Some(command) = parts.next() else { continue };
            let pipe = PipeConfig {
                log_dir: Some(PathBuf::from("agent-logs")),
                ..PipeConfig::new(command).with_args(parts)
            };
            agents.push(PipeAgent::new(pipe).into());
        }
    }

    let behaviors = [Behavior::Settler, Behavior::Raider];
    let mut k = 0;
    while agents.len() < players {
        let behavior = behaviors[k % behaviors.len()];
        agents.push(BotAgent::new(behavior, config.constants.clone()).into());
        k += 1;
    }
    Ok(agents)
}

fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {}", name)),
        Err(_) => Ok(None),
    }
}

fn env_flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true") | Ok("yes"))
}
