//! Command Transport
//!
//! The seam between the engine and whatever produces player commands. A
//! handle answers two requests: a one-off initialization handshake, and a
//! command batch per turn. Deadlines are enforced by the collector, not by
//! the handles.

use std::future::Future;
use thiserror::Error;

use crate::core::fixed::from_int;
use crate::game::entity::{PlanetId, PlayerId, ShipId};
use crate::game::moves::Move;
use crate::game::world::World;

/// Transport failures. All of them count as a timeout for the player.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("deadline expired")]
    Timeout,

    #[error("malformed command batch: {0}")]
    Malformed(String),

    #[error("agent disconnected: {0}")]
    Disconnected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A source of commands for one player.
pub trait AgentHandle: Send {
    /// Handshake before turn 1. Resolves to the agent's display name.
    fn initialize(
        &mut self,
        player: PlayerId,
        world: &World,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Command batch for `turn`, computed from the world snapshot.
    fn request_commands(
        &mut self,
        turn: u32,
        world: &World,
    ) -> impl Future<Output = Result<Vec<Move>, TransportError>> + Send;

    /// Log file kept for this agent, reported when it times out.
    fn log_filename(&self) -> Option<String> {
        None
    }
}

/// Parse one line of whitespace-separated commands issued by `player`.
///
/// ```text
/// t <ship> <magnitude> <angle>   thrust
/// d <ship> <planet>              dock
/// u <ship>                       undock
/// n <ship>                       no-op
/// ```
///
/// Ship numbers are the player's own ship indices. Any unknown command or
/// missing/invalid argument rejects the whole batch.
pub fn parse_commands(player: PlayerId, line: &str) -> Result<Vec<Move>, TransportError> {
    let mut tokens = line.split_whitespace();
    let mut moves = Vec::new();

    fn arg<T: std::str::FromStr>(
        tokens: &mut std::str::SplitWhitespace<'_>,
        command: &str,
    ) -> Result<T, TransportError> {
        let token = tokens
            .next()
            .ok_or_else(|| TransportError::Malformed(format!("'{command}' is missing an argument")))?;
        token
            .parse()
            .map_err(|_| TransportError::Malformed(format!("bad argument '{token}' for '{command}'")))
    }

    while let Some(command) = tokens.next() {
        let ship = ShipId::new(player, arg(&mut tokens, command)?);
        let mv = match command {
            "t" => {
                let magnitude: i32 = arg(&mut tokens, command)?;
                let angle_degrees: i32 = arg(&mut tokens, command)?;
                if !(0..=i16::MAX as i32).contains(&magnitude) {
                    return Err(TransportError::Malformed(format!("thrust magnitude {magnitude} out of range")));
                }
                Move::Thrust { ship, magnitude: from_int(magnitude), angle_degrees }
            }
            "d" => Move::Dock { ship, planet: PlanetId(arg(&mut tokens, command)?) },
            "u" => Move::Undock { ship },
            "n" => Move::Noop { ship },
            other => return Err(TransportError::Malformed(format!("unknown command '{other}'"))),
        };
        moves.push(mv);
    }

    Ok(moves)
}

/// Render moves in the line format accepted by [`parse_commands`].
pub fn format_commands(moves: &[Move]) -> String {
    moves
        .iter()
        .map(|mv| match *mv {
            Move::Thrust { ship, magnitude, angle_degrees } => {
                format!("t {} {} {}", ship.index, magnitude >> crate::core::fixed::FIXED_SCALE, angle_degrees)
            }
            Move::Dock { ship, planet } => format!("d {} {}", ship.index, planet.0),
            Move::Undock { ship } => format!("u {}", ship.index),
            Move::Noop { ship } => format!("n {}", ship.index),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: PlayerId = PlayerId(1);

    #[test]
    fn test_parse_all_commands() {
        let moves = parse_commands(P, "t 0 7 90 d 1 3 u 2 n 4").expect("valid batch");
        assert_eq!(
            moves,
            vec![
                Move::Thrust { ship: ShipId::new(P, 0), magnitude: from_int(7), angle_degrees: 90 },
                Move::Dock { ship: ShipId::new(P, 1), planet: PlanetId(3) },
                Move::Undock { ship: ShipId::new(P, 2) },
                Move::Noop { ship: ShipId::new(P, 4) },
            ]
        );
    }

    #[test]
    fn test_parse_empty_line() {
        assert!(parse_commands(P, "   ").expect("empty batch").is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_commands(P, "x 1"), Err(TransportError::Malformed(_))));
        assert!(matches!(parse_commands(P, "t 1 5"), Err(TransportError::Malformed(_))));
        assert!(matches!(parse_commands(P, "d one 2"), Err(TransportError::Malformed(_))));
        assert!(matches!(parse_commands(P, "t 0 -3 10"), Err(TransportError::Malformed(_))));
    }

    #[test]
    fn test_format_matches_parse() {
        let line = "t 0 7 -45 d 1 3 u 2 n 4";
        let moves = parse_commands(P, line).expect("valid batch");
        assert_eq!(format_commands(&moves), line);
    }
}
