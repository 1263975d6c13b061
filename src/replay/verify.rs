//! Replay Verification
//!
//! Re-simulates a replay from its initial frame using the recorded moves and
//! timeouts, and compares every frame's state hash and events against the
//! recording.

use thiserror::Error;
use tracing::{debug, warn};

use crate::game::frame::FrameProcessor;
use crate::game::world::World;
use crate::replay::{Replay, REPLAY_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("replay version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("replay has no initial frame")]
    MissingInitialFrame,

    #[error("initial state hash mismatch")]
    InitialStateMismatch { expected: String, computed: String },

    #[error("frame {index} has turn {got}, expected {expected}")]
    TurnGap { index: usize, expected: u32, got: u32 },

    #[error("state hash mismatch at turn {turn}")]
    StateMismatch { turn: u32, expected: String, computed: String },

    #[error("event log mismatch at turn {turn}")]
    EventMismatch { turn: u32 },

    #[error("match did not end where the replay ends (turn {turn})")]
    TerminalMismatch { turn: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    /// Frames whose hash matched, initial frame included
    pub frames_checked: usize,
    pub computed_final_hash: String,
    pub expected_final_hash: String,
    pub error: Option<VerificationError>,
}

impl VerificationResult {
    fn failed(frames_checked: usize, error: VerificationError) -> Self {
        warn!(%error, frames_checked, "replay verification failed");
        Self {
            valid: false,
            frames_checked,
            computed_final_hash: String::new(),
            expected_final_hash: String::new(),
            error: Some(error),
        }
    }
}

/// Verify a replay by full re-simulation.
pub fn verify_replay(replay: &Replay) -> VerificationResult {
    let header = &replay.header;
    if header.version != REPLAY_VERSION {
        return VerificationResult::failed(
            0,
            VerificationError::VersionMismatch { expected: REPLAY_VERSION, got: header.version },
        );
    }

    // 1. Initial world
    let Some(initial) = replay.frames.first().filter(|f| f.turn == 0) else {
        return VerificationResult::failed(0, VerificationError::MissingInitialFrame);
    };
    let world = World::from(initial.world.clone());
    let initial_hash = hex::encode(world.compute_hash());
    if initial_hash != initial.state_hash {
        return VerificationResult::failed(
            0,
            VerificationError::InitialStateMismatch {
                expected: initial.state_hash.clone(),
                computed: initial_hash,
            },
        );
    }

    let mut processor = FrameProcessor::new(world, header.constants.clone(), header.max_turns);
    processor.eliminate_before_start(&header.initial_timeouts);

    // 2. Turn by turn
    let mut computed = initial_hash;
    for (index, frame) in replay.frames.iter().enumerate().skip(1) {
        let expected_turn = processor.turn() + 1;
        if frame.turn != expected_turn {
            return VerificationResult::failed(
                index,
                VerificationError::TurnGap { index, expected: expected_turn, got: frame.turn },
            );
        }

        processor.process_frame(frame.move_queue(), &frame.timed_out);
        computed = hex::encode(processor.world().compute_hash());
        if computed != frame.state_hash {
            return VerificationResult::failed(
                index,
                VerificationError::StateMismatch {
                    turn: frame.turn,
                    expected: frame.state_hash.clone(),
                    computed,
                },
            );
        }

        let recorded = processor.history().events.last().map(Vec::as_slice).unwrap_or_default();
        if recorded != frame.events.as_slice() {
            return VerificationResult::failed(index, VerificationError::EventMismatch { turn: frame.turn });
        }
    }

    // 3. The recording must stop exactly where the match ended
    if replay.frames.len() > 1 && !processor.is_terminal() {
        return VerificationResult::failed(
            replay.frames.len(),
            VerificationError::TerminalMismatch { turn: processor.turn() },
        );
    }

    debug!(frames = replay.frames.len(), "replay verified");
    let expected = replay.frames.last().map(|f| f.state_hash.clone()).unwrap_or_default();
    VerificationResult {
        valid: true,
        frames_checked: replay.frames.len(),
        computed_final_hash: computed,
        expected_final_hash: expected,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::tests::played_match;
    use crate::replay::{Replay, ReplayFormat};

    #[test]
    fn test_recorded_match_verifies() {
        let replay = played_match();
        let result = verify_replay(&replay);
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.frames_checked, replay.frames.len());
        assert_eq!(result.computed_final_hash, result.expected_final_hash);
    }

    #[test]
    fn test_verifies_after_encoding() {
        let replay = played_match();
        for format in [ReplayFormat::Json, ReplayFormat::Bincode] {
            let bytes = replay.encode(format).expect("encode");
            let decoded = Replay::decode(&bytes, format).expect("decode");
            assert!(verify_replay(&decoded).valid);
        }
    }

    #[test]
    fn test_tampered_moves_detected() {
        let mut replay = played_match();
        // Drop player 1's thrust on turn 2
        replay.frames[2].moves.retain(|pm| pm.player.0 != 1);

        let result = verify_replay(&replay);
        assert!(!result.valid);
        assert!(matches!(result.error, Some(VerificationError::StateMismatch { turn: 2, .. })));
        assert_eq!(result.frames_checked, 2);
    }

    #[test]
    fn test_tampered_initial_world_detected() {
        let mut replay = played_match();
        replay.frames[0].world.ships[0].health -= 1;
        assert!(matches!(
            verify_replay(&replay).error,
            Some(VerificationError::InitialStateMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_events_detected() {
        let mut replay = played_match();
        let turn = replay.frames.iter().position(|f| !f.events.is_empty()).expect("some events");
        replay.frames[turn].events.clear();
        assert!(matches!(verify_replay(&replay).error, Some(VerificationError::EventMismatch { .. })));
    }

    #[test]
    fn test_missing_frames_detected() {
        let mut replay = played_match();
        replay.frames.remove(1);
        assert!(matches!(
            verify_replay(&replay).error,
            Some(VerificationError::TurnGap { index: 1, expected: 1, got: 2 })
        ));

        let mut truncated = played_match();
        truncated.frames.truncate(2);
        assert!(matches!(
            verify_replay(&truncated).error,
            Some(VerificationError::TerminalMismatch { turn: 1 })
        ));
    }
}
