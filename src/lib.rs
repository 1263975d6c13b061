//! # Armada Engine
//!
//! Deterministic turn-based fleet battle simulator with verifiable replays.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ARMADA ENGINE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── fixed.rs     - Q16.16 fixed-point arithmetic            │
//! │  ├── angle.rs     - Whole-degree sine/cosine tables          │
//! │  ├── vec2.rs      - 2D vector with fixed-point               │
//! │  ├── rng.rs       - Deterministic Xorshift128+ PRNG          │
//! │  └── hash.rs      - State hashing for verification           │
//! │                                                              │
//! │  game/            - Simulation (deterministic)               │
//! │  ├── world.rs     - Ship and planet registry                 │
//! │  ├── moves.rs     - Commands and validation                  │
//! │  ├── frame.rs     - Authoritative turn loop                  │
//! │  ├── movement.rs  - Thrust, integration, drag                │
//! │  ├── combat.rs    - Collisions, damage, destruction          │
//! │  ├── docking.rs   - Docking state machine                    │
//! │  ├── production.rs- Ship production                          │
//! │  ├── stats.rs     - Statistics and ranking                   │
//! │  └── mapgen.rs    - Initial world generation                 │
//! │                                                              │
//! │  network/         - Agents (non-deterministic)               │
//! │  ├── collector.rs - Deadline-bounded command collection      │
//! │  ├── bots.rs      - In-process bots                          │
//! │  ├── pipe.rs      - Child-process agents                     │
//! │  └── session.rs   - Match session                            │
//! │                                                              │
//! │  replay/          - Recording and re-simulation              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game rules
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - Map randomness from seeded Xorshift128+ only
//!
//! Given the same initial world, constants and recorded moves, the
//! simulation produces **identical worlds, events and state hashes**.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod replay;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::{FrameProcessor, GameConstants, GameStatistics, Move, PlayerId, World};
pub use network::{MatchSession, SessionConfig};
pub use replay::{verify_replay, Replay};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
