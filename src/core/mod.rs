//! Core deterministic primitives.
//!
//! Everything here is integer-only and platform-independent. The game rules,
//! state hash and replay verification are all built on these types.

pub mod fixed;
pub mod angle;
pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, WideFixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher};
