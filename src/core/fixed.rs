//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the simulation.
//! All operations use integer arithmetic only - no floats in game rules.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Maps are at most a few hundred units across, so coordinates fit with a
//! wide margin. Squared distances do NOT fit in 32 bits; those are computed
//! as `i64` in Q32.32 (see [`WideFixed`]).

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Q32.32 product of two [`Fixed`] values (squared lengths, squared ranges).
pub type WideFixed = i64;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use for constants and configuration. NEVER inside a pass.
///
/// # Example
/// ```
/// use armada::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert an integer to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Convert fixed-point to float for display and replay output.
///
/// Exact: every Q16.16 value is representable as an f64.
#[inline]
pub fn to_float(f: Fixed) -> f64 {
    f as f64 / FIXED_ONE as f64
}

/// Multiply two fixed-point numbers.
///
/// Uses an i64 intermediate, then truncates (arithmetic shift).
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Divide-by-zero returns 0 (deterministic, never panics).
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square a fixed-point value into a Q32.32 wide value (exact).
#[inline]
pub fn fixed_square_wide(a: Fixed) -> WideFixed {
    (a as i64) * (a as i64)
}

/// Exact floor integer square root.
///
/// Bit-by-bit method: no division, no floats, identical on every platform.
pub fn isqrt_u64(value: u64) -> u64 {
    if value < 2 {
        return value;
    }

    let mut remainder = value;
    let mut result = 0u64;
    let mut bit = 1u64 << 62;
    while bit > remainder {
        bit >>= 2;
    }

    while bit != 0 {
        if remainder >= result + bit {
            remainder -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }

    result
}

/// Square root of a Q32.32 wide value, returned as Q16.16.
///
/// Non-positive inputs return 0.
#[inline]
pub fn fixed_sqrt_wide(x: WideFixed) -> Fixed {
    if x <= 0 {
        return 0;
    }
    isqrt_u64(x as u64).min(i32::MAX as u64) as Fixed
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    value.max(min).min(max)
}

// =============================================================================
// TESTS
// =============================================================================
