//! Fixed-Point 2D Vector
//!
//! Deterministic 2D vector operations for positions and velocities.
//! All operations use fixed-point arithmetic.

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Serialize, Deserialize};

use super::angle::{cos_degrees, heading_degrees, sin_degrees};
use super::fixed::{
    Fixed, WideFixed, FIXED_ONE, FIXED_SCALE,
    fixed_mul, fixed_div, fixed_sqrt_wide, fixed_clamp, to_float,
};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: FIXED_ONE, y: 0 };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Vector of the given length pointing at a whole-degree angle
    /// (0° = +X, 90° = +Y).
    #[inline]
    pub fn from_polar(length: Fixed, degrees: i32) -> Self {
        Self {
            x: fixed_mul(length, cos_degrees(degrees)),
            y: fixed_mul(length, sin_degrees(degrees)),
        }
    }

    /// Rotate counter-clockwise by a whole-degree angle.
    #[inline]
    pub fn rotate_degrees(self, degrees: i32) -> Self {
        let (s, c) = (sin_degrees(degrees), cos_degrees(degrees));
        Self {
            x: fixed_mul(self.x, c) - fixed_mul(self.y, s),
            y: fixed_mul(self.x, s) + fixed_mul(self.y, c),
        }
    }

    /// Whole-degree heading of this vector, in [0, 360).
    #[inline]
    pub fn heading_degrees(self) -> i32 {
        heading_degrees(self.x, self.y)
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Squared length in Q32.32.
    #[inline]
    pub fn length_squared(self) -> WideFixed {
        let x = self.x as i64;
        let y = self.y as i64;
        x * x + y * y
    }

    /// Length (magnitude), exact floor.
    #[inline]
    pub fn length(self) -> Fixed {
        fixed_sqrt_wide(self.length_squared())
    }

    /// Squared distance to another point in Q32.32.
    ///
    /// Never overflows for map-sized coordinates.
    #[inline]
    pub fn distance_squared(self, other: Self) -> WideFixed {
        self.sub(other).length_squared()
    }

    /// Distance to another point. Prefer `within` for range checks.
    #[inline]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt_wide(self.distance_squared(other))
    }

    /// Inclusive range check: `distance(self, other) <= range`.
    #[inline]
    pub fn within(self, other: Self, range: Fixed) -> bool {
        let range = range as i64;
        self.distance_squared(other) <= range * range
    }

    /// Shrink the vector so its length is at most `max_length`.
    ///
    /// Direction is preserved; vectors already short enough are unchanged.
    pub fn clamp_length(self, max_length: Fixed) -> Self {
        let len = self.length();
        if len <= max_length {
            return self;
        }
        self.scale(fixed_div(max_length, len))
    }

    /// Reduce the length by `amount`, flooring at zero. Never reverses.
    pub fn shorten(self, amount: Fixed) -> Self {
        let len = self.length();
        if len <= amount {
            return Self::ZERO;
        }
        self.scale(fixed_div(len - amount, len))
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0 {
            return Self::ZERO;
        }
        Self {
            x: fixed_div(self.x, len),
            y: fixed_div(self.y, len),
        }
    }

    /// Clamp to the map rectangle `[0, width] x [0, height]`.
    #[inline]
    pub fn clamp_to_bounds(self, width: Fixed, height: Fixed) -> Self {
        Self {
            x: fixed_clamp(self.x, 0, width),
            y: fixed_clamp(self.y, 0, height),
        }
    }

    /// Check if position lies inside `[0, width] x [0, height]`.
    #[inline]
    pub fn is_in_bounds(self, width: Fixed, height: Fixed) -> bool {
        self.x >= 0 && self.x <= width && self.y >= 0 && self.y <= height
    }


    /// Convert to float tuple for replay output.
    #[inline]
    pub fn to_floats(self) -> (f64, f64) {
        (to_float(self.x), to_float(self.y))
    }
}

// Operator overloads for ergonomics
impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        FixedVec2::add(self, rhs)
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        FixedVec2::sub(self, rhs)
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

// =============================================================================
// TESTS
// =============================================================================
