//! Integer-Degree Trigonometry
//!
//! Thrust commands carry whole-degree angles. Sines for 0..=90 degrees are
//! precomputed at compile time with an integer Taylor series, so converting
//! an angle to a direction never touches platform float routines.

use super::fixed::Fixed;

/// π in Q32 (round(π · 2^32)).
const PI_Q32: i128 = 13_493_037_705;

/// Sine of a whole-degree angle in [0, 90], Q16.16, rounded to nearest.
const fn sin_quadrant(degrees: i32) -> Fixed {
    let x: i128 = (degrees as i128) * PI_Q32 / 180;
    let x2 = (x * x) >> 32;

    // x - x^3/3! + x^5/5! - ... up to x^13
    let mut term = x;
    let mut sum = x;
    let mut n: i128 = 1;
    while n <= 6 {
        term = -((term * x2) >> 32) / ((2 * n) * (2 * n + 1));
        sum += term;
        n += 1;
    }

    ((sum + (1 << 15)) >> 16) as Fixed
}

/// Lookup table: `SIN_LUT[d] = sin(d°)` for d in 0..=90.
pub static SIN_LUT: [Fixed; 91] = {
    let mut lut = [0i32; 91];
    let mut d = 0;
    while d <= 90 {
        lut[d] = sin_quadrant(d as i32);
        d += 1;
    }
    lut
};

/// Normalize any angle to [0, 360).
#[inline]
pub fn normalize_degrees(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

/// Sine of a whole-degree angle.
pub fn sin_degrees(degrees: i32) -> Fixed {
    let a = normalize_degrees(degrees);
    match a {
        0..=90 => SIN_LUT[a as usize],
        91..=180 => SIN_LUT[(180 - a) as usize],
        181..=270 => -SIN_LUT[(a - 180) as usize],
        _ => -SIN_LUT[(360 - a) as usize],
    }
}

/// Cosine of a whole-degree angle.
#[inline]
pub fn cos_degrees(degrees: i32) -> Fixed {
    sin_degrees(normalize_degrees(degrees) + 90)
}

/// Nearest whole-degree heading of the vector `(x, y)`, in [0, 360).
///
/// The zero vector has heading 0.
pub fn heading_degrees(x: Fixed, y: Fixed) -> i32 {
    if x == 0 && y == 0 {
        return 0;
    }

    let ax = (x as i128).abs();
    let ay = (y as i128).abs();

    // Reference angle in [0, 90]: first d with sin(d) * |v| >= |y|,
    // compared as sin(d)^2 * (x^2 + y^2) against y^2 * 2^32.
    let len_sq = ax * ax + ay * ay;
    let target = ay * ay * (1i128 << 32);
    let mut reference = 90;
    for (d, s) in SIN_LUT.iter().enumerate() {
        let s = *s as i128;
        if s * s * len_sq >= target {
            reference = d as i32;
            // Pick whichever neighbour is closer
            if d > 0 {
                let prev = SIN_LUT[d - 1] as i128;
                if target - prev * prev * len_sq < s * s * len_sq - target {
                    reference -= 1;
                }
            }
            break;
        }
    }

    let degrees = match (x >= 0, y >= 0) {
        (true, true) => reference,
        (false, true) => 180 - reference,
        (false, false) => 180 + reference,
        (true, false) => 360 - reference,
    };
    normalize_degrees(degrees)
}
