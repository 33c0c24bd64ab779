//! Gray-coded QPSK constellation.
//!
//! Code bits are consumed in (G1, G2) pairs, G1 first. The four
//! points sit on the unit circle at ±45° and ±135°, so adjacent
//! symbols differ in exactly one bit.
use crate::{Complex, Float};

const AMP: Float = std::f32::consts::FRAC_1_SQRT_2;

/// Symbol index (b1 << 1) | b0 to constellation point.
pub const CONSTELLATION: [Complex; 4] = [
    Complex::new(AMP, AMP),   // 00
    Complex::new(AMP, -AMP),  // 01
    Complex::new(-AMP, AMP),  // 10
    Complex::new(-AMP, -AMP), // 11
];

/// Map one dibit to its constellation point, first bit b1.
#[must_use]
pub fn map_dibit(b1: u8, b0: u8) -> Complex {
    CONSTELLATION[(((b1 << 1) | b0) & 3) as usize]
}
