//! # Q9.6 Fixed-Point Codec
//!
//! Physical quantities travel as 16-bit two's-complement words with six
//! fractional bits (scale 64), giving a range of -512.0 to 511.984375 at a
//! resolution of 1/64.
//!
//! Out-of-range values saturate instead of wrapping. NaN has no fixed-point
//! representation and encodes as 0.

/// Number of fractional bits
pub const FRACTIONAL_BITS: u32 = 6;

/// Scale factor between physical value and raw word (2^6)
pub const SCALE: f32 = (1u32 << FRACTIONAL_BITS) as f32;

/// Smallest step the format can represent
pub const RESOLUTION: f32 = 1.0 / SCALE;

/// Largest encodable value (i16::MAX / 64)
pub const MAX_VALUE: f32 = i16::MAX as f32 / SCALE;

/// Smallest encodable value (i16::MIN / 64)
pub const MIN_VALUE: f32 = i16::MIN as f32 / SCALE;

/// Encode a physical value as a Q9.6 wire word
///
/// Rounds to the nearest 1/64 (ties away from zero), then clamps to the
/// signed 16-bit range before taking the bit pattern.
///
/// # Examples
///
/// ```
/// use prop_link::link::fixed_point::{encode, decode};
///
/// assert_eq!(encode(1.0), 64);
/// assert_eq!(encode(-1.0), 0xFFC0);
/// assert_eq!(decode(encode(12.5)), 12.5);
/// assert_eq!(encode(10_000.0), 0x7FFF);
/// ```
pub fn encode(value: f32) -> u16 {
    if value.is_nan() {
        return 0;
    }

    // `as` saturates on infinities, the clamp handles the rest
    let scaled = (value * SCALE).round() as i32;
    let clamped = scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

    clamped as u16
}

/// Decode a Q9.6 wire word back to a physical value
pub fn decode(word: u16) -> f32 {
    (word as i16) as f32 / SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_constants() {
        assert_eq!(SCALE, 64.0);
        assert_eq!(RESOLUTION, 0.015625);
        assert_eq!(MAX_VALUE, 511.984375);
        assert_eq!(MIN_VALUE, -512.0);
    }

    #[test]
    fn test_zero() {
        assert_eq!(encode(0.0), 0);
        assert_eq!(encode(-0.0), 0);
        assert_eq!(decode(0), 0.0);
    }

    #[test]
    fn test_every_representable_value_survives() {
        for raw in i16::MIN..=i16::MAX {
            let value = raw as f32 / SCALE;
            assert_eq!(decode(encode(value)), value, "raw {}", raw);
        }
    }

    #[test]
    fn test_known_words() {
        assert_eq!(encode(1.0), 0x0040);
        assert_eq!(encode(-1.0), 0xFFC0);
        assert_eq!(encode(15.0), 960);
        assert_eq!(encode(-15.0), (-960i16) as u16);
        assert_eq!(encode(100.0), 6400);
        assert_eq!(encode(MAX_VALUE), 0x7FFF);
        assert_eq!(encode(MIN_VALUE), 0x8000);
    }

    #[test]
    fn test_rounding_ties_away_from_zero() {
        // Exactly half a step
        assert_eq!(encode(RESOLUTION / 2.0), 1);
        assert_eq!(encode(-RESOLUTION / 2.0), (-1i16) as u16);
        // Just under half a step
        assert_eq!(encode(RESOLUTION * 0.49), 0);
    }

    #[test]
    fn test_saturation_at_the_edges() {
        assert_eq!(encode(512.0), encode(MAX_VALUE));
        assert_eq!(encode(-512.01), encode(MIN_VALUE));
        assert_eq!(encode(f32::INFINITY), 0x7FFF);
        assert_eq!(encode(f32::NEG_INFINITY), 0x8000);
        assert_eq!(encode(f32::MAX), 0x7FFF);
    }

    #[test]
    fn test_nan_encodes_as_zero() {
        assert_eq!(encode(f32::NAN), 0);
        assert_eq!(decode(encode(f32::NAN)), 0.0);
    }

    proptest! {
        #[test]
        fn prop_above_range_clamps_to_max(v in 511.9922f32..1.0e30f32) {
            prop_assert_eq!(encode(v), encode(MAX_VALUE));
        }

        #[test]
        fn prop_below_range_clamps_to_min(v in -1.0e30f32..-512.0079f32) {
            prop_assert_eq!(encode(v), encode(MIN_VALUE));
        }

        #[test]
        fn prop_in_range_error_within_half_step(v in MIN_VALUE..MAX_VALUE) {
            let err = (decode(encode(v)) - v).abs();
            prop_assert!(err <= RESOLUTION / 2.0 + f32::EPSILON * 512.0);
        }
    }
}
