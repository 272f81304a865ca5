//! Bit-level codec for the single-byte frame protocol.
//!
//! Every frame on the wire is one byte. The top bits select the frame class:
//!
//! - `0xxxxxxx` GET, low bits select a channel code
//! - `10dddddd` SET fraction frame, 6-bit fraction payload
//! - `11dddddd` SET integer frame, 6-bit integer payload
//!
//! All functions here are pure. The dual fraction rule and the dual pressure
//! format are wire-format ambiguities shared with deployed firmware and must
//! keep their thresholds exactly.

use super::commands::{DATA_6BIT_MASK, SET_FRACTION_TAG, SET_INTEGER_TAG};

/// Divisor for the one-decimal-digit fraction encoding (payload 0..=9).
pub const FRACTION_DIVISOR_DIGIT: f64 = 10.0;
/// Divisor for the 6-bit fractional encoding (payload 10..=63).
pub const FRACTION_DIVISOR_6BIT: f64 = 64.0;
/// Largest payload interpreted as a single decimal digit.
pub const MAX_DIGIT_FRACTION: u8 = 9;

/// Pressure readings at or below this high byte may be fixed-point.
pub const PRESSURE_FIXED_POINT_MAX_HIGH: u8 = 200;

/// Classification of one frame byte by its tag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    /// GET request carrying a channel code.
    Get(u8),
    /// SET fraction frame carrying a 6-bit payload.
    SetFraction(u8),
    /// SET integer frame carrying a 6-bit payload.
    SetInteger(u8),
}

impl FrameClass {
    pub fn classify(frame: u8) -> Self {
        if frame & 0b1000_0000 == 0 {
            FrameClass::Get(frame)
        } else if frame & SET_INTEGER_TAG == SET_INTEGER_TAG {
            FrameClass::SetInteger(frame & DATA_6BIT_MASK)
        } else {
            FrameClass::SetFraction(frame & DATA_6BIT_MASK)
        }
    }
}

/// Decode a fraction byte.
///
/// Bytes `0..=9` are always read as one decimal digit; anything larger is read
/// as a 6-bit binary fraction. The byte value itself is the only disambiguator
/// the wire format provides.
pub fn decode_fraction(low: u8) -> f64 {
    if low <= MAX_DIGIT_FRACTION {
        f64::from(low) / FRACTION_DIVISOR_DIGIT
    } else {
        f64::from(low) / FRACTION_DIVISOR_6BIT
    }
}

/// Encode the fractional part of `value` as a single decimal digit.
///
/// The sign is stripped, the digit is rounded half-to-even, and a digit that
/// rounds up to 10 wraps to 0 (the integer part is never carried). Only the
/// one-digit form is ever produced, so both decoder generations accept it.
pub fn encode_fraction(value: f64) -> u8 {
    let frac = (value - value.trunc()).abs();
    let digit = (frac * FRACTION_DIVISOR_DIGIT).round_ties_even();
    let digit = if !(0.0..10.0).contains(&digit) {
        0
    } else {
        digit as u8
    };
    digit & DATA_6BIT_MASK
}

/// Combine an integer half and a fraction byte.
///
/// `high` is taken as already signed; see [`signed_high`].
pub fn combine_int_frac(high: i16, low: u8) -> f64 {
    f64::from(high) + decode_fraction(low)
}

/// Interpret a raw high byte as an 8-bit two's complement integer.
pub fn signed_high(raw: u8) -> i16 {
    i16::from(raw as i8)
}

/// Combine a pressure reading using the two-firmware heuristic.
///
/// `low <= 9 && high <= 200` is a fixed-point reading `high + low / 10`;
/// everything else is a raw big-endian 16-bit integer.
pub fn combine_pressure(high: u8, low: u8) -> f64 {
    if low <= MAX_DIGIT_FRACTION && high <= PRESSURE_FIXED_POINT_MAX_HIGH {
        f64::from(high) + f64::from(low) / FRACTION_DIVISOR_DIGIT
    } else {
        f64::from((u16::from(high) << 8) | u16::from(low))
    }
}

/// Integer payload of `value`: truncated toward zero, then masked to 6 bits.
///
/// Values outside `0..64` alias modulo 64; callers clamp first.
pub fn integer_payload(value: f64) -> u8 {
    ((value.trunc() as i64) & i64::from(DATA_6BIT_MASK)) as u8
}

/// SET integer frame (`11dddddd`) for `value`.
pub fn integer_frame(value: f64) -> u8 {
    SET_INTEGER_TAG | integer_payload(value)
}

/// SET fraction frame (`10dddddd`) for `value`.
pub fn fraction_frame(value: f64) -> u8 {
    SET_FRACTION_TAG | (encode_fraction(value) & DATA_6BIT_MASK)
}

/// The two frames of one SET, plus the payloads they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetFrames {
    pub integer: u8,
    pub fraction: u8,
}

impl SetFrames {
    pub fn encode(value: f64) -> Self {
        Self {
            integer: integer_frame(value),
            fraction: fraction_frame(value),
        }
    }

    pub fn integer_payload(&self) -> u8 {
        self.integer & DATA_6BIT_MASK
    }

    pub fn fraction_payload(&self) -> u8 {
        self.fraction & DATA_6BIT_MASK
    }

    /// The physical value the device will hold after accepting these frames.
    pub fn encoded_value(&self) -> f64 {
        combine_int_frac(i16::from(self.integer_payload()), self.fraction_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fraction_digit_range_uses_tenths() {
        for low in 0u8..=9 {
            assert!(close(decode_fraction(low), f64::from(low) / 10.0), "low={low}");
        }
    }

    #[test]
    fn fraction_above_nine_uses_sixty_fourths() {
        for low in 10u8..=63 {
            assert!(close(decode_fraction(low), f64::from(low) / 64.0), "low={low}");
        }
    }

    #[test]
    fn encode_fraction_round_trips_within_one_digit() {
        let mut value = 0.0;
        while value < 70.0 {
            let frac = value - f64::trunc(value);
            let decoded = decode_fraction(encode_fraction(value));
            // A digit rounding up to 10 wraps to 0, which is 1.0 away from a
            // fraction of 0.95+; compare on the circle.
            let diff = (decoded - frac).abs();
            assert!(diff <= 0.1 + 1e-9 || (1.0 - diff) <= 0.1 + 1e-9, "value={value}");
            value += 0.037;
        }
    }

    #[test]
    fn encode_fraction_strips_sign_and_wraps() {
        assert_eq!(encode_fraction(-5.3), 3);
        assert_eq!(encode_fraction(12.96), 0);
        assert_eq!(encode_fraction(12.0), 0);
        assert_eq!(encode_fraction(0.25), 2);
        assert_eq!(encode_fraction(0.35), 4);
    }

    #[test]
    fn combine_examples() {
        assert!(close(combine_int_frac(5, 3), 5.3));
        assert!(close(combine_int_frac(signed_high(251), 3), -4.7));
        assert_eq!(signed_high(127), 127);
        assert_eq!(signed_high(128), -128);
    }

    #[test]
    fn pressure_heuristic_boundaries() {
        assert!(close(combine_pressure(120, 5), 120.5));
        assert!(close(combine_pressure(120, 15), 30735.0));
        assert!(close(combine_pressure(200, 9), 200.9));
        assert!(close(combine_pressure(201, 9), f64::from((201u16 << 8) | 9)));
    }

    #[test]
    fn set_frames_carry_tags() {
        let frames = SetFrames::encode(22.5);
        assert_eq!(frames.integer, 0b1100_0000 | 22);
        assert_eq!(frames.fraction, 0b1000_0000 | 5);
        assert!(close(frames.encoded_value(), 22.5));
    }

    #[test]
    fn integer_payload_truncates_and_aliases() {
        assert_eq!(integer_payload(63.9), 63);
        assert_eq!(integer_payload(64.0), 0);
        assert_eq!(integer_payload(100.0), 36);
        assert_eq!(integer_payload(-5.3), 59);
    }

    #[test]
    fn classify_frames() {
        assert_eq!(FrameClass::classify(0b0000_0100), FrameClass::Get(4));
        assert_eq!(FrameClass::classify(0b1000_0111), FrameClass::SetFraction(7));
        assert_eq!(FrameClass::classify(0b1110_1010), FrameClass::SetInteger(42));
    }
}
