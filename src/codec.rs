//! Conversion between integers and vectors of logic values
//!
//! Bit i of the vector has weight 2^i, both when encoding and when decoding, so that
//! `decode(&encode(x)) == x` for every 32-bit integer.
//!
//! ```
//! # use tetrasim::codec::{decode, encode};
//! # use tetrasim::LogicValue;
//! let v = encode(6);
//! assert_eq!(&v[..3], &[LogicValue::Zero, LogicValue::One, LogicValue::One]);
//! assert_eq!(decode(&v), 6);
//! ```

use crate::network::LogicValue;

/// Encode the low `width` bits of an integer, least significant bit first
pub fn encode_bits(value: u64, width: usize) -> Vec<LogicValue> {
    assert!(width <= 64, "Cannot encode {width} bits in a 64-bit integer");
    (0..width).map(|i| ((value >> i) & 1 != 0).into()).collect()
}

/// Decode a vector of up to 64 values, least significant bit first
///
/// Unknown and undriven bits count as 0.
pub fn decode_bits(values: &[LogicValue]) -> u64 {
    assert!(values.len() <= 64, "Cannot decode {} bits", values.len());
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == LogicValue::One)
        .fold(0, |acc, (i, _)| acc | (1u64 << i))
}

/// Encode a 32-bit integer into 32 values
pub fn encode(value: u32) -> Vec<LogicValue> {
    encode_bits(value as u64, 32)
}

/// Decode 32 values into an integer
pub fn decode(values: &[LogicValue]) -> u32 {
    decode_bits(values) as u32
}

/// Encode a signed integer in two's complement
pub fn encode_i32(value: i32) -> Vec<LogicValue> {
    encode(value as u32)
}

/// Decode a two's complement integer
pub fn decode_i32(values: &[LogicValue]) -> i32 {
    decode(values) as i32
}

/// Returns true if every value is known
pub fn is_defined(values: &[LogicValue]) -> bool {
    values.iter().all(|v| v.is_known())
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::network::LogicValue::*;

    #[test]
    fn test_bit_order() {
        let v = encode(6);
        assert_eq!(v.len(), 32);
        assert_eq!(&v[..4], &[Zero, One, One, Zero]);
        assert!(v[3..].iter().all(|b| *b == Zero));
        assert_eq!(decode(&v), 6);
        assert_eq!(decode(&[One, One]), 3);
        assert_eq!(decode(&[Zero, One, One]), 6);
    }

    #[test]
    fn test_round_trip() {
        for x in [0, 1, 2, 6, 0x8000_0000, 0xdead_beef, u32::MAX, u32::MAX - 1] {
            assert_eq!(decode(&encode(x)), x);
            assert!(is_defined(&encode(x)));
        }
        for x in [0, -1, 1, i32::MIN, i32::MAX, -123_456] {
            assert_eq!(decode_i32(&encode_i32(x)), x);
        }
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..10_000 {
            let x: u32 = rng.gen();
            assert_eq!(decode(&encode(x)), x);
        }
    }

    #[test]
    fn test_undefined_bits() {
        let mut v = encode(0b1011);
        v[1] = Unknown;
        v[3] = HighZ;
        assert!(!is_defined(&v));
        assert_eq!(decode(&v), 0b0001);
        // Decoding does not touch the values
        assert_eq!(v[1], Unknown);
        assert_eq!(v[3], HighZ);
    }

    #[test]
    fn test_widths() {
        assert_eq!(encode_bits(0b101, 3), vec![One, Zero, One]);
        assert_eq!(encode_bits(0xff, 4), vec![One; 4]);
        assert!(encode_bits(12, 0).is_empty());
        assert_eq!(decode_bits(&[]), 0);
        assert_eq!(decode_bits(&encode_bits(u64::MAX, 64)), u64::MAX);
    }
}
