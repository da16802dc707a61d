use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::str::FromStr;

/// Four-valued logic value carried by a signal
///
/// May be 0, 1, x (unknown) or z (undriven).
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum LogicValue {
    /// Driven, known 0
    Zero,
    /// Driven, known 1
    One,
    /// Driven, but indeterminate
    #[default]
    Unknown,
    /// Not driven
    HighZ,
}

use LogicValue::*;

impl LogicValue {
    /// All four values, for exhaustive checks
    pub const ALL: [LogicValue; 4] = [Zero, One, Unknown, HighZ];

    /// Returns true for Zero and One
    pub fn is_known(self) -> bool {
        matches!(self, Zero | One)
    }

    /// Boolean value, if known
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Zero => Some(false),
            One => Some(true),
            _ => None,
        }
    }

    /// Resolution of two drivers on the same net
    ///
    /// Identical known values are kept, a high-impedance side gives way to the other one,
    /// and any other combination is unknown. Two undriven sides stay undriven: HighZ is the
    /// identity of the merge, which keeps it associative, so that [`LogicValue::resolve`] does
    /// not depend on the order of the drivers.
    ///
    /// This is the only resolution rule: signal merging and [`LogicValue::resolve`] both go
    /// through it. Operators and reductions do not: an undriven operand of a gate reads as
    /// unknown, it does not give way to the other operands.
    pub fn merge(self, other: LogicValue) -> LogicValue {
        match (self, other) {
            (HighZ, v) | (v, HighZ) => v,
            (Zero, Zero) => Zero,
            (One, One) => One,
            _ => Unknown,
        }
    }

    /// Resolve any number of drivers; no driver at all leaves the net undriven
    pub fn resolve<I: IntoIterator<Item = LogicValue>>(values: I) -> LogicValue {
        values.into_iter().fold(HighZ, LogicValue::merge)
    }

    /// Apply a boolean function if both operands are known, otherwise unknown
    fn binary(self, other: LogicValue, f: fn(bool, bool) -> bool) -> LogicValue {
        match (self.to_bool(), other.to_bool()) {
            (Some(a), Some(b)) => f(a, b).into(),
            _ => Unknown,
        }
    }

    /// Reduction with a dominant value that decides the result on its own
    fn reduce<I: IntoIterator<Item = LogicValue>>(values: I, dominant: LogicValue) -> LogicValue {
        let mut all_known = true;
        for v in values {
            if v == dominant {
                return dominant;
            }
            all_known &= v.is_known();
        }
        if all_known {
            !dominant
        } else {
            Unknown
        }
    }

    /// N-input And: a known 0 anywhere gives 0, even next to unknown values
    pub fn reduce_and<I: IntoIterator<Item = LogicValue>>(values: I) -> LogicValue {
        Self::reduce(values, Zero)
    }

    /// N-input Or: a known 1 anywhere gives 1, even next to unknown values
    pub fn reduce_or<I: IntoIterator<Item = LogicValue>>(values: I) -> LogicValue {
        Self::reduce(values, One)
    }

    /// N-input Xor; there is no dominant value
    pub fn reduce_xor<I: IntoIterator<Item = LogicValue>>(values: I) -> LogicValue {
        values.into_iter().fold(Zero, |a, b| a ^ b)
    }

    /// Character representation used in pattern files
    pub fn to_char(self) -> char {
        match self {
            Zero => '0',
            One => '1',
            Unknown => 'x',
            HighZ => 'z',
        }
    }

    /// Parse a single character: 0, 1, x or z (case insensitive)
    pub fn from_char(c: char) -> Option<LogicValue> {
        match c {
            '0' => Some(Zero),
            '1' => Some(One),
            'x' | 'X' => Some(Unknown),
            'z' | 'Z' => Some(HighZ),
            _ => None,
        }
    }
}

impl From<bool> for LogicValue {
    fn from(b: bool) -> LogicValue {
        if b {
            One
        } else {
            Zero
        }
    }
}

impl Not for LogicValue {
    type Output = LogicValue;
    fn not(self) -> LogicValue {
        match self {
            Zero => One,
            One => Zero,
            _ => Unknown,
        }
    }
}

impl BitAnd for LogicValue {
    type Output = LogicValue;
    fn bitand(self, rhs: LogicValue) -> LogicValue {
        self.binary(rhs, |a, b| a & b)
    }
}

impl BitOr for LogicValue {
    type Output = LogicValue;
    fn bitor(self, rhs: LogicValue) -> LogicValue {
        self.binary(rhs, |a, b| a | b)
    }
}

impl BitXor for LogicValue {
    type Output = LogicValue;
    fn bitxor(self, rhs: LogicValue) -> LogicValue {
        self.binary(rhs, |a, b| a ^ b)
    }
}

impl FromStr for LogicValue {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next().and_then(LogicValue::from_char), chars.next()) {
            (Some(v), None) => Ok(v),
            _ => Err(format!("Invalid logic value {s}")),
        }
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl fmt::Debug for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetry() {
        for a in LogicValue::ALL {
            for b in LogicValue::ALL {
                assert_eq!(a & b, b & a);
                assert_eq!(a | b, b | a);
                assert_eq!(a ^ b, b ^ a);
                assert_eq!(a.merge(b), b.merge(a));
            }
        }
    }

    #[test]
    fn test_known() {
        for a in [false, true] {
            assert_eq!(!LogicValue::from(a), LogicValue::from(!a));
            for b in [false, true] {
                let (x, y) = (LogicValue::from(a), LogicValue::from(b));
                assert_eq!(x & y, LogicValue::from(a & b));
                assert_eq!(x | y, LogicValue::from(a | b));
                assert_eq!(x ^ y, LogicValue::from(a ^ b));
            }
        }
    }

    #[test]
    fn test_unknown() {
        for a in LogicValue::ALL {
            for b in [Unknown, HighZ] {
                assert_eq!(a & b, Unknown);
                assert_eq!(a | b, Unknown);
                assert_eq!(a ^ b, Unknown);
            }
        }
        assert_eq!(!Unknown, Unknown);
        assert_eq!(!HighZ, Unknown);
    }

    #[test]
    fn test_reduction() {
        assert_eq!(LogicValue::reduce_or([Unknown, One, HighZ]), One);
        assert_eq!(LogicValue::reduce_or([Unknown, Zero]), Unknown);
        assert_eq!(LogicValue::reduce_or([Zero, Zero]), Zero);
        assert_eq!(LogicValue::reduce_and([HighZ, Zero, Unknown]), Zero);
        assert_eq!(LogicValue::reduce_and([One, Unknown]), Unknown);
        assert_eq!(LogicValue::reduce_and([One, One, One]), One);
        assert_eq!(LogicValue::reduce_xor([One, One, One]), One);
        assert_eq!(LogicValue::reduce_xor([One, HighZ]), Unknown);

        // Identities
        assert_eq!(LogicValue::reduce_and([]), One);
        assert_eq!(LogicValue::reduce_or([]), Zero);
        assert_eq!(LogicValue::reduce_xor([]), Zero);
    }

    #[test]
    fn test_merge() {
        assert_eq!(Zero.merge(Zero), Zero);
        assert_eq!(One.merge(One), One);
        assert_eq!(Zero.merge(One), Unknown);
        assert_eq!(HighZ.merge(One), One);
        assert_eq!(Zero.merge(HighZ), Zero);
        assert_eq!(HighZ.merge(HighZ), HighZ);
        assert_eq!(Unknown.merge(HighZ), Unknown);
        assert_eq!(Unknown.merge(One), Unknown);
        for a in LogicValue::ALL {
            assert_eq!(a.merge(a), a);
        }
        assert_eq!(LogicValue::resolve([]), HighZ);
        assert_eq!(LogicValue::resolve([HighZ, One, HighZ]), One);
        assert_eq!(LogicValue::resolve([One, HighZ, Zero]), Unknown);
        assert_eq!(LogicValue::resolve([HighZ, HighZ]), HighZ);
    }

    #[test]
    fn test_merge_associative() {
        for a in LogicValue::ALL {
            assert_eq!(a.merge(HighZ), a);
            for b in LogicValue::ALL {
                assert_eq!(a.merge(b), b.merge(a));
                for c in LogicValue::ALL {
                    assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
                }
            }
        }
        // Unlike the merge, a gate reads an undriven operand as unknown
        assert_eq!(LogicValue::reduce_or([Zero, HighZ]), Unknown);
        assert_eq!(LogicValue::resolve([Zero, HighZ]), Zero);
    }

    #[test]
    fn test_chars() {
        for v in LogicValue::ALL {
            assert_eq!(LogicValue::from_char(v.to_char()), Some(v));
            assert_eq!(format!("{v}").parse::<LogicValue>(), Ok(v));
        }
        assert_eq!(LogicValue::from_char('X'), Some(Unknown));
        assert_eq!(LogicValue::from_char('2'), None);
        assert!("01".parse::<LogicValue>().is_err());
    }
}
