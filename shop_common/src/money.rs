use std::{fmt::Display, iter::Sum, ops::Mul, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of minor units (cents, paise) in one major currency unit.
pub const MINOR_UNITS: i64 = 100;

//--------------------------------------       Money        ---------------------------------------------------------
/// A monetary amount, stored as an integer number of minor units.
///
/// All arithmetic is exact. Wherever a fraction has to be taken (percentage discounts, apportioning a coupon across
/// order lines), the result is rounded half away from zero to the nearest minor unit, which is the same as rounding
/// the major-unit value to two decimal places.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, v| acc + v)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// The amount in minor units
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative amounts to zero.
    pub fn floor_zero(self) -> Self {
        Self(self.0.max(0))
    }

    /// `self * percent / 100`, rounded to the nearest minor unit.
    pub fn percent(&self, percent: i64) -> Self {
        self.scale(percent, 100)
    }

    /// `self * numerator / denominator`, rounded half away from zero. A zero denominator yields zero.
    pub fn scale(&self, numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::ZERO;
        }
        let n = i128::from(self.0) * i128::from(numerator);
        let d = i128::from(denominator);
        let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
        let rounded = if n >= 0 { (n + d / 2) / d } else { -((-n + d / 2) / d) };
        #[allow(clippy::cast_possible_truncation)]
        Self(rounded as i64)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / MINOR_UNITS.unsigned_abs();
        let cents = abs % MINOR_UNITS.unsigned_abs();
        write!(f, "{sign}{units}.{cents:02}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

/// Parses decimal strings such as `"1000"`, `"12.5"` or `"0.99"`. At most two decimal places are accepted.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (units, cents) = match digits.split_once('.') {
            Some((u, c)) => (u, c),
            None => (digits, ""),
        };
        if units.is_empty() || cents.len() > 2 || !units.chars().chain(cents.chars()).all(|c| c.is_ascii_digit()) {
            return Err(MoneyConversionError(s.to_string()));
        }
        let units = units.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        let cents = match cents.len() {
            0 => 0,
            1 => cents.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))? * 10,
            _ => cents.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?,
        };
        let value = units
            .checked_mul(MINOR_UNITS)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(|| MoneyConversionError(format!("{s} is too large")))?;
        Ok(Self(if negative { -value } else { value }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Money::from(123_456).to_string(), "1234.56");
        assert_eq!(Money::from(5).to_string(), "0.05");
        assert_eq!(Money::from(-250).to_string(), "-2.50");
        assert_eq!(Money::from_major(4000).to_string(), "4000.00");
    }

    #[test]
    fn parse() {
        assert_eq!("1000".parse::<Money>().unwrap(), Money::from_major(1000));
        assert_eq!("12.5".parse::<Money>().unwrap(), Money::from(1250));
        assert_eq!("0.99".parse::<Money>().unwrap(), Money::from(99));
        assert_eq!("-3.10".parse::<Money>().unwrap(), Money::from(-310));
        assert!("1.234".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".5".parse::<Money>().is_err());
    }

    #[test]
    fn percentages_round_half_away_from_zero() {
        assert_eq!(Money::from_major(100).percent(20), Money::from_major(20));
        // 3.33 * 15% = 0.4995 -> 0.50
        assert_eq!(Money::from(333).percent(15), Money::from(50));
        // 0.01 * 50% = 0.005 -> 0.01
        assert_eq!(Money::from(1).percent(50), Money::from(1));
        assert_eq!(Money::from(-1).percent(50), Money::from(-1));
    }

    #[test]
    fn scale() {
        assert_eq!(Money::from(1000).scale(1, 3), Money::from(333));
        assert_eq!(Money::from(1000).scale(2, 3), Money::from(667));
        assert_eq!(Money::from(1000).scale(1, 0), Money::ZERO);
    }

    #[test]
    fn arithmetic() {
        let mut a = Money::from_major(10);
        a += Money::from(50);
        assert_eq!(a, Money::from(1050));
        a -= Money::from_major(20);
        assert!(a.is_negative());
        assert_eq!(a.floor_zero(), Money::ZERO);
        assert_eq!(Money::from(250) * 3, Money::from(750));
        let total: Money = vec![Money::from(1), Money::from(2), Money::from(3)].into_iter().sum();
        assert_eq!(total, Money::from(6));
        assert_eq!(-Money::from(5), Money::from(-5));
    }

    #[test]
    fn serializes_as_minor_units() {
        let json = serde_json::to_string(&Money::from(1999)).unwrap();
        assert_eq!(json, "1999");
        let m: Money = serde_json::from_str("250").unwrap();
        assert_eq!(m, Money::from(250));
    }
}
