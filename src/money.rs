//! Fixed-point monetary type with 2 decimal places precision.
//!
//! Uses `rust_decimal` internally with scale enforcement so that repeated
//! allocation across participants reproduces bit-exact results. Also hosts
//! the rounding and percentage helpers shared by every split strategy.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Round-half-up as used for every monetary rounding in the engine.
const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// A decimal amount that maintains exactly 2 decimal places (minor units).
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use split_engine::Money;
///
/// let amount = Money::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
///
/// let rounded = Money::from_str("0.125").unwrap();
/// assert_eq!(rounded.to_string(), "0.13");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Largest magnitude accepted from input: one quadrillion.
    ///
    /// Keeps every sum over bounded amounts far below the `Decimal` range.
    pub const MAX: Self = Money(Decimal::from_parts(0x5D8A_0000, 0x0163_4578, 0, false, 2));

    /// Creates a new `Money`, rounding half-up to 2 decimal places.
    pub fn new(value: Decimal) -> Self {
        let mut normalized = value.round_dp_with_strategy(Self::SCALE, ROUNDING);
        normalized.rescale(Self::SCALE);
        Money(normalized)
    }

    /// Creates a `Money` only if `value` needs no rounding at scale 2 and
    /// lies within [`Money::MAX`].
    pub fn exact(value: Decimal) -> Option<Self> {
        if value.abs() > Self::MAX.0 {
            return None;
        }
        let money = Money::new(value);
        (money.0 == value).then_some(money)
    }

    /// Returns the underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns `true` if the magnitude does not exceed [`Money::MAX`].
    pub fn in_range(&self) -> bool {
        self.0.abs() <= Self::MAX.0
    }
}

/// Exact (unrounded) value of `total * numerator / denominator`.
///
/// Returns `None` on overflow or a zero denominator.
pub fn portion(total: Money, numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    total.0.checked_mul(numerator)?.checked_div(denominator)
}

/// Share of `total` represented by `amount`, in percent, rounded half-up to
/// 2 decimal places. Zero when `total` is zero.
pub fn percentage_of(amount: Money, total: Money) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    portion(amount, Decimal::ONE_HUNDRED, total.0)
        .map(round_percentage)
        .unwrap_or(Decimal::ZERO)
}

/// Rounds a percentage half-up to 2 decimal places.
pub(crate) fn round_percentage(pct: Decimal) -> Decimal {
    pct.round_dp_with_strategy(Money::SCALE, ROUNDING)
}

/// What is left of `total` after the given allocations.
pub fn remainder<I>(total: Money, allocated: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    total - allocated.into_iter().sum::<Money>()
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let decimal = Decimal::from_str(trimmed)?;
        if decimal > Self::MAX.0 {
            return Err(rust_decimal::Error::ExceedsMaximumPossibleValue);
        }
        if decimal < -Self::MAX.0 {
            return Err(rust_decimal::Error::LessThanMinimumPossibleValue);
        }
        Ok(Money::new(decimal))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money::new(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.0.rescale(Self::SCALE);
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Money::new(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
        self.0.rescale(Self::SCALE);
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:.2}", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_from_str_normalizes_scale() {
        assert_eq!(money("1").to_string(), "1.00");
        assert_eq!(money("1.5").to_string(), "1.50");
        assert_eq!(money("  2.5  ").to_string(), "2.50");
        assert_eq!(money("41.83").to_string(), "41.83");
    }

    #[test]
    fn test_rounds_half_up() {
        assert_eq!(money("0.125").to_string(), "0.13");
        assert_eq!(money("0.124").to_string(), "0.12");
        assert_eq!(money("33.335").to_string(), "33.34");
        assert_eq!(money("-0.125").to_string(), "-0.13");
    }

    #[test]
    fn test_exact_rejects_excess_precision() {
        assert_eq!(Money::exact(dec!(10.5)), Some(money("10.50")));
        assert_eq!(Money::exact(dec!(10.005)), None);
    }

    #[test]
    fn test_input_is_bounded() {
        assert_eq!(Money::MAX.to_string(), "1000000000000000.00");
        assert_eq!(Money::exact(dec!(1000000000000000)), Some(Money::MAX));
        assert_eq!(Money::exact(dec!(1000000000000000.01)), None);
        assert_eq!(Money::exact(dec!(50000000000000000000000000000)), None);
        assert_eq!(Money::exact(dec!(-50000000000000000000000000000)), None);

        assert!(Money::from_str("1000000000000000").is_ok());
        assert!(Money::from_str("50000000000000000000000000000").is_err());
        assert!(Money::from_str("-1000000000000001").is_err());

        assert!(Money::MAX.in_range());
        assert!((-Money::MAX).in_range());
        assert!(!Money::new(dec!(1000000000000000.01)).in_range());
    }

    #[test]
    fn test_sum_of_maximal_amounts_does_not_overflow() {
        let total: Money = std::iter::repeat(Money::MAX).take(1000).sum();
        assert_eq!(total.to_string(), "1000000000000000000.00");
    }

    #[test]
    fn test_arithmetic_preserves_scale() {
        let a = money("1.5");
        let b = money("2.5");

        assert_eq!((a + b).to_string(), "4.00");
        assert_eq!((b - a).to_string(), "1.00");
        assert_eq!((a - b).to_string(), "-1.00");
        assert_eq!((-a).to_string(), "-1.50");
    }

    #[test]
    fn test_sum_and_remainder() {
        let parts = [money("33.33"), money("33.33")];
        let total: Money = parts.iter().sum();
        assert_eq!(total, money("66.66"));
        assert_eq!(remainder(money("100"), parts), money("33.34"));
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(money("33.33"), money("100")), dec!(33.33));
        assert_eq!(percentage_of(money("1"), money("3")), dec!(33.33));
        assert_eq!(percentage_of(money("2"), money("3")), dec!(66.67));
        assert_eq!(percentage_of(money("5"), Money::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_portion() {
        assert_eq!(
            portion(money("200"), dec!(60), dec!(100)),
            Some(dec!(120))
        );
        assert_eq!(portion(money("200"), dec!(1), Decimal::ZERO), None);
    }

    #[test]
    fn test_zero_constant() {
        assert!(Money::ZERO.is_zero());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
    }
}
