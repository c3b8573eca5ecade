use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError};

/// Signed money amount represented as integer **minor units**.
///
/// Use this type for **all** monetary values in the engine (prices, invoice
/// totals, payment amounts) to avoid floating-point drift. The number of
/// minor units per major unit depends on the [`Currency`] (2 for EUR/USD,
/// 0 for IDR); the engine never stores fractions of a minor unit.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.format(Currency::Eur), "12.34 EUR");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

/// Basis points per whole (100%).
const BPS_SCALE: i64 = 10_000;

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Checked multiplication by a unit count (quantity × unit price).
    #[must_use]
    pub fn checked_mul(self, rhs: i64) -> Option<Money> {
        self.0.checked_mul(rhs).map(Money)
    }

    /// Applies a rate expressed in basis points (1% = 100 bps), rounding
    /// half-up at minor-unit precision.
    ///
    /// The intermediate product is computed in `i128`, so any representable
    /// amount combined with a valid rate (`0..=10_000` bps) cannot overflow.
    pub fn apply_bps(self, bps: i64) -> Result<Money, EngineError> {
        if !(0..=BPS_SCALE).contains(&bps) {
            return Err(EngineError::InvalidAmount(format!(
                "rate must be between 0 and {BPS_SCALE} bps, got {bps}"
            )));
        }
        if self.0 < 0 {
            return Err(EngineError::InvalidAmount(
                "cannot apply a rate to a negative amount".to_string(),
            ));
        }

        let product = i128::from(self.0) * i128::from(bps);
        let rounded = (product + i128::from(BPS_SCALE) / 2) / i128::from(BPS_SCALE);
        i64::try_from(rounded)
            .map(Money)
            .map_err(|_| EngineError::InvalidAmount("amount too large".to_string()))
    }

    /// Formats the amount with the currency's fraction digits and code,
    /// e.g. `12.34 EUR` or `15000 IDR`.
    #[must_use]
    pub fn format(self, currency: Currency) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        match currency.minor_units() {
            0 => format!("{sign}{abs} {}", currency.code()),
            digits => {
                let scale = 10u64.pow(u32::from(digits));
                let major = abs / scale;
                let frac = abs % scale;
                format!(
                    "{sign}{major}.{frac:0width$} {}",
                    currency.code(),
                    width = usize::from(digits)
                )
            }
        }
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_honors_minor_units() {
        assert_eq!(Money::new(0).format(Currency::Eur), "0.00 EUR");
        assert_eq!(Money::new(1).format(Currency::Eur), "0.01 EUR");
        assert_eq!(Money::new(1050).format(Currency::Usd), "10.50 USD");
        assert_eq!(Money::new(-1050).format(Currency::Eur), "-10.50 EUR");
        assert_eq!(Money::new(15000).format(Currency::Idr), "15000 IDR");
    }

    #[test]
    fn apply_bps_rounds_half_up() {
        // 7.7% of 10.00 = 0.77
        assert_eq!(Money::new(1000).apply_bps(770).unwrap(), Money::new(77));
        // 21% of 0.10 = 0.021 -> 0.02
        assert_eq!(Money::new(10).apply_bps(2100).unwrap(), Money::new(2));
        // 25% of 0.10 = 0.025 -> 0.03 (half-up)
        assert_eq!(Money::new(10).apply_bps(2500).unwrap(), Money::new(3));
        assert_eq!(Money::new(1000).apply_bps(0).unwrap(), Money::ZERO);
        assert_eq!(
            Money::new(1000).apply_bps(BPS_SCALE).unwrap(),
            Money::new(1000)
        );
    }

    #[test]
    fn apply_bps_rejects_out_of_range_rates() {
        assert!(Money::new(1000).apply_bps(-1).is_err());
        assert!(Money::new(1000).apply_bps(BPS_SCALE + 1).is_err());
        assert!(Money::new(-1).apply_bps(100).is_err());
    }
}
