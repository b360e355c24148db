//! Integer-cent currency amounts.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

const CENTS_PER_UNIT: i64 = 100;

/// A currency amount in minor units.
///
/// Prices, subtotals and receipt totals all flow through this type; the JSON
/// form is the bare cent count. Arithmetic saturates at the `i64` bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Whole currency units, e.g. `from_dollars(10)` is 1000 cents.
    pub fn from_dollars(dollars: i64) -> Self {
        Self::from_cents(dollars.saturating_mul(CENTS_PER_UNIT))
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Line subtotal: unit price times quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Self::from_cents(self.cents.saturating_mul(i64::from(quantity)))
    }

    /// Even share across `count` parts, leftover cents dropped.
    ///
    /// Zero when `count` is zero.
    pub fn split(&self, count: u64) -> Money {
        match i64::try_from(count) {
            Ok(n) if n > 0 => Self::from_cents(self.cents / n),
            _ => Self::zero(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let magnitude = self.cents.unsigned_abs();
        let per_unit = CENTS_PER_UNIT.unsigned_abs();
        write!(f, "{sign}${}.{:02}", magnitude / per_unit, magnitude % per_unit)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_cents(self.cents.saturating_add(rhs.cents))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}
