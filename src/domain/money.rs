//! Monetary amounts with two decimal places, backed by `rust_decimal`.
//!
//! Inputs carry at most two fractional digits. Derived figures such as the
//! average exit price are rounded half away from zero to the cent.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

/// Decimal places kept by every stored or derived amount.
pub const SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount {input:?}: {reason}")]
pub struct MoneyParseError {
    pub input: String,
    pub reason: &'static str,
}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, SCALE))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Amount times a quantity, rounded to the cent. `None` on overflow.
    pub fn checked_mul_qty(self, quantity: i64) -> Option<Money> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(|v| Money(round_cents(v)))
    }

    /// Quantity-weighted mean of `(price, quantity)` pairs.
    ///
    /// Returns `None` when the total quantity is not positive or the sums
    /// overflow. The quotient is rounded half away from zero to the cent.
    pub fn weighted_mean<I>(pairs: I) -> Option<Money>
    where
        I: IntoIterator<Item = (Money, i64)>,
    {
        let mut value = Decimal::ZERO;
        let mut quantity = Decimal::ZERO;
        for (price, qty) in pairs {
            let qty = Decimal::from(qty);
            value = value.checked_add(price.0.checked_mul(qty)?)?;
            quantity = quantity.checked_add(qty)?;
        }
        if quantity <= Decimal::ZERO {
            return None;
        }
        value.checked_div(quantity).map(|v| Money(round_cents(v)))
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(round_cents(value))
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    /// Parses a decimal amount with at most two fractional digits,
    /// e.g. `"12"`, `"12.5"`, `"-3.07"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| MoneyParseError {
            input: s.to_string(),
            reason,
        };
        let trimmed = s.trim();
        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if !unsigned
            .strip_prefix('-')
            .unwrap_or(unsigned)
            .chars()
            .any(|c| c.is_ascii_digit())
        {
            return Err(err("no digits"));
        }
        if !unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
        {
            return Err(err("not a decimal number"));
        }
        let normalized = match unsigned.strip_prefix('-') {
            Some(rest) if rest.starts_with('.') => format!("-0{rest}"),
            None if unsigned.starts_with('.') => format!("0{unsigned}"),
            _ => unsigned.to_string(),
        };
        let value = Decimal::from_str(&normalized).map_err(|_| err("not a decimal number"))?;
        if value.scale() > SCALE {
            return Err(err("more than two fractional digits"));
        }
        Ok(Money(value))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = round_cents(self.0);
        let value = if rounded.is_zero() {
            Decimal::ZERO
        } else {
            rounded
        };
        write!(f, "{:.2}", value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
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

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
