use std::{fmt, iter::Sum, ops::Add, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Non-negative money amount represented as **integer cents**.
///
/// Receipt amounts are always stored in minor units so totals never suffer
/// from floating-point drift.
///
/// # Examples
///
/// ```rust
/// use engine::AmountCents;
///
/// let amount = AmountCents::try_new(12_34).unwrap();
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12,34 €");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// signs and more than 2 decimals):
///
/// ```rust
/// use engine::AmountCents;
///
/// assert_eq!("10".parse::<AmountCents>().unwrap().cents(), 1000);
/// assert_eq!("12,34".parse::<AmountCents>().unwrap().cents(), 1234);
/// assert!("-1".parse::<AmountCents>().is_err());
/// assert!("12.345".parse::<AmountCents>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
#[repr(transparent)]
pub struct AmountCents(i64);

impl AmountCents {
    pub const ZERO: AmountCents = AmountCents(0);

    /// Largest accepted amount: one billion major units.
    ///
    /// Totals over tens of millions of maximal receipts still fit in `i64`.
    pub const MAX: AmountCents = AmountCents(100_000_000_000);

    /// Creates a new amount from integer cents, rejecting negative values and
    /// values above [`AmountCents::MAX`].
    pub fn try_new(cents: i64) -> Result<Self, EngineError> {
        if cents < 0 {
            return Err(EngineError::InvalidAmount(
                "amount must not be negative".to_string(),
            ));
        }
        if cents > Self::MAX.0 {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        Ok(Self(cents))
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: AmountCents) -> Option<AmountCents> {
        self.0.checked_add(rhs.0).map(AmountCents)
    }

    /// Major units with a dot separator, e.g. `"12.34"`.
    #[must_use]
    pub fn to_major_string(self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for AmountCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{:02} €", self.0 / 100, self.0 % 100)
    }
}

impl TryFrom<i64> for AmountCents {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<AmountCents> for i64 {
    fn from(value: AmountCents) -> Self {
        value.0
    }
}

impl Add for AmountCents {
    type Output = AmountCents;

    /// Saturates at `i64::MAX`; see [`AmountCents::checked_add`].
    fn add(self, rhs: AmountCents) -> Self::Output {
        AmountCents(self.0.saturating_add(rhs.0))
    }
}

impl Sum for AmountCents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(AmountCents::ZERO, Add::add)
    }
}

impl FromStr for AmountCents {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects signs, empty and non-numeric strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }
        if trimmed.starts_with('-') {
            return Err(EngineError::InvalidAmount(
                "amount must not be negative".to_string(),
            ));
        }

        let normalized = trimmed.replace(',', ".");
        let mut parts = normalized.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let cents_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| overflow())?;

        let cents: i64 = match cents_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        Self::try_new(total)
    }
}
