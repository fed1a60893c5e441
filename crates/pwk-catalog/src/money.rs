//! Fixed-point price type.
//!
//! All catalog prices use a 1e-6 (micros) fixed-point representation stored
//! as `i64`. Store fronts hand prices over as decimal strings; they are
//! converted here without floating-point at any stage.
//!
//! `Micros` wraps the raw `i64` so a price cannot be mixed with unrelated
//! integers (period counts, day weights) without an explicit `raw()`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Micros scale (1e-6 of the currency unit).
pub const MICROS_SCALE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Micros newtype
// ---------------------------------------------------------------------------

/// A fixed-point monetary amount at 1e-6 scale.
///
/// There is intentionally no `From<i64>`; use [`Micros::new`] or
/// [`Micros::parse_decimal`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Micros(i64);

impl Micros {
    pub const ZERO: Micros = Micros(0);

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Micros(raw)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Lossy conversion for display and diagnostics only.
    ///
    /// Never feed the result back into comparisons; compare `Micros` values
    /// (or integer cross-products) instead.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / MICROS_SCALE as f64
    }

    /// Parse a non-negative decimal price string (e.g. `"9.99"`).
    ///
    /// Rules:
    /// - optional fractional part separated by `.`, at most 6 digits;
    /// - no sign: catalog prices are never negative;
    /// - surrounding whitespace is ignored.
    pub fn parse_decimal(s: &str) -> Result<Micros, MoneyParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let invalid = || MoneyParseError::Invalid(s.to_string());

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };

        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        if frac_part.len() > 6 {
            return Err(MoneyParseError::TooManyDecimalPlaces(s.to_string()));
        }

        let int_val: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<i64>().map_err(|_| invalid())?
        };

        let mut frac_padded = frac_part.to_string();
        while frac_padded.len() < 6 {
            frac_padded.push('0');
        }
        let frac_val: i64 = frac_padded.parse::<i64>().map_err(|_| invalid())?;

        int_val
            .checked_mul(MICROS_SCALE)
            .and_then(|v| v.checked_add(frac_val))
            .map(Micros)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Micros {
    /// Renders with two decimal places, truncating sub-cent micros.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = MICROS_SCALE.unsigned_abs();
        let whole = abs / scale;
        let cents = (abs % scale) / 10_000;
        write!(f, "{sign}{whole}.{cents:02}")
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    Empty,
    Invalid(String),
    TooManyDecimalPlaces(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::Empty => write!(f, "price is empty"),
            MoneyParseError::Invalid(raw) => write!(f, "price could not be parsed: '{raw}'"),
            MoneyParseError::TooManyDecimalPlaces(raw) => write!(
                f,
                "price has more than 6 decimal places (ambiguous micro conversion): '{raw}'"
            ),
        }
    }
}

impl std::error::Error for MoneyParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_decimal_places() {
        assert_eq!(Micros::parse_decimal("9.99").unwrap(), Micros::new(9_990_000));
        assert_eq!(Micros::parse_decimal(" 39.99 ").unwrap(), Micros::new(39_990_000));
    }

    #[test]
    fn parses_whole_and_leading_dot() {
        assert_eq!(Micros::parse_decimal("4").unwrap(), Micros::new(4_000_000));
        assert_eq!(Micros::parse_decimal(".5").unwrap(), Micros::new(500_000));
    }

    #[test]
    fn rejects_sign_and_garbage() {
        assert!(matches!(
            Micros::parse_decimal("-1.00"),
            Err(MoneyParseError::Invalid(_))
        ));
        assert!(matches!(
            Micros::parse_decimal("1.2.3"),
            Err(MoneyParseError::Invalid(_))
        ));
        assert!(matches!(Micros::parse_decimal("."), Err(MoneyParseError::Invalid(_))));
        assert_eq!(Micros::parse_decimal(""), Err(MoneyParseError::Empty));
    }

    #[test]
    fn rejects_rounding_ambiguity() {
        assert!(matches!(
            Micros::parse_decimal("0.1234567"),
            Err(MoneyParseError::TooManyDecimalPlaces(_))
        ));
    }

    #[test]
    fn display_uses_cents() {
        assert_eq!(Micros::new(9_990_000).to_string(), "9.99");
        assert_eq!(Micros::new(40_000_000).to_string(), "40.00");
        assert_eq!(Micros::new(1_239_999).to_string(), "1.23");
    }

    #[test]
    fn display_keeps_sign_below_one_unit() {
        assert_eq!(Micros::new(-500_000).to_string(), "-0.50");
        assert_eq!(Micros::new(-1_250_000).to_string(), "-1.25");
        assert_eq!(Micros::new(i64::MIN).to_string(), "-9223372036854.77");
    }
}
