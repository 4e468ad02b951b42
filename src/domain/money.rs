// ==========================================
// Billing Import Engine - Money Arithmetic
// ==========================================
// Fixed-point integer cents internally; two-decimal
// display only at the boundary. No binary floating
// point in any aggregation path.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// Amount in integer cents of the billing currency.
///
/// Construction happens through `from_cents`, `parse` (locale-tolerant
/// text) or `from_f64_lossy` (spreadsheet numeric cells). All arithmetic
/// is checked; overflow surfaces as `None` instead of wrapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Convert a numeric spreadsheet cell. Rounds to the nearest cent;
    /// non-finite input is rejected.
    pub fn from_f64_lossy(value: f64) -> Result<Money, MoneyParseError> {
        if !value.is_finite() {
            return Err(MoneyParseError::NotFinite);
        }
        let cents = (value * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return Err(MoneyParseError::OutOfRange);
        }
        Ok(Money(cents as i64))
    }

    /// Locale-tolerant text parsing.
    ///
    /// Strips everything except digits, sign and separators, then decides
    /// which separator is decimal:
    /// - both present: the rightmost one is the decimal separator
    ///   ("1.234,56" and "1,234.56" are both accepted)
    /// - one present exactly once with 1-2 trailing digits: decimal
    /// - otherwise: thousands separator ("1,234" is 1234.00)
    pub fn parse(raw: &str) -> Result<Money, MoneyParseError> {
        let filtered: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | ','))
            .collect();

        if filtered.is_empty() || !filtered.chars().any(|c| c.is_ascii_digit()) {
            return Err(MoneyParseError::Empty);
        }

        let (negative, body) = match filtered.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, filtered.strip_prefix('+').unwrap_or(&filtered)),
        };
        // Sign characters anywhere else are malformed input.
        if body.contains('-') || body.contains('+') {
            return Err(MoneyParseError::Malformed(raw.trim().to_string()));
        }

        let last_dot = body.rfind('.');
        let last_comma = body.rfind(',');
        let decimal_sep = match (last_dot, last_comma) {
            (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
            (Some(_), None) => Self::single_separator_role(raw, body, '.')?,
            (None, Some(_)) => Self::single_separator_role(raw, body, ',')?,
            (None, None) => None,
        };

        let (int_text, frac_text): (String, String) = match decimal_sep {
            Some(sep) => {
                let idx = body.rfind(sep).unwrap_or(body.len());
                let (head, tail) = body.split_at(idx);
                (
                    head.chars().filter(|c| c.is_ascii_digit()).collect(),
                    tail[sep.len_utf8()..]
                        .chars()
                        .filter(|c| c.is_ascii_digit())
                        .collect(),
                )
            }
            None => (body.chars().filter(|c| c.is_ascii_digit()).collect(), String::new()),
        };

        if frac_text.len() > 2 {
            return Err(MoneyParseError::Malformed(raw.trim().to_string()));
        }

        let int_part: i64 = if int_text.is_empty() {
            0
        } else {
            int_text
                .parse()
                .map_err(|_| MoneyParseError::OutOfRange)?
        };
        let frac_part: i64 = match frac_text.len() {
            0 => 0,
            1 => frac_text.parse::<i64>().map_err(|_| MoneyParseError::OutOfRange)? * 10,
            _ => frac_text.parse().map_err(|_| MoneyParseError::OutOfRange)?,
        };

        let mut cents = int_part
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_part))
            .ok_or(MoneyParseError::OutOfRange)?;
        if negative {
            cents = -cents;
        }
        Ok(Money(cents))
    }

    // A lone separator is decimal only when followed by 0-2 digits;
    // exactly 3 trailing digits ("1,234") is a thousands group, and
    // anything longer is malformed. Repeated separators are thousands
    // grouping ("1,234,567").
    fn single_separator_role(
        raw: &str,
        body: &str,
        sep: char,
    ) -> Result<Option<char>, MoneyParseError> {
        if body.matches(sep).count() != 1 {
            return Ok(None);
        }
        let tail_len = body.len() - body.rfind(sep).unwrap_or(0) - sep.len_utf8();
        match tail_len {
            0..=2 => Ok(Some(sep)),
            3 => Ok(None),
            _ => Err(MoneyParseError::Malformed(raw.trim().to_string())),
        }
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| {
            acc.checked_add(m).unwrap_or(Money(i64::MAX))
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Money parsing failure causes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("empty or non-numeric value")]
    Empty,
    #[error("malformed amount: {0}")]
    Malformed(String),
    #[error("amount is not a finite number")]
    NotFinite,
    #[error("amount out of representable range")]
    OutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_decimal() {
        assert_eq!(Money::parse("100").unwrap().cents(), 10_000);
        assert_eq!(Money::parse("100.5").unwrap().cents(), 10_050);
        assert_eq!(Money::parse("100.50").unwrap().cents(), 10_050);
    }

    #[test]
    fn test_parse_locale_variants() {
        // European style: dot thousands, comma decimal
        assert_eq!(Money::parse("1.234,56").unwrap().cents(), 123_456);
        // US style: comma thousands, dot decimal
        assert_eq!(Money::parse("1,234.56").unwrap().cents(), 123_456);
        // Lone comma with 3 trailing digits is a thousands group
        assert_eq!(Money::parse("1,234").unwrap().cents(), 123_400);
        // Lone comma with 2 trailing digits is decimal
        assert_eq!(Money::parse("12,34").unwrap().cents(), 1_234);
    }

    #[test]
    fn test_parse_strips_currency_noise() {
        assert_eq!(Money::parse("$ 1,234.56").unwrap().cents(), 123_456);
        assert_eq!(Money::parse("ARS 100.00").unwrap().cents(), 10_000);
    }

    #[test]
    fn test_parse_signs() {
        assert_eq!(Money::parse("-10.00").unwrap().cents(), -1_000);
        assert_eq!(Money::parse("+10.00").unwrap().cents(), 1_000);
        assert!(Money::parse("10-0").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("").is_err());
        assert!(Money::parse("   ").is_err());
        assert!(Money::parse("1.2345").is_err()); // 4 decimal digits
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        assert!(Money::from_f64_lossy(f64::NAN).is_err());
        assert!(Money::from_f64_lossy(f64::INFINITY).is_err());
        assert_eq!(Money::from_f64_lossy(12.345).unwrap().cents(), 1_235);
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_cents(123_456).to_string(), "1234.56");
        assert_eq!(Money::from_cents(-50).to_string(), "-0.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_sum_order_independent() {
        let amounts = vec![
            Money::from_cents(10_001),
            Money::from_cents(333),
            Money::from_cents(99_999),
        ];
        let forward: Money = amounts.iter().copied().sum();
        let backward: Money = amounts.iter().rev().copied().sum();
        assert_eq!(forward, backward);
        assert_eq!(forward.cents(), 110_333);
    }
}
