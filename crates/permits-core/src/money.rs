//! # Fee Amounts
//!
//! Permit fees are decimals with two fraction digits (KES). Floats are
//! never used: [`Fee`] stores integer minor units (cents) and serializes as
//! a decimal string such as `"2500.00"`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A non-negative fee in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fee(i64);

impl Fee {
    /// Zero fee.
    pub const ZERO: Fee = Fee(0);

    /// From minor units (cents). Negative amounts are rejected.
    pub fn from_minor_units(cents: i64) -> Result<Self, ValidationError> {
        if cents < 0 {
            return Err(ValidationError::InvalidAmount(cents.to_string()));
        }
        Ok(Self(cents))
    }

    /// From whole currency units.
    pub fn from_major_units(units: u32) -> Self {
        Self(i64::from(units) * 100)
    }

    /// Parse a decimal string with at most two fraction digits.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits(whole) || !digits(frac) || frac.len() > 2 {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Minor units (cents).
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Plain decimal rendering, e.g. `2500.00`.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }

    /// Display rendering with currency and thousands separators,
    /// e.g. `KES 2,500.00`.
    pub fn to_display_string(&self) -> String {
        let whole = (self.0 / 100).to_string();
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("KES {grouped}.{:02}", self.0 % 100)
    }
}

impl std::fmt::Display for Fee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Serialize for Fee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

/// Accepts a decimal string (`"2500.00"`) or a whole number of major
/// units (`2500`). Floating-point input is refused.
impl<'de> Deserialize<'de> for Fee {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeeVisitor;

        impl serde::de::Visitor<'_> for FeeVisitor {
            type Value = Fee;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a decimal string or a whole number of major units")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Fee, E> {
                Fee::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Fee, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(|units| units.checked_mul(100))
                    .map(Fee)
                    .ok_or_else(|| E::custom(ValidationError::InvalidAmount(v.to_string())))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Fee, E> {
                v.checked_mul(100)
                    .ok_or_else(|| E::custom(ValidationError::InvalidAmount(v.to_string())))
                    .and_then(|cents| Fee::from_minor_units(cents).map_err(E::custom))
            }
        }

        deserializer.deserialize_any(FeeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!(Fee::parse("2500").unwrap().minor_units(), 250_000);
        assert_eq!(Fee::parse("2500.5").unwrap().minor_units(), 250_050);
        assert_eq!(Fee::parse("2500.05").unwrap().minor_units(), 250_005);
        assert_eq!(Fee::parse("0.00").unwrap(), Fee::ZERO);
    }

    #[test]
    fn parse_rejects_bad_amounts() {
        for bad in ["", "-1", "1.234", "abc", ".50", "1,000", "1e3"] {
            assert!(Fee::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn negative_minor_units_rejected() {
        assert!(Fee::from_minor_units(-5).is_err());
        assert_eq!(Fee::from_minor_units(5).unwrap().minor_units(), 5);
    }

    #[test]
    fn renders_decimal_and_display_forms() {
        let fee = Fee::from_major_units(2500);
        assert_eq!(fee.to_string(), "2500.00");
        assert_eq!(fee.to_display_string(), "KES 2,500.00");
        assert_eq!(Fee::from_major_units(10000).to_display_string(), "KES 10,000.00");
        assert_eq!(Fee::from_major_units(999).to_display_string(), "KES 999.00");
        assert_eq!(Fee::from_major_units(1_000_000).to_display_string(), "KES 1,000,000.00");
    }

    #[test]
    fn serializes_as_string() {
        let fee = Fee::from_major_units(7500);
        assert_eq!(serde_json::to_string(&fee).unwrap(), "\"7500.00\"");
        let back: Fee = serde_json::from_str("\"7500.00\"").unwrap();
        assert_eq!(back, fee);
    }

    #[test]
    fn deserializes_whole_numbers_but_not_floats() {
        let fee: Fee = serde_json::from_str("2500").unwrap();
        assert_eq!(fee, Fee::from_major_units(2500));
        assert!(serde_json::from_str::<Fee>("-5").is_err());
        assert!(serde_json::from_str::<Fee>("2500.5").is_err());
    }
}
