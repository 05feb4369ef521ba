//! Secondary plausibility checks for structurally matched candidates.
//!
//! A validator is a necessary gate: a candidate that fails it is dropped,
//! never downgraded.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::RuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// Payment-card checksum.
    Luhn,
    /// National-ID area/group/serial plausibility.
    NationalId,
    /// Dotted quad with every octet in range.
    Ipv4,
}

impl Validator {
    pub fn check(self, candidate: &str) -> bool {
        match self {
            Self::Luhn => luhn_valid(candidate),
            Self::NationalId => national_id_valid(candidate),
            Self::Ipv4 => ipv4_valid(candidate),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Luhn => "luhn",
            Self::NationalId => "national_id",
            Self::Ipv4 => "ipv4",
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Validator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "luhn" | "payment_card" => Ok(Self::Luhn),
            "national_id" | "ssn" => Ok(Self::NationalId),
            "ipv4" => Ok(Self::Ipv4),
            _ => Err(RuleError::UnknownValidator(s.to_string())),
        }
    }
}

/// Luhn checksum over a 13–19 digit number; separators are ignored.
pub fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()
        .unwrap_or_default();

    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Area must not be 000, 666 or 900–999; group and serial must be nonzero.
pub fn national_id_valid(candidate: &str) -> bool {
    let digits: String = candidate.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 9 {
        return false;
    }

    let (area, rest) = digits.split_at(3);
    let (group, serial) = rest.split_at(2);

    if area == "000" || area == "666" || area.starts_with('9') {
        return false;
    }

    group != "00" && serial != "0000"
}

pub fn ipv4_valid(candidate: &str) -> bool {
    let octets: Vec<&str> = candidate.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| !o.is_empty() && o.len() <= 3 && o.parse::<u16>().is_ok_and(|v| v <= 255))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luhn_accepts_known_test_cards() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("4111-1111-1111-1111"));
        assert!(luhn_valid("5500 0000 0000 0004"));
        assert!(luhn_valid("378282246310005"));
    }

    #[test]
    fn luhn_rejects_broken_checksum() {
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("1234567890123456"));
    }

    #[test]
    fn luhn_enforces_length_window() {
        // Valid checksum, but too short to be a card.
        assert!(!luhn_valid("18"));
        assert!(!luhn_valid("000000000000"));
        assert!(!luhn_valid("00000000000000000000"));
    }

    #[test]
    fn luhn_rejects_foreign_characters() {
        assert!(!luhn_valid("4111x111111111111"));
    }

    #[test]
    fn national_id_plausibility() {
        assert!(national_id_valid("123-45-6789"));
        assert!(national_id_valid("078 05 1120"));

        assert!(!national_id_valid("000-45-6789"));
        assert!(!national_id_valid("666-45-6789"));
        assert!(!national_id_valid("900-45-6789"));
        assert!(!national_id_valid("123-00-6789"));
        assert!(!national_id_valid("123-45-0000"));
        assert!(!national_id_valid("123-45-678"));
    }

    #[test]
    fn ipv4_octet_ranges() {
        assert!(ipv4_valid("10.0.0.1"));
        assert!(ipv4_valid("192.168.255.255"));
        assert!(!ipv4_valid("10.0.0.256"));
        assert!(!ipv4_valid("10.0.0"));
        assert!(!ipv4_valid("10..0.1"));
    }

    #[test]
    fn validator_names_round_trip_through_from_str() {
        for v in [Validator::Luhn, Validator::NationalId, Validator::Ipv4] {
            assert_eq!(v.as_str().parse::<Validator>().unwrap(), v);
        }
        assert_eq!(
            "crc32".parse::<Validator>(),
            Err(RuleError::UnknownValidator("crc32".into()))
        );
    }
}
