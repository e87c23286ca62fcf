//! Listing attribute types.

use serde::{Deserialize, Serialize};

/// Error returned when a condition label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid condition: {0}")]
pub struct ConditionError(pub String);

/// Condition of a listed car, as shown to buyers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarCondition {
    #[serde(rename = "Certified Pre-Owned")]
    CertifiedPreOwned,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl CarCondition {
    /// All conditions, best first.
    pub const ALL: [Self; 5] = [
        Self::CertifiedPreOwned,
        Self::Excellent,
        Self::Good,
        Self::Fair,
        Self::Poor,
    ];

    /// Display label, also the persisted form.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CertifiedPreOwned => "Certified Pre-Owned",
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for CarCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for CarCondition {
    type Err = ConditionError;

    /// Parses the display label, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConditionError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(
            "certified pre-owned".parse::<CarCondition>().unwrap(),
            CarCondition::CertifiedPreOwned
        );
        assert_eq!(" Good ".parse::<CarCondition>().unwrap(), CarCondition::Good);
        assert!("Mint".parse::<CarCondition>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&CarCondition::CertifiedPreOwned).unwrap();
        assert_eq!(json, "\"Certified Pre-Owned\"");
        let parsed: CarCondition = serde_json::from_str("\"Fair\"").unwrap();
        assert_eq!(parsed, CarCondition::Fair);
    }
}
