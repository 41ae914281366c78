//! Alert threshold value
//!
//! A threshold is a strictly positive people count. Anything else is
//! rejected here, before it can reach the state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use thiserror::Error;

/// Maximum tolerable people count before alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Threshold(NonZeroU32);

impl Threshold {
    pub const DEFAULT: u32 = 5;

    pub fn new(value: u32) -> Result<Self, ThresholdError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(ThresholdError::NotPositive(0))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Whether `count` is above this threshold
    pub fn is_exceeded_by(self, count: u32) -> bool {
        count > self.get()
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(NonZeroU32::new(Self::DEFAULT).unwrap_or(NonZeroU32::MIN))
    }
}

impl FromStr for Threshold {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| ThresholdError::NotNumeric(trimmed.to_string()))?;

        if value <= 0 {
            return Err(ThresholdError::NotPositive(value));
        }

        u32::try_from(value)
            .map_err(|_| ThresholdError::TooLarge(value))
            .and_then(Self::new)
    }
}

impl TryFrom<u32> for Threshold {
    type Error = ThresholdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for u32 {
    fn from(t: Threshold) -> Self {
        t.get()
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejected threshold input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("Threshold must be a whole number, got {0:?}")]
    NotNumeric(String),

    #[error("Threshold must be greater than 0, got {0}")]
    NotPositive(i64),

    #[error("Threshold {0} is out of range")]
    TooLarge(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_five() {
        assert_eq!(Threshold::default().get(), 5);
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!("7".parse::<Threshold>().unwrap().get(), 7);
        assert_eq!("  12 \n".parse::<Threshold>().unwrap().get(), 12);
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert_eq!("0".parse::<Threshold>(), Err(ThresholdError::NotPositive(0)));
        assert_eq!("-3".parse::<Threshold>(), Err(ThresholdError::NotPositive(-3)));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!("".parse::<Threshold>(), Err(ThresholdError::NotNumeric(_))));
        assert!(matches!("ten".parse::<Threshold>(), Err(ThresholdError::NotNumeric(_))));
        assert!(matches!("4.5".parse::<Threshold>(), Err(ThresholdError::NotNumeric(_))));
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(matches!(
            "99999999999".parse::<Threshold>(),
            Err(ThresholdError::TooLarge(_))
        ));
    }

    #[test]
    fn test_exceeded_is_strict() {
        let t = Threshold::new(5).unwrap();
        assert!(!t.is_exceeded_by(4));
        assert!(!t.is_exceeded_by(5));
        assert!(t.is_exceeded_by(6));
    }

    #[test]
    fn test_serde_rejects_zero() {
        assert!(serde_json::from_str::<Threshold>("0").is_err());
        assert_eq!(serde_json::from_str::<Threshold>("9").unwrap().get(), 9);
        assert_eq!(serde_json::to_string(&Threshold::default()).unwrap(), "5");
    }
}
