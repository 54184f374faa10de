//! Factor identity: symbol, direction and parameters.

use crate::error::{FactorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Market date used throughout the pipeline.
pub type Date = chrono::NaiveDate;

/// A cross-section of factor values keyed by security identifier.
///
/// `None` marks a missing value. Infinities never appear here; they are
/// mapped to missing before a cross-section leaves the pipeline.
pub type CrossSection = BTreeMap<String, Option<f64>>;

/// Free-form factor parameters.
pub type Params = BTreeMap<String, serde_json::Value>;

/// Direction of a factor signal.
///
/// A long factor rewards high raw values, a short factor rewards low ones.
/// Standardization multiplies z-scores by the direction so that higher
/// always means better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Higher raw values are better (+1).
    Long,
    /// Lower raw values are better (-1).
    Short,
}

impl Direction {
    /// Signed multiplier for this direction.
    pub const fn as_f64(&self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = FactorError;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            1 => Ok(Self::Long),
            -1 => Ok(Self::Short),
            other => Err(FactorError::Validation(format!(
                "direction must be 1 or -1, got {}",
                other
            ))),
        }
    }
}

/// Identity of a factor: symbol, direction and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSpec {
    symbol: String,
    direction: Direction,
    params: Params,
}

impl FactorSpec {
    /// Create a factor spec.
    ///
    /// # Errors
    ///
    /// Fails with [`FactorError::Validation`] when the symbol is empty
    /// after trimming.
    pub fn new(symbol: impl Into<String>, direction: Direction) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(FactorError::Validation(
                "factor symbol must be a non-empty string".to_string(),
            ));
        }
        Ok(Self {
            symbol,
            direction,
            params: Params::new(),
        })
    }

    /// Attach parameters to the spec.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set a single parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Factor symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Factor direction.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Factor parameters.
    pub const fn params(&self) -> &Params {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_spec() {
        let spec = FactorSpec::new("EP", Direction::Long).unwrap();
        assert_eq!(spec.symbol(), "EP");
        assert_eq!(spec.direction(), Direction::Long);
        assert!(spec.params().is_empty());
    }

    #[test]
    fn test_empty_symbol_rejected() {
        assert!(FactorSpec::new("", Direction::Long).is_err());
        assert!(FactorSpec::new("   ", Direction::Short).is_err());
    }

    #[rstest]
    #[case(1, Some(Direction::Long))]
    #[case(-1, Some(Direction::Short))]
    #[case(0, None)]
    #[case(2, None)]
    #[case(i8::MIN, None)]
    fn test_direction_from_int(#[case] raw: i8, #[case] expected: Option<Direction>) {
        match expected {
            Some(dir) => assert_eq!(Direction::try_from(raw).unwrap(), dir),
            None => assert!(Direction::try_from(raw).is_err()),
        }
    }

    #[test]
    fn test_direction_multiplier() {
        assert_eq!(Direction::Long.as_f64(), 1.0);
        assert_eq!(Direction::Short.as_f64(), -1.0);
    }

    #[test]
    fn test_params() {
        let spec = FactorSpec::new("rv_dir", Direction::Long)
            .unwrap()
            .with_param("variant", 2)
            .with_param("frequency", "60min");
        assert_eq!(spec.params().len(), 2);
        assert_eq!(spec.params()["variant"], serde_json::json!(2));
    }
}
