#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/osaka/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod cdf;
pub mod daily;
pub mod earnings_yield;
pub mod persisted;
pub mod postprocess;
pub mod registry;
pub mod volume_direction;
pub mod window;
pub mod window_volatility;

pub use aggregate::Aggregation;
pub use cdf::NormalCdf;
pub use daily::{DailyCachedFactor, DailyScorer};
pub use earnings_yield::EarningsYieldFactor;
pub use persisted::{PersistedFactor, UpdateEntry, UpdateOptions, UpdateReport, UpdateState};
pub use postprocess::{MissingPolicy, OutlierPolicy, PostProcess, StandardizePolicy};
pub use registry::{FactorCategory, FactorInfo, available_factors, get_factor_info};
pub use volume_direction::{DirectionMeasure, VolumeDirectionScorer, volume_direction_factor};
pub use window::{TradeDataWindow, WindowState};
pub use window_volatility::WindowVolatilityFactor;

// Re-export the contract types factor consumers need.
pub use osaka_traits::{CrossSection, Date, Direction, FactorCompute, FactorError, FactorSpec};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
