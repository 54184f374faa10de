#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/osaka/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export main types from sub-crates
pub use osaka_data as data;
pub use osaka_factors as factors;
pub use osaka_traits as traits;

// Re-export the contract types most callers need directly
pub use osaka_traits::{
    CrossSection, Date, Direction, FactorCompute, FactorError, FactorSpec, Result,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
