#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/osaka/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod factor;
pub mod spec;

pub use error::{FactorError, Result};
pub use factor::{FactorCompute, cross_section, empty_value_frame, frame_dates, value_frame};
pub use spec::{CrossSection, Date, Direction, FactorSpec, Params};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
