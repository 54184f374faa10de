#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/osaka/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod daily_cache;
pub mod daterepr;
pub mod error;
pub mod feed;
pub mod schema;
pub mod store;

pub use daily_cache::DailyCache;
pub use daterepr::DateRepr;
pub use error::{DataError, Result};
pub use feed::{DataFeed, Frequency};
pub use schema::FactorTableSchema;
pub use store::{
    DocumentStore, RelationalStore, StoreBackend, StoreKind, memory::MemoryDocumentStore,
    sqlite::SqliteStore,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
