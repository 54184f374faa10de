//! The market-data feed interface consumed by factor computations.
//!
//! Osaka never fetches market data itself; callers inject an object that
//! implements [`DataFeed`]. All methods are synchronous and blocking, and
//! errors from the feed propagate to the caller unchanged.

use crate::error::Result;
use osaka_traits::Date;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Sampling frequency of quotation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// One bar per trading day.
    Daily,
    /// Intraday bars of the given length in minutes.
    Minute(u32),
}

impl Frequency {
    /// Number of bars per trading day (240 trading minutes per day).
    pub fn bars_per_day(&self) -> u32 {
        match self {
            Self::Daily => 1,
            Self::Minute(m) => 240 / (*m).max(1),
        }
    }
}

/// External market-data service.
///
/// Tabular results carry at least `{date, security_id}` plus the requested
/// item columns. The `date` column is a polars `Date`.
pub trait DataFeed {
    /// Quotation bars for the given securities and items over `[begin, end]`.
    fn quotation(
        &self,
        security_ids: &[String],
        items: &[String],
        frequency: Frequency,
        begin: Date,
        end: Date,
    ) -> Result<DataFrame>;

    /// Per-day fundamental variables for the given dates and securities.
    fn day_variables(
        &self,
        dates: &[Date],
        security_ids: &[String],
        items: &[String],
    ) -> Result<DataFrame>;

    /// The security universe valid as of `date` (e.g. index constituents).
    fn security_codes(&self, date: Date) -> Result<Vec<String>>;

    /// Trading dates within `[begin, end]`, ascending.
    fn trade_dates(&self, begin: Date, end: Date) -> Result<Vec<Date>>;

    /// The last `count` trading dates ending at (and including) the last
    /// trading date on or before `end`, ascending.
    fn trade_dates_back(&self, end: Date, count: usize) -> Result<Vec<Date>>;
}
