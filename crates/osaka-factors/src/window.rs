//! Rolling window of trade data with incremental refresh.
//!
//! A window covers the last `lag` trading dates ending at the requested
//! date, for the security universe valid at the window end. On a refresh
//! the window diffs its previous state against the new date set and
//! universe and fetches only the delta: full-window fetches happen only
//! for securities that newly entered the universe.

use osaka_data::{DataFeed, Frequency};
use osaka_traits::{Date, FactorError, Result};
use polars::prelude::*;
use std::collections::BTreeSet;

/// Materialized window contents.
#[derive(Debug, Clone)]
pub struct WindowState {
    /// Bars sorted by (date, security_id).
    pub frame: DataFrame,
    /// Trading dates covered, ascending.
    pub dates: Vec<Date>,
    /// Security universe as of the window end.
    pub universe: Vec<String>,
}

impl WindowState {
    /// Finite values of `item` per security, ordered by date.
    pub fn series_by_security(
        &self,
        item: &str,
    ) -> Result<std::collections::BTreeMap<String, Vec<f64>>> {
        let ids = self.frame.column("security_id")?.str()?;
        let vals = self.frame.column(item)?.cast(&DataType::Float64)?;
        let vals = vals.f64()?;

        let mut out = std::collections::BTreeMap::new();
        for (id, v) in ids.into_iter().zip(vals) {
            let Some(id) = id else { continue };
            let series: &mut Vec<f64> = out.entry(id.to_string()).or_default();
            if let Some(v) = v.filter(|x| x.is_finite()) {
                series.push(v);
            }
        }
        Ok(out)
    }
}

/// Rolling trade-data window over a [`DataFeed`].
#[derive(Debug)]
pub struct TradeDataWindow {
    lag: usize,
    frequency: Frequency,
    min_coverage: f64,
    items: Vec<String>,
    incremental: bool,
    state: Option<WindowState>,
}

impl TradeDataWindow {
    /// Window of `lag` trading dates fetching the given quotation items.
    ///
    /// Defaults: 70% minimum coverage, incremental refresh enabled.
    pub fn new(lag: usize, frequency: Frequency, items: &[&str]) -> Self {
        Self {
            lag,
            frequency,
            min_coverage: 0.7,
            items: items.iter().map(|s| s.to_string()).collect(),
            incremental: true,
            state: None,
        }
    }

    /// Set the minimum valid-coverage ratio.
    #[must_use]
    pub fn with_min_coverage(mut self, ratio: f64) -> Self {
        self.min_coverage = ratio;
        self
    }

    /// Enable or disable incremental refresh.
    #[must_use]
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Window length in trading dates.
    pub const fn lag(&self) -> usize {
        self.lag
    }

    /// Sampling frequency.
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Minimum valid-coverage ratio.
    pub const fn min_coverage(&self) -> f64 {
        self.min_coverage
    }

    /// Minimum number of valid bars a security needs to be covered.
    pub fn min_rows(&self) -> usize {
        let expected = self.lag * self.frequency.bars_per_day() as usize;
        (expected as f64 * self.min_coverage).ceil() as usize
    }

    /// Current window contents, if any refresh has happened.
    pub fn state(&self) -> Option<&WindowState> {
        self.state.as_ref()
    }

    /// Discard the window contents.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Bring the window up to the `lag` trading dates ending at `date`.
    pub fn refresh(&mut self, feed: &dyn DataFeed, date: Date) -> Result<&WindowState> {
        let dates = feed.trade_dates_back(date, self.lag)?;
        if dates.is_empty() {
            return Err(FactorError::Feed(format!(
                "no trading dates on or before {}",
                date
            )));
        }
        let end = dates[dates.len() - 1];
        let universe = feed.security_codes(end)?;

        let state = match self.state.take() {
            Some(prev) if self.incremental => {
                self.refresh_incremental(feed, prev, dates, universe)?
            }
            _ => self.fetch_full(feed, dates, universe)?,
        };
        Ok(&*self.state.insert(state))
    }

    fn fetch_full(
        &self,
        feed: &dyn DataFeed,
        dates: Vec<Date>,
        universe: Vec<String>,
    ) -> Result<WindowState> {
        let begin = dates[0];
        let end = dates[dates.len() - 1];
        let frame = feed.quotation(&universe, &self.items, self.frequency, begin, end)?;
        let frame = sort_window(frame)?;
        Ok(WindowState {
            frame,
            dates,
            universe,
        })
    }

    fn refresh_incremental(
        &self,
        feed: &dyn DataFeed,
        prev: WindowState,
        dates: Vec<Date>,
        universe: Vec<String>,
    ) -> Result<WindowState> {
        let new_dates: BTreeSet<Date> = dates.iter().copied().collect();
        let old_dates: BTreeSet<Date> = prev.dates.iter().copied().collect();
        let old_universe: BTreeSet<&str> = prev.universe.iter().map(String::as_str).collect();

        let survivors: Vec<String> = universe
            .iter()
            .filter(|id| old_universe.contains(id.as_str()))
            .cloned()
            .collect();
        let entrants: Vec<String> = universe
            .iter()
            .filter(|id| !old_universe.contains(id.as_str()))
            .cloned()
            .collect();
        let entered: Vec<Date> = new_dates.difference(&old_dates).copied().collect();

        // Surviving rows still inside the window.
        let keep_ids: BTreeSet<String> = survivors.iter().cloned().collect();
        let keep_dates: BTreeSet<String> = new_dates
            .intersection(&old_dates)
            .map(|d| d.to_string())
            .collect();
        let mut parts = vec![filter_window(&prev.frame, &keep_ids, &keep_dates)?];

        // Newly-entered dates for the survivors.
        if !entered.is_empty() && !survivors.is_empty() {
            let fetched = feed.quotation(
                &survivors,
                &self.items,
                self.frequency,
                entered[0],
                entered[entered.len() - 1],
            )?;
            let wanted: BTreeSet<String> = entered.iter().map(|d| d.to_string()).collect();
            parts.push(filter_dates(&fetched, &wanted)?);
        }

        // Full window for new entrants.
        if !entrants.is_empty() {
            parts.push(feed.quotation(
                &entrants,
                &self.items,
                self.frequency,
                dates[0],
                dates[dates.len() - 1],
            )?);
        }

        let mut frame = parts.remove(0);
        for part in parts {
            frame.vstack_mut(&part)?;
        }
        let frame = sort_window(frame)?;
        Ok(WindowState {
            frame,
            dates,
            universe,
        })
    }
}

fn sort_window(frame: DataFrame) -> Result<DataFrame> {
    Ok(frame.sort(["date", "security_id"], SortMultipleOptions::default())?)
}

fn filter_window(
    frame: &DataFrame,
    ids: &BTreeSet<String>,
    dates: &BTreeSet<String>,
) -> Result<DataFrame> {
    let id_col = frame.column("security_id")?.str()?;
    let date_col = frame.column("date")?.cast(&DataType::String)?;
    let date_col = date_col.str()?;

    let mask: BooleanChunked = id_col
        .into_iter()
        .zip(date_col)
        .map(|(id, d)| {
            Some(matches!((id, d), (Some(id), Some(d)) if ids.contains(id) && dates.contains(d)))
        })
        .collect();
    Ok(frame.filter(&mask)?)
}

fn filter_dates(frame: &DataFrame, dates: &BTreeSet<String>) -> Result<DataFrame> {
    let date_col = frame.column("date")?.cast(&DataType::String)?;
    let date_col = date_col.str()?;
    let mask: BooleanChunked = date_col
        .into_iter()
        .map(|d| Some(matches!(d, Some(d) if dates.contains(d))))
        .collect();
    Ok(frame.filter(&mask)?)
}
