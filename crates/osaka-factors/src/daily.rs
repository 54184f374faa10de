//! Daily-cached periodic factor.
//!
//! Multi-day factors whose per-day score is expensive decompose into a
//! scorer run once per trading day plus an aggregation over the lag
//! window. Raw per-day scores are cached on disk keyed by (symbol, date);
//! the optional cross-sectional z-score is applied after the cache load
//! so cached entries stay raw.

use crate::aggregate::Aggregation;
use crate::postprocess::zscore;
use osaka_data::{DailyCache, DataFeed, Frequency};
use osaka_traits::{value_frame, CrossSection, Date, FactorCompute, FactorSpec, Result};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Scores one trading day's bars into a per-security map.
pub trait DailyScorer {
    /// Quotation items the scorer needs fetched.
    fn items(&self) -> Vec<String>;

    /// Score one day's bars. Bars carry `{date, security_id, ...items}`.
    fn score_day(&self, bars: &DataFrame) -> Result<CrossSection>;
}

/// A factor computed as an aggregation of cached per-day scores.
pub struct DailyCachedFactor<S: DailyScorer> {
    spec: FactorSpec,
    feed: Rc<dyn DataFeed>,
    scorer: S,
    cache: DailyCache,
    lag: usize,
    frequency: Frequency,
    min_coverage: f64,
    aggregation: Aggregation,
    standardize_daily: bool,
}

impl<S: DailyScorer> fmt::Debug for DailyCachedFactor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DailyCachedFactor")
            .field("spec", &self.spec)
            .field("cache", &self.cache)
            .field("lag", &self.lag)
            .field("frequency", &self.frequency)
            .field("min_coverage", &self.min_coverage)
            .field("aggregation", &self.aggregation)
            .field("standardize_daily", &self.standardize_daily)
            .finish()
    }
}

impl<S: DailyScorer> DailyCachedFactor<S> {
    /// Defaults: 20-day lag, 60-minute bars, 70% coverage, mean
    /// aggregation, per-day z-score enabled.
    pub fn new(spec: FactorSpec, feed: Rc<dyn DataFeed>, scorer: S) -> Self {
        let cache = DailyCache::new(DailyCache::default_base(), spec.symbol());
        Self {
            spec,
            feed,
            scorer,
            cache,
            lag: 20,
            frequency: Frequency::Minute(60),
            min_coverage: 0.7,
            aggregation: Aggregation::Mean,
            standardize_daily: true,
        }
    }

    /// Root the score cache under a different base directory.
    #[must_use]
    pub fn with_cache_base(mut self, base: impl AsRef<Path>) -> Self {
        self.cache = DailyCache::new(base, self.spec.symbol());
        self
    }

    /// Set the aggregation window length in trading days.
    #[must_use]
    pub fn with_lag(mut self, lag: usize) -> Self {
        self.lag = lag;
        self
    }

    /// Set the bar frequency the scorer consumes.
    #[must_use]
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set the minimum valid-coverage ratio over the window.
    #[must_use]
    pub fn with_min_coverage(mut self, ratio: f64) -> Self {
        self.min_coverage = ratio;
        self
    }

    /// Set the series reducer.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Enable or disable the per-day cross-sectional z-score.
    #[must_use]
    pub fn with_standardize_daily(mut self, on: bool) -> Self {
        self.standardize_daily = on;
        self
    }

    /// The on-disk score cache.
    pub fn cache(&self) -> &DailyCache {
        &self.cache
    }

    /// Per-day scores for one trading date.
    ///
    /// A cache hit skips the feed and the scorer entirely. On a miss the
    /// day's bars are fetched, scored, sanitized (±∞ to missing) and
    /// cached raw. The optional z-score applies to the returned map only.
    pub fn daily_factor(&self, date: Date) -> Result<CrossSection> {
        let raw = match self.cache.load(date)? {
            Some(raw) => raw,
            None => {
                let universe = self.feed.security_codes(date)?;
                let bars = self.feed.quotation(
                    &universe,
                    &self.scorer.items(),
                    self.frequency,
                    date,
                    date,
                )?;
                let scored = self.scorer.score_day(&bars)?;
                let raw: CrossSection = scored
                    .into_iter()
                    .map(|(k, v)| (k, v.filter(|x| x.is_finite())))
                    .collect();
                self.cache.store(date, &raw)?;
                raw
            }
        };
        if self.standardize_daily {
            Ok(zscore(&raw))
        } else {
            Ok(raw)
        }
    }

    fn aggregate_window(&self, date: Date) -> Result<CrossSection> {
        let dates = self.feed.trade_dates_back(date, self.lag)?;
        let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for d in &dates {
            for (id, v) in self.daily_factor(*d)? {
                let entry = series.entry(id).or_default();
                if let Some(v) = v {
                    entry.push(v);
                }
            }
        }

        // Securities under the coverage floor are dropped, not emitted as
        // missing rows.
        let min_obs = (self.lag as f64 * self.min_coverage).ceil() as usize;
        let out = series
            .into_iter()
            .filter(|(_, xs)| xs.len() >= min_obs)
            .map(|(id, xs)| {
                let value = self.aggregation.reduce(&xs);
                (id, value)
            })
            .collect();
        Ok(out)
    }
}

impl<S: DailyScorer> FactorCompute for DailyCachedFactor<S> {
    fn spec(&self) -> &FactorSpec {
        &self.spec
    }

    fn compute_value(&mut self, date: Date) -> Result<DataFrame> {
        let values = self.aggregate_window(date)?;
        value_frame(date, &values)
    }
}
