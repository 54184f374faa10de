//! Integration tests for the incremental trade-data window: set
//! equality with a full re-fetch and delta-proportional fetch cost.

use osaka_data::{DataFeed, Frequency};
use osaka_factors::TradeDataWindow;
use osaka_traits::Date;
use polars::prelude::*;
use std::cell::Cell;
use std::collections::BTreeMap;

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

/// Feed serving daily bars, tracking how many rows each fetch returned.
struct QuoteFeed {
    dates: Vec<Date>,
    universe: BTreeMap<Date, Vec<&'static str>>,
    quotes: BTreeMap<(Date, &'static str), (f64, f64, f64)>,
    rows_fetched: Cell<usize>,
    quotation_calls: Cell<usize>,
}

impl QuoteFeed {
    /// Five trading days. A and B trade throughout; from the fourth day
    /// A leaves the universe and C enters.
    fn new() -> Self {
        let dates = vec![
            date(2017, 5, 8),
            date(2017, 5, 9),
            date(2017, 5, 10),
            date(2017, 5, 11),
            date(2017, 5, 12),
        ];
        let mut universe = BTreeMap::new();
        let mut quotes = BTreeMap::new();
        for (i, d) in dates.iter().enumerate() {
            let members: Vec<&'static str> = if i < 3 {
                vec!["000001.SZ", "600000.SH"]
            } else {
                vec!["600000.SH", "300750.SZ"]
            };
            universe.insert(*d, members);
            for (j, id) in ["000001.SZ", "600000.SH", "300750.SZ"].iter().enumerate() {
                let base = 10.0 + j as f64 * 5.0 + i as f64 * 0.1;
                quotes.insert((*d, *id), (base, base - 0.05, 1000.0 + i as f64));
            }
        }
        Self {
            dates,
            universe,
            quotes,
            rows_fetched: Cell::new(0),
            quotation_calls: Cell::new(0),
        }
    }
}

impl DataFeed for QuoteFeed {
    fn quotation(
        &self,
        security_ids: &[String],
        _items: &[String],
        _frequency: Frequency,
        begin: Date,
        end: Date,
    ) -> osaka_data::Result<DataFrame> {
        self.quotation_calls.set(self.quotation_calls.get() + 1);
        let mut out_dates = Vec::new();
        let mut out_ids = Vec::new();
        let mut closes = Vec::new();
        let mut pres = Vec::new();
        let mut volumes = Vec::new();
        for d in self.dates.iter().filter(|d| (begin..=end).contains(d)) {
            for id in security_ids {
                if let Some((c, p, v)) = self.quotes.get(&(*d, id.as_str())) {
                    out_dates.push(d.to_string());
                    out_ids.push(id.clone());
                    closes.push(*c);
                    pres.push(*p);
                    volumes.push(*v);
                }
            }
        }
        self.rows_fetched.set(self.rows_fetched.get() + out_dates.len());
        let df = DataFrame::new(vec![
            Series::new("date".into(), out_dates).into(),
            Series::new("security_id".into(), out_ids).into(),
            Series::new("close".into(), closes).into(),
            Series::new("pre_close".into(), pres).into(),
            Series::new("volume".into(), volumes).into(),
        ])?;
        Ok(df
            .lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()?)
    }

    fn day_variables(
        &self,
        _dates: &[Date],
        _security_ids: &[String],
        _items: &[String],
    ) -> osaka_data::Result<DataFrame> {
        Ok(DataFrame::empty())
    }

    fn security_codes(&self, date: Date) -> osaka_data::Result<Vec<String>> {
        Ok(self
            .universe
            .get(&date)
            .into_iter()
            .flatten()
            .map(|id| id.to_string())
            .collect())
    }

    fn trade_dates(&self, begin: Date, end: Date) -> osaka_data::Result<Vec<Date>> {
        Ok(self
            .dates
            .iter()
            .copied()
            .filter(|d| (begin..=end).contains(d))
            .collect())
    }

    fn trade_dates_back(&self, end: Date, count: usize) -> osaka_data::Result<Vec<Date>> {
        let mut dates: Vec<Date> = self.dates.iter().copied().filter(|d| *d <= end).collect();
        let skip = dates.len().saturating_sub(count);
        dates.drain(..skip);
        Ok(dates)
    }
}

const ITEMS: [&str; 3] = ["close", "pre_close", "volume"];

#[test]
fn test_first_refresh_fetches_full_window() {
    let feed = QuoteFeed::new();
    let mut window = TradeDataWindow::new(3, Frequency::Daily, &ITEMS);

    let state = window.refresh(&feed, date(2017, 5, 10)).unwrap();
    assert_eq!(state.dates.len(), 3);
    assert_eq!(state.universe, vec!["000001.SZ", "600000.SH"]);
    // 2 securities over 3 dates
    assert_eq!(state.frame.height(), 6);
    assert_eq!(feed.rows_fetched.get(), 6);
}

#[test]
fn test_incremental_refresh_matches_full_refetch() {
    let feed = QuoteFeed::new();
    let target = date(2017, 5, 11);

    let mut incremental = TradeDataWindow::new(3, Frequency::Daily, &ITEMS);
    incremental.refresh(&feed, date(2017, 5, 10)).unwrap();
    let inc = incremental.refresh(&feed, target).unwrap().frame.clone();

    let mut full = TradeDataWindow::new(3, Frequency::Daily, &ITEMS).with_incremental(false);
    let all = full.refresh(&feed, target).unwrap().frame.clone();

    assert!(inc.equals_missing(&all));
}

#[test]
fn test_incremental_fetch_cost_is_proportional_to_delta() {
    let feed = QuoteFeed::new();
    let mut window = TradeDataWindow::new(3, Frequency::Daily, &ITEMS);

    window.refresh(&feed, date(2017, 5, 10)).unwrap();
    let before = feed.rows_fetched.get();
    assert_eq!(before, 6);

    // One date rolls in, one security swaps: survivor B needs 1 row,
    // entrant C needs the 3-date window. A full re-fetch would be 6.
    window.refresh(&feed, date(2017, 5, 11)).unwrap();
    let delta = feed.rows_fetched.get() - before;
    assert_eq!(delta, 4);
}

#[test]
fn test_disabled_incremental_always_refetches() {
    let feed = QuoteFeed::new();
    let mut window = TradeDataWindow::new(3, Frequency::Daily, &ITEMS).with_incremental(false);

    window.refresh(&feed, date(2017, 5, 10)).unwrap();
    window.refresh(&feed, date(2017, 5, 11)).unwrap();
    assert_eq!(feed.rows_fetched.get(), 12);
}

#[test]
fn test_departed_security_rows_are_dropped() {
    let feed = QuoteFeed::new();
    let mut window = TradeDataWindow::new(3, Frequency::Daily, &ITEMS);

    window.refresh(&feed, date(2017, 5, 10)).unwrap();
    let state = window.refresh(&feed, date(2017, 5, 11)).unwrap();

    let ids = state.frame.column("security_id").unwrap();
    let ids = ids.str().unwrap();
    assert!(ids.into_iter().flatten().all(|id| id != "000001.SZ"));
    assert_eq!(state.universe, vec!["600000.SH", "300750.SZ"]);
}

#[test]
fn test_series_by_security_ordered_by_date() {
    let feed = QuoteFeed::new();
    let mut window = TradeDataWindow::new(3, Frequency::Daily, &ITEMS);

    let state = window.refresh(&feed, date(2017, 5, 10)).unwrap();
    let series = state.series_by_security("close").unwrap();
    let a = &series["000001.SZ"];
    assert_eq!(a.len(), 3);
    assert!(a.windows(2).all(|w| w[0] < w[1]));
}
