//! Offline CSV-backed data feed.
//!
//! Serves a local quote file through the [`DataFeed`] interface so the
//! CLI runs without any market-data service. Expected columns:
//! `date` (ISO), `security_id`, `close`, `pre_close`, `volume` and an
//! optional `pe_ratio`. Trading dates are the distinct dates present;
//! the universe at a date is the set of securities quoted on it.

use osaka_data::{DataError, DataFeed, Frequency, Result};
use osaka_traits::Date;
use polars::prelude::*;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct QuoteRow {
    date: Date,
    security_id: String,
    close: f64,
    pre_close: f64,
    volume: f64,
    #[serde(default)]
    pe_ratio: Option<f64>,
}

/// A [`DataFeed`] over a local CSV quote file.
#[derive(Debug)]
pub(crate) struct CsvFeed {
    rows: Vec<QuoteRow>,
    dates: Vec<Date>,
}

impl CsvFeed {
    /// Load and parse the quote file.
    pub(crate) fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())
            .map_err(|e| DataError::Parse(format!("cannot open quote file: {}", e)))?;
        let mut rows: Vec<QuoteRow> = Vec::new();
        for record in reader.deserialize() {
            rows.push(record.map_err(|e| DataError::Parse(format!("bad quote row: {}", e)))?);
        }
        rows.sort_by(|a, b| (a.date, &a.security_id).cmp(&(b.date, &b.security_id)));

        let mut dates: Vec<Date> = rows.iter().map(|r| r.date).collect();
        dates.dedup();
        Ok(Self { rows, dates })
    }

    /// Number of quote rows loaded.
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the quote file held no rows.
    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn frame(&self, rows: &[&QuoteRow], items: &[String]) -> Result<DataFrame> {
        let mut columns: Vec<Column> = vec![
            Series::new(
                "date".into(),
                rows.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
            )
            .into(),
            Series::new(
                "security_id".into(),
                rows.iter().map(|r| r.security_id.clone()).collect::<Vec<_>>(),
            )
            .into(),
        ];
        for item in items {
            let series = match item.as_str() {
                "close" => Series::new(
                    "close".into(),
                    rows.iter().map(|r| Some(r.close)).collect::<Vec<_>>(),
                ),
                "pre_close" => Series::new(
                    "pre_close".into(),
                    rows.iter().map(|r| Some(r.pre_close)).collect::<Vec<_>>(),
                ),
                "volume" => Series::new(
                    "volume".into(),
                    rows.iter().map(|r| Some(r.volume)).collect::<Vec<_>>(),
                ),
                "pe_ratio" => Series::new(
                    "pe_ratio".into(),
                    rows.iter().map(|r| r.pe_ratio).collect::<Vec<_>>(),
                ),
                other => {
                    return Err(DataError::Config(format!(
                        "quote file has no item '{}'",
                        other
                    )))
                }
            };
            columns.push(series.into());
        }
        let df = DataFrame::new(columns)?;
        Ok(df
            .lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()?)
    }

    fn select(&self, security_ids: &[String], begin: Date, end: Date) -> Vec<&QuoteRow> {
        self.rows
            .iter()
            .filter(|r| (begin..=end).contains(&r.date))
            .filter(|r| security_ids.contains(&r.security_id))
            .collect()
    }
}

impl DataFeed for CsvFeed {
    fn quotation(
        &self,
        security_ids: &[String],
        items: &[String],
        _frequency: Frequency,
        begin: Date,
        end: Date,
    ) -> Result<DataFrame> {
        let rows = self.select(security_ids, begin, end);
        self.frame(&rows, items)
    }

    fn day_variables(
        &self,
        dates: &[Date],
        security_ids: &[String],
        items: &[String],
    ) -> Result<DataFrame> {
        let rows: Vec<&QuoteRow> = self
            .rows
            .iter()
            .filter(|r| dates.contains(&r.date))
            .filter(|r| security_ids.contains(&r.security_id))
            .collect();
        self.frame(&rows, items)
    }

    fn security_codes(&self, date: Date) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .rows
            .iter()
            .filter(|r| r.date == date)
            .map(|r| r.security_id.clone())
            .collect();
        ids.dedup();
        Ok(ids)
    }

    fn trade_dates(&self, begin: Date, end: Date) -> Result<Vec<Date>> {
        Ok(self
            .dates
            .iter()
            .copied()
            .filter(|d| (begin..=end).contains(d))
            .collect())
    }

    fn trade_dates_back(&self, end: Date, count: usize) -> Result<Vec<Date>> {
        let mut dates: Vec<Date> = self.dates.iter().copied().filter(|d| *d <= end).collect();
        let skip = dates.len().saturating_sub(count);
        dates.drain(..skip);
        Ok(dates)
    }
}
