//! Persistence-aware factor wrapper.
//!
//! [`PersistedFactor`] composes an inner computation with an optional
//! backing store, a physical column mapping and a post-processing chain.
//! Reads prefer stored rows over recomputation; writes go through
//! [`update_to_store`](PersistedFactor::update_to_store), whose guard
//! conditions and transitions are recorded in a timestamped
//! [`UpdateReport`]. Business-rule rejections end in `NotUpdated`
//! without an error; only feed and store I/O failures propagate.

use crate::postprocess::PostProcess;
use chrono::{Datelike, Utc};
use osaka_data::{DateRepr, FactorTableSchema, StoreBackend};
use osaka_traits::{
    cross_section, empty_value_frame, frame_dates, value_frame, Date, FactorCompute, FactorError,
    Result,
};
use polars::prelude::*;
use std::fmt;

/// Phases of an [`update_to_store`](PersistedFactor::update_to_store) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// No work done yet.
    NotStarted,
    /// Inspecting options and existing rows.
    Checking,
    /// Running the inner computation.
    Computing,
    /// Validating the computed frame.
    Validating,
    /// Writing through the store.
    Writing,
    /// The store holds the rows for the date.
    Updated,
    /// Rejected without writing.
    NotUpdated,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::Checking => "checking",
            Self::Computing => "computing",
            Self::Validating => "validating",
            Self::Writing => "writing",
            Self::Updated => "updated",
            Self::NotUpdated => "not-updated",
        };
        f.write_str(name)
    }
}

/// One timestamped transition in an update run.
#[derive(Debug, Clone)]
pub struct UpdateEntry {
    /// RFC 3339 timestamp of the transition.
    pub at: String,
    /// State entered.
    pub state: UpdateState,
    /// Human-readable description.
    pub message: String,
}

/// Auditable record of one update run.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    symbol: String,
    date: Date,
    state: UpdateState,
    entries: Vec<UpdateEntry>,
}

impl UpdateReport {
    fn new(symbol: &str, date: Date) -> Self {
        Self {
            symbol: symbol.to_string(),
            date,
            state: UpdateState::NotStarted,
            entries: Vec::new(),
        }
    }

    fn push(&mut self, state: UpdateState, message: impl Into<String>) {
        self.state = state;
        self.entries.push(UpdateEntry {
            at: Utc::now().to_rfc3339(),
            state,
            message: message.into(),
        });
    }

    fn reject(&mut self, message: impl Into<String>) {
        self.push(UpdateState::NotUpdated, message);
    }

    /// Factor symbol the run was for.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Date the run was for.
    pub const fn date(&self) -> Date {
        self.date
    }

    /// Final state of the run.
    pub const fn state(&self) -> UpdateState {
        self.state
    }

    /// Whether the store holds the rows for the date after the run.
    pub fn is_updated(&self) -> bool {
        self.state == UpdateState::Updated
    }

    /// All transitions, in order.
    pub fn entries(&self) -> &[UpdateEntry] {
        &self.entries
    }
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "update {} for {}: {}",
            self.symbol, self.date, self.state
        )?;
        for entry in &self.entries {
            writeln!(f, "  [{}] {}: {}", entry.at, entry.state, entry.message)?;
        }
        Ok(())
    }
}

/// Guard thresholds for an update run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateOptions {
    /// Exact row count the computed frame must have, when set.
    pub expected_count: Option<usize>,
    /// Reject when the null fraction reaches this ratio.
    pub max_null_ratio: f64,
    /// Delete and recompute even when rows already exist.
    pub force_recompute: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            expected_count: None,
            max_null_ratio: 1.0,
            force_recompute: false,
        }
    }
}

impl UpdateOptions {
    /// Require an exact computed row count.
    #[must_use]
    pub const fn with_expected_count(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }

    /// Set the null-fraction rejection threshold.
    #[must_use]
    pub const fn with_max_null_ratio(mut self, ratio: f64) -> Self {
        self.max_null_ratio = ratio;
        self
    }

    /// Force delete-and-recompute of existing rows.
    #[must_use]
    pub const fn force(mut self) -> Self {
        self.force_recompute = true;
        self
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.expected_count == Some(0) {
            return Err("expected_count must be positive when set".to_string());
        }
        if !(0.0..=1.0).contains(&self.max_null_ratio) {
            return Err(format!(
                "max_null_ratio must lie in [0, 1], got {}",
                self.max_null_ratio
            ));
        }
        Ok(())
    }
}

/// A factor computation bound to an optional backing store.
pub struct PersistedFactor<F: FactorCompute> {
    inner: F,
    store: Option<StoreBackend>,
    schema: FactorTableSchema,
    post: PostProcess,
}

impl<F: FactorCompute> fmt::Debug for PersistedFactor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedFactor")
            .field("symbol", &self.symbol())
            .field("store", &self.store)
            .field("schema", &self.schema)
            .field("post", &self.post)
            .finish()
    }
}

impl<F: FactorCompute> PersistedFactor<F> {
    /// Wrap a computation with no store and default schema and chain.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            store: None,
            schema: FactorTableSchema::default(),
            post: PostProcess::default(),
        }
    }

    /// Attach a backing store.
    #[must_use]
    pub fn with_store(mut self, store: StoreBackend) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the physical column mapping.
    #[must_use]
    pub fn with_schema(mut self, schema: FactorTableSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Override the post-processing chain.
    #[must_use]
    pub fn with_postprocess(mut self, post: PostProcess) -> Self {
        self.post = post;
        self
    }

    /// The wrapped computation.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// The wrapped computation, mutably.
    pub fn inner_mut(&mut self) -> &mut F {
        &mut self.inner
    }

    /// The physical column mapping in use.
    pub fn schema(&self) -> &FactorTableSchema {
        &self.schema
    }

    fn symbol(&self) -> &str {
        self.inner.spec().symbol()
    }

    /// Stored rows for the given dates as a value frame.
    ///
    /// Dates with no stored rows are warned non-fatally; the returned
    /// frame carries whatever subset the store has. A missing table or
    /// collection yields the empty frame.
    ///
    /// # Errors
    ///
    /// Fails with [`FactorError::Config`] when no store is configured.
    pub fn fetch_from_store(&self, dates: &[Date]) -> Result<DataFrame> {
        let frame = self.fetch_rows(dates)?;
        let found = frame_dates(&frame)?;
        for missing in dates.iter().filter(|d| !found.contains(d)) {
            eprintln!(
                "Warning: no stored rows for {} on {}",
                self.symbol(),
                missing
            );
        }
        Ok(frame)
    }

    /// Stored rows as a value frame, without the missing-date warnings.
    ///
    /// The existence check in an update run goes through here so a
    /// first-time update stays quiet about the date it is writing.
    fn fetch_rows(&self, dates: &[Date]) -> Result<DataFrame> {
        let store = self.store.as_ref().ok_or_else(|| {
            FactorError::Config(format!("no store configured for {}", self.symbol()))
        })?;
        if dates.is_empty() {
            return empty_value_frame();
        }

        let raw = match store {
            StoreBackend::Relational(s) => {
                if !s.has_table(&self.schema.table)? {
                    empty_value_frame()?
                } else {
                    let list = dates
                        .iter()
                        .map(|d| self.schema.date_repr.sql_literal(*d))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let sql = format!(
                        "SELECT {date} AS date, {sec} AS security_id, {val} AS value \
                         FROM {table} WHERE {sym} = '{symbol}' AND {date} IN ({list})",
                        date = self.schema.date_col,
                        sec = self.schema.security_col,
                        val = self.schema.value_col,
                        table = self.schema.table,
                        sym = self.schema.symbol_col,
                        symbol = sql_escape(self.symbol()),
                        list = list,
                    );
                    s.run_query(&sql)?
                }
            }
            StoreBackend::Document(s) => {
                if !s.has_collection(&self.schema.table)? {
                    empty_value_frame()?
                } else {
                    s.find(&self.schema.table, self.symbol(), dates)?
                }
            }
        };

        // Document rows always carry ISO dates.
        let repr = match store {
            StoreBackend::Relational(_) => self.schema.date_repr,
            StoreBackend::Document(_) => DateRepr::IsoDate,
        };
        normalize_stored(&raw, repr)
    }

    /// Stored rows for `date` if present, otherwise a fresh computation.
    ///
    /// Never persists implicitly.
    pub fn get_or_compute(&mut self, date: Date) -> Result<DataFrame> {
        if self.store.is_some() {
            let stored = self.fetch_from_store(&[date])?;
            if stored.height() > 0 {
                return Ok(stored);
            }
        }
        self.inner.compute_value(date)
    }

    /// Post-processed values for `date` as a value frame.
    pub fn get_standardized(&mut self, date: Date) -> Result<DataFrame> {
        let raw = self.get_or_compute(date)?;
        let values = cross_section(&raw)?;
        let processed = self.post.apply(&values, self.inner.spec().direction());
        value_frame(date, &processed)
    }

    /// Delete the stored rows for (symbol, date).
    ///
    /// A missing table or collection is a no-op.
    ///
    /// # Errors
    ///
    /// Fails with [`FactorError::Config`] when no store is configured.
    pub fn delete_for_date(&self, date: Date) -> Result<()> {
        let store = self.store.as_ref().ok_or_else(|| {
            FactorError::Config(format!("no store configured for {}", self.symbol()))
        })?;
        match store {
            StoreBackend::Relational(s) => {
                if !s.has_table(&self.schema.table)? {
                    return Ok(());
                }
                let sql = format!(
                    "DELETE FROM {table} WHERE {sym} = '{symbol}' AND {date} = {lit}",
                    table = self.schema.table,
                    sym = self.schema.symbol_col,
                    symbol = sql_escape(self.symbol()),
                    date = self.schema.date_col,
                    lit = self.schema.date_repr.sql_literal(date),
                );
                s.run_delete(&sql)?;
            }
            StoreBackend::Document(s) => {
                if !s.has_collection(&self.schema.table)? {
                    return Ok(());
                }
                s.delete(&self.schema.table, self.symbol(), date)?;
            }
        }
        Ok(())
    }

    /// Compute the value frame for `date` and write it through the store.
    ///
    /// Guard rejections end in `NotUpdated` and are recorded in the
    /// returned report; they are not errors.
    pub fn update_to_store(&mut self, date: Date, options: &UpdateOptions) -> Result<UpdateReport> {
        let mut report = UpdateReport::new(self.symbol(), date);
        report.push(UpdateState::Checking, "checking options and existing rows");

        if let Err(reason) = options.validate() {
            report.reject(reason);
            return Ok(report);
        }
        if self.store.is_none() {
            report.reject("no store configured");
            return Ok(report);
        }

        // Missing table counts as zero rows: the first write creates it.
        let existing = self.fetch_rows(&[date])?.height();
        if existing > 0 {
            if options.force_recompute {
                report.push(
                    UpdateState::Checking,
                    format!("force recompute, deleting {} existing rows", existing),
                );
                self.delete_for_date(date)?;
            } else if options.expected_count.is_some_and(|n| n != existing) {
                report.push(
                    UpdateState::Checking,
                    format!(
                        "stored row count {} does not match expected {}, deleting",
                        existing,
                        options.expected_count.unwrap_or_default(),
                    ),
                );
                self.delete_for_date(date)?;
            } else {
                report.push(
                    UpdateState::Updated,
                    format!("{} rows already stored", existing),
                );
                return Ok(report);
            }
        }

        report.push(UpdateState::Computing, "computing value frame");
        let frame = self.inner.compute_value(date)?;
        if frame.height() == 0 {
            report.reject("computation returned no rows");
            return Ok(report);
        }

        report.push(
            UpdateState::Validating,
            format!("validating {} computed rows", frame.height()),
        );
        if let Some(expected) = options.expected_count {
            if frame.height() != expected {
                report.reject(format!(
                    "computed row count {} does not match expected {}",
                    frame.height(),
                    expected
                ));
                return Ok(report);
            }
        }
        let null_ratio = frame.column("value")?.null_count() as f64 / frame.height() as f64;
        if null_ratio >= options.max_null_ratio {
            report.reject(format!(
                "null ratio {:.3} reaches threshold {:.3}",
                null_ratio, options.max_null_ratio
            ));
            return Ok(report);
        }

        report.push(
            UpdateState::Writing,
            format!("writing {} rows to {}", frame.height(), self.schema.table),
        );
        self.write_stamped(date, &frame)?;
        report.push(UpdateState::Updated, "write complete");
        Ok(report)
    }

    fn write_stamped(&self, date: Date, frame: &DataFrame) -> Result<()> {
        let store = self.store.as_ref().ok_or_else(|| {
            FactorError::Config(format!("no store configured for {}", self.symbol()))
        })?;

        let id_col = frame.column("security_id")?.str()?;
        let val_col = frame.column("value")?.cast(&DataType::Float64)?;
        let val_col = val_col.f64()?;
        let mut ids: Vec<String> = Vec::with_capacity(frame.height());
        let mut vals: Vec<Option<f64>> = Vec::with_capacity(frame.height());
        for (id, v) in id_col.into_iter().zip(val_col) {
            let Some(id) = id else { continue };
            ids.push(id.to_string());
            vals.push(v.filter(|x| x.is_finite()));
        }
        let n = ids.len();
        let now = Utc::now().to_rfc3339();

        match store {
            StoreBackend::Relational(s) => {
                let date_series = match self.schema.date_repr {
                    DateRepr::IntDate => {
                        let int_date = i64::from(date.year()) * 10_000
                            + i64::from(date.month()) * 100
                            + i64::from(date.day());
                        Series::new(self.schema.date_col.as_str().into(), vec![int_date; n])
                    }
                    repr => Series::new(
                        self.schema.date_col.as_str().into(),
                        vec![repr.format(date); n],
                    ),
                };
                let df = DataFrame::new(vec![
                    Series::new(
                        self.schema.symbol_col.as_str().into(),
                        vec![self.symbol().to_string(); n],
                    )
                    .into(),
                    date_series.into(),
                    Series::new(self.schema.security_col.as_str().into(), ids).into(),
                    Series::new(self.schema.value_col.as_str().into(), vals).into(),
                    Series::new(self.schema.updated_col.as_str().into(), vec![now; n]).into(),
                ])?;
                s.write_table(&df, &self.schema.table)?;
            }
            StoreBackend::Document(s) => {
                let df = DataFrame::new(vec![
                    Series::new("symbol".into(), vec![self.symbol().to_string(); n]).into(),
                    Series::new("date".into(), vec![date.to_string(); n]).into(),
                    Series::new("security_id".into(), ids).into(),
                    Series::new("value".into(), vals).into(),
                    Series::new("updated_at".into(), vec![now; n]).into(),
                ])?;
                s.insert(&self.schema.table, &df)?;
            }
        }
        Ok(())
    }
}

impl<F: FactorCompute> FactorCompute for PersistedFactor<F> {
    fn spec(&self) -> &osaka_traits::FactorSpec {
        self.inner.spec()
    }

    fn compute_value(&mut self, date: Date) -> Result<DataFrame> {
        self.inner.compute_value(date)
    }
}

fn sql_escape(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// Normalize a stored result table to the value-frame contract.
///
/// Trims padded identifiers and parses the date column back through the
/// representation codec.
fn normalize_stored(raw: &DataFrame, repr: DateRepr) -> Result<DataFrame> {
    if raw.height() == 0 {
        return empty_value_frame();
    }
    let date_col = raw.column("date")?.cast(&DataType::String)?;
    let dates = date_col.str()?;
    let ids = raw.column("security_id")?.str()?;
    let vals = raw.column("value")?.cast(&DataType::Float64)?;
    let vals = vals.f64()?;

    let mut out_dates: Vec<String> = Vec::with_capacity(raw.height());
    let mut out_ids: Vec<String> = Vec::with_capacity(raw.height());
    let mut out_vals: Vec<Option<f64>> = Vec::with_capacity(raw.height());
    for ((d, id), v) in dates.into_iter().zip(ids).zip(vals) {
        let (Some(d), Some(id)) = (d, id) else { continue };
        out_dates.push(repr.parse(d)?.to_string());
        out_ids.push(id.trim().to_string());
        out_vals.push(v.filter(|x| x.is_finite()));
    }

    let df = DataFrame::new(vec![
        Series::new("date".into(), out_dates).into(),
        Series::new("security_id".into(), out_ids).into(),
        Series::new("value".into(), out_vals).into(),
    ])?;
    let df = df
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .with_column(col("value").cast(DataType::Float64))
        .collect()?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osaka_data::MemoryDocumentStore;
    use osaka_traits::{CrossSection, Direction, FactorSpec};

    struct FixedFactor {
        spec: FactorSpec,
        values: CrossSection,
    }

    impl FactorCompute for FixedFactor {
        fn spec(&self) -> &FactorSpec {
            &self.spec
        }

        fn compute_value(&mut self, date: Date) -> Result<DataFrame> {
            value_frame(date, &self.values)
        }
    }

    fn fixed(values: &[(&str, Option<f64>)]) -> FixedFactor {
        FixedFactor {
            spec: FactorSpec::new("EP", Direction::Long).unwrap(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fetch_without_store_is_config_error() {
        let factor = PersistedFactor::new(fixed(&[("A", Some(1.0))]));
        let err = factor.fetch_from_store(&[date(2017, 4, 28)]).unwrap_err();
        assert!(matches!(err, FactorError::Config(_)));
    }

    #[test]
    fn test_delete_without_store_is_config_error() {
        let factor = PersistedFactor::new(fixed(&[("A", Some(1.0))]));
        let err = factor.delete_for_date(date(2017, 4, 28)).unwrap_err();
        assert!(matches!(err, FactorError::Config(_)));
    }

    #[test]
    fn test_fetch_rows_missing_collection_is_empty() {
        let store = StoreBackend::Document(Box::new(MemoryDocumentStore::new()));
        let factor = PersistedFactor::new(fixed(&[("A", Some(1.0))])).with_store(store);
        let frame = factor.fetch_rows(&[date(2017, 4, 28)]).unwrap();
        assert_eq!(frame.height(), 0);
    }

    #[test]
    fn test_get_or_compute_without_store_computes() {
        let mut factor = PersistedFactor::new(fixed(&[("A", Some(1.0)), ("B", Some(2.0))]));
        let df = factor.get_or_compute(date(2017, 4, 28)).unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_update_rejects_invalid_options() {
        let mut factor = PersistedFactor::new(fixed(&[("A", Some(1.0))]));

        let report = factor
            .update_to_store(
                date(2017, 4, 28),
                &UpdateOptions::default().with_expected_count(0),
            )
            .unwrap();
        assert_eq!(report.state(), UpdateState::NotUpdated);

        let report = factor
            .update_to_store(
                date(2017, 4, 28),
                &UpdateOptions::default().with_max_null_ratio(1.5),
            )
            .unwrap();
        assert_eq!(report.state(), UpdateState::NotUpdated);
    }

    #[test]
    fn test_update_without_store_not_updated() {
        let mut factor = PersistedFactor::new(fixed(&[("A", Some(1.0))]));
        let report = factor
            .update_to_store(date(2017, 4, 28), &UpdateOptions::default())
            .unwrap();
        assert_eq!(report.state(), UpdateState::NotUpdated);
        assert!(!report.is_updated());
        assert!(report.entries().iter().any(|e| e.message.contains("no store")));
    }

    #[test]
    fn test_report_display() {
        let mut report = UpdateReport::new("EP", date(2017, 4, 28));
        report.push(UpdateState::Checking, "checking");
        report.reject("no store configured");
        let text = report.to_string();
        assert!(text.contains("update EP for 2017-04-28: not-updated"));
        assert!(text.contains("no store configured"));
    }

    #[test]
    fn test_normalize_trims_and_parses() {
        let raw = DataFrame::new(vec![
            Series::new("date".into(), vec!["20170428", "20170428"]).into(),
            Series::new("security_id".into(), vec!["000001.SZ  ", " 600000.SH"]).into(),
            Series::new("value".into(), vec![Some(1.5), None]).into(),
        ])
        .unwrap();
        let frame = normalize_stored(&raw, DateRepr::IntDateString).unwrap();
        assert_eq!(frame_dates(&frame).unwrap(), vec![date(2017, 4, 28)]);
        let cs = cross_section(&frame).unwrap();
        assert_eq!(cs["000001.SZ"], Some(1.5));
        assert_eq!(cs["600000.SH"], None);
    }
}
