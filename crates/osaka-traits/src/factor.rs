//! The factor computation contract and value-frame helpers.
//!
//! Every factor produces a *value frame*: a DataFrame with columns
//! `date` (Date), `security_id` (String) and `value` (nullable Float64).
//! The helpers here build and unpack that shape so concrete factors do
//! not repeat the column plumbing.

use crate::error::Result;
use crate::spec::{CrossSection, Date, FactorSpec};
use polars::prelude::*;

/// A factor that can compute a per-security value for a given date.
///
/// Concrete factors implement [`compute_value`](Self::compute_value);
/// the base implementation returns the empty value frame.
pub trait FactorCompute {
    /// Identity of this factor.
    fn spec(&self) -> &FactorSpec;

    /// Compute the value frame for `date`.
    fn compute_value(&mut self, date: Date) -> Result<DataFrame> {
        let _ = date;
        empty_value_frame()
    }
}

impl<T: FactorCompute + ?Sized> FactorCompute for Box<T> {
    fn spec(&self) -> &FactorSpec {
        (**self).spec()
    }

    fn compute_value(&mut self, date: Date) -> Result<DataFrame> {
        (**self).compute_value(date)
    }
}

/// The empty value frame with the canonical schema.
pub fn empty_value_frame() -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("date".into(), Vec::<String>::new()).into(),
        Series::new("security_id".into(), Vec::<String>::new()).into(),
        Series::new("value".into(), Vec::<Option<f64>>::new()).into(),
    ])?;
    let df = df
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .with_column(col("value").cast(DataType::Float64))
        .collect()?;
    Ok(df)
}

/// Build a value frame for one date from a cross-section.
///
/// Infinite values are mapped to missing; the output never carries ±∞.
pub fn value_frame(date: Date, values: &CrossSection) -> Result<DataFrame> {
    let ids: Vec<String> = values.keys().cloned().collect();
    let vals: Vec<Option<f64>> = values
        .values()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    let dates: Vec<String> = vec![date.to_string(); ids.len()];

    let df = DataFrame::new(vec![
        Series::new("date".into(), dates).into(),
        Series::new("security_id".into(), ids).into(),
        Series::new("value".into(), vals).into(),
    ])?;
    let df = df
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .with_column(col("value").cast(DataType::Float64))
        .collect()?;
    Ok(df)
}

/// Distinct dates present in a value frame, sorted ascending.
pub fn frame_dates(df: &DataFrame) -> Result<Vec<Date>> {
    let dates = df.column("date")?.cast(&DataType::String)?;
    let dates = dates.str()?;
    let mut out: Vec<Date> = Vec::new();
    for s in dates.into_iter().flatten() {
        let d = s
            .parse::<Date>()
            .map_err(|e| crate::FactorError::Computation(format!("bad date {}: {}", s, e)))?;
        if !out.contains(&d) {
            out.push(d);
        }
    }
    out.sort_unstable();
    Ok(out)
}

/// Collapse a value frame into a security → value cross-section.
///
/// Infinite values become missing.
pub fn cross_section(df: &DataFrame) -> Result<CrossSection> {
    let ids = df.column("security_id")?.str()?;
    let vals = df.column("value")?.cast(&DataType::Float64)?;
    let vals = vals.f64()?;

    let mut out = CrossSection::new();
    for (id, v) in ids.into_iter().zip(vals) {
        if let Some(id) = id {
            out.insert(id.to_string(), v.filter(|x| x.is_finite()));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Direction;

    struct NullFactor {
        spec: FactorSpec,
    }

    impl FactorCompute for NullFactor {
        fn spec(&self) -> &FactorSpec {
            &self.spec
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_compute_is_empty() {
        let mut f = NullFactor {
            spec: FactorSpec::new("null", Direction::Long).unwrap(),
        };
        let df = f.compute_value(date(2017, 4, 30)).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.get_column_names(), vec!["date", "security_id", "value"]);
    }

    #[test]
    fn test_value_frame_roundtrip() {
        let mut cs = CrossSection::new();
        cs.insert("000001.SZ".to_string(), Some(0.5));
        cs.insert("600000.SH".to_string(), None);

        let df = value_frame(date(2017, 4, 30), &cs).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(frame_dates(&df).unwrap(), vec![date(2017, 4, 30)]);

        let back = cross_section(&df).unwrap();
        assert_eq!(back, cs);
    }

    #[test]
    fn test_infinities_become_missing() {
        let mut cs = CrossSection::new();
        cs.insert("A".to_string(), Some(f64::INFINITY));
        cs.insert("B".to_string(), Some(f64::NEG_INFINITY));
        cs.insert("C".to_string(), Some(1.0));

        let df = value_frame(date(2020, 1, 2), &cs).unwrap();
        let back = cross_section(&df).unwrap();
        assert_eq!(back["A"], None);
        assert_eq!(back["B"], None);
        assert_eq!(back["C"], Some(1.0));
        assert_eq!(df.column("value").unwrap().null_count(), 2);
    }
}
