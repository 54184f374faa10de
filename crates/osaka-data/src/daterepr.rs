//! Date representation codec for backing stores.
//!
//! Factor tables in the wild store their date key in several physical
//! shapes. The codec is the single format/parse pair for all of them;
//! no call site branches on the representation itself.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use osaka_traits::Date;
use serde::{Deserialize, Serialize};

/// Physical representation of the date column in a backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRepr {
    /// `"2017-04-30"`
    IsoDate,
    /// `"2017-04-30 00:00:00"`
    IsoDateTime,
    /// `20170430` stored as an integer
    IntDate,
    /// `"20170430"` stored as a string
    IntDateString,
}

impl DateRepr {
    /// Format a date into its physical representation.
    pub fn format(&self, date: Date) -> String {
        match self {
            Self::IsoDate => date.format("%Y-%m-%d").to_string(),
            Self::IsoDateTime => date.format("%Y-%m-%d 00:00:00").to_string(),
            Self::IntDate | Self::IntDateString => date.format("%Y%m%d").to_string(),
        }
    }

    /// Format a date as a SQL literal (quoted unless the column is numeric).
    pub fn sql_literal(&self, date: Date) -> String {
        match self {
            Self::IntDate => self.format(date),
            _ => format!("'{}'", self.format(date)),
        }
    }

    /// Parse the physical representation back into a date.
    pub fn parse(&self, raw: &str) -> Result<Date> {
        let raw = raw.trim();
        let parsed = match self {
            Self::IsoDate => NaiveDate::parse_from_str(raw, "%Y-%m-%d"),
            Self::IsoDateTime => {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
            }
            Self::IntDate | Self::IntDateString => NaiveDate::parse_from_str(raw, "%Y%m%d"),
        };
        parsed.map_err(|e| DataError::Parse(format!("cannot parse date '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date() -> Date {
        Date::from_ymd_opt(2017, 4, 30).unwrap()
    }

    #[rstest]
    #[case(DateRepr::IsoDate, "2017-04-30")]
    #[case(DateRepr::IsoDateTime, "2017-04-30 00:00:00")]
    #[case(DateRepr::IntDate, "20170430")]
    #[case(DateRepr::IntDateString, "20170430")]
    fn test_format(#[case] repr: DateRepr, #[case] expected: &str) {
        assert_eq!(repr.format(date()), expected);
    }

    #[rstest]
    #[case(DateRepr::IsoDate)]
    #[case(DateRepr::IsoDateTime)]
    #[case(DateRepr::IntDate)]
    #[case(DateRepr::IntDateString)]
    fn test_roundtrip(#[case] repr: DateRepr) {
        let formatted = repr.format(date());
        assert_eq!(repr.parse(&formatted).unwrap(), date());
    }

    #[test]
    fn test_sql_literal_quoting() {
        assert_eq!(DateRepr::IsoDate.sql_literal(date()), "'2017-04-30'");
        assert_eq!(DateRepr::IntDate.sql_literal(date()), "20170430");
        assert_eq!(DateRepr::IntDateString.sql_literal(date()), "'20170430'");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(DateRepr::IsoDate.parse("30/04/2017").is_err());
        assert!(DateRepr::IntDate.parse("not-a-date").is_err());
    }

    #[test]
    fn test_parse_trims_padding() {
        assert_eq!(DateRepr::IsoDate.parse("  2017-04-30  ").unwrap(), date());
    }
}
