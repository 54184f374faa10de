//! Logical-to-physical column mapping for factor tables.

use crate::daterepr::DateRepr;
use serde::{Deserialize, Serialize};

/// Maps the logical factor-value columns onto a physical table.
///
/// Backing tables differ in column naming and in how they encode the date
/// key; the rest of the pipeline only ever speaks the logical names
/// `{date, security_id, symbol, value, updated_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorTableSchema {
    /// Physical table (or collection) name.
    pub table: String,
    /// Physical column holding the date key.
    pub date_col: String,
    /// Physical column holding the security identifier.
    pub security_col: String,
    /// Physical column holding the factor symbol.
    pub symbol_col: String,
    /// Physical column holding the factor value.
    pub value_col: String,
    /// Physical column holding the write timestamp.
    pub updated_col: String,
    /// Physical representation of the date key.
    pub date_repr: DateRepr,
}

impl Default for FactorTableSchema {
    fn default() -> Self {
        Self {
            table: "factor_values".to_string(),
            date_col: "date".to_string(),
            security_col: "security_id".to_string(),
            symbol_col: "symbol".to_string(),
            value_col: "value".to_string(),
            updated_col: "updated_at".to_string(),
            date_repr: DateRepr::IsoDate,
        }
    }
}

impl FactorTableSchema {
    /// Default column names against a specific table.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Override the date representation.
    #[must_use]
    pub fn with_date_repr(mut self, repr: DateRepr) -> Self {
        self.date_repr = repr;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema() {
        let schema = FactorTableSchema::default();
        assert_eq!(schema.table, "factor_values");
        assert_eq!(schema.date_col, "date");
        assert_eq!(schema.date_repr, DateRepr::IsoDate);
    }

    #[test]
    fn test_for_table() {
        let schema =
            FactorTableSchema::for_table("monthly_factors").with_date_repr(DateRepr::IntDate);
        assert_eq!(schema.table, "monthly_factors");
        assert_eq!(schema.date_repr, DateRepr::IntDate);
        assert_eq!(schema.value_col, "value");
    }
}
