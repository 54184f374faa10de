//! In-memory implementation of the document store family.
//!
//! The reference document backend. Collections are plain vectors of rows;
//! suitable for tests and for callers that bring their own document
//! database behind the same trait.

use crate::error::{DataError, Result};
use crate::store::DocumentStore;
use osaka_traits::Date;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

/// One persisted factor-value document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocRow {
    symbol: String,
    date: Date,
    security_id: String,
    value: Option<f64>,
    updated_at: String,
}

/// Document store holding collections in process memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RefCell<HashMap<String, Vec<DocRow>>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find(&self, collection: &str, symbol: &str, dates: &[Date]) -> Result<DataFrame> {
        let collections = self.collections.borrow();
        let rows = collections.get(collection).map_or(&[][..], Vec::as_slice);

        let mut out_dates = Vec::new();
        let mut out_ids = Vec::new();
        let mut out_vals = Vec::new();
        for row in rows {
            if row.symbol == symbol && dates.contains(&row.date) {
                out_dates.push(row.date.to_string());
                out_ids.push(row.security_id.clone());
                out_vals.push(row.value);
            }
        }

        Ok(DataFrame::new(vec![
            Series::new("date".into(), out_dates).into(),
            Series::new("security_id".into(), out_ids).into(),
            Series::new("value".into(), out_vals).into(),
        ])?)
    }

    fn delete(&self, collection: &str, symbol: &str, date: Date) -> Result<()> {
        let mut collections = self.collections.borrow_mut();
        if let Some(rows) = collections.get_mut(collection) {
            rows.retain(|r| !(r.symbol == symbol && r.date == date));
        }
        Ok(())
    }

    fn insert(&self, collection: &str, df: &DataFrame) -> Result<()> {
        let symbols = df.column("symbol")?.str()?.clone();
        let dates = df.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?.clone();
        let ids = df.column("security_id")?.str()?.clone();
        let values = df.column("value")?.cast(&DataType::Float64)?;
        let values = values.f64()?.clone();
        let updated = df.column("updated_at")?.str()?.clone();

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let date_str = dates
                .get(i)
                .ok_or_else(|| DataError::Parse("missing date".to_string()))?;
            rows.push(DocRow {
                symbol: symbols
                    .get(i)
                    .ok_or_else(|| DataError::Parse("missing symbol".to_string()))?
                    .to_string(),
                date: date_str
                    .parse::<Date>()
                    .map_err(|e| DataError::Parse(format!("bad date {}: {}", date_str, e)))?,
                security_id: ids
                    .get(i)
                    .ok_or_else(|| DataError::Parse("missing security_id".to_string()))?
                    .to_string(),
                value: values.get(i),
                updated_at: updated
                    .get(i)
                    .ok_or_else(|| DataError::Parse("missing updated_at".to_string()))?
                    .to_string(),
            });
        }

        self.collections
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
        Ok(())
    }

    fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.borrow().contains_key(name))
    }
}
