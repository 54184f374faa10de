//! Pluggable backing stores for factor values.
//!
//! Two store families exist: relational (SQL text in, tables out) and
//! document (find/delete/insert against a named collection). Both sit
//! behind [`StoreBackend`] so the persistence layer is generic over the
//! family. The store handle is externally owned; osaka never opens or
//! closes connections beyond the injected object.

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use osaka_traits::Date;
use polars::prelude::DataFrame;

/// Store family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// SQL-like store addressed with query text.
    Relational,
    /// Document store addressed with membership queries per collection.
    Document,
}

/// Capability set of a relational (SQL-like) store.
pub trait RelationalStore: std::fmt::Debug {
    /// Run a SELECT and return the result table.
    fn run_query(&self, sql: &str) -> Result<DataFrame>;

    /// Run a DELETE statement.
    fn run_delete(&self, sql: &str) -> Result<()>;

    /// Whether a table exists.
    fn has_table(&self, name: &str) -> Result<bool>;

    /// Append the rows of `df` to `table`, creating the table on first write.
    fn write_table(&self, df: &DataFrame, table: &str) -> Result<()>;
}

/// Capability set of a document store.
///
/// Document rows always use the canonical field names
/// `{symbol, date, security_id, value, updated_at}`; the physical column
/// mapping only applies to relational tables.
pub trait DocumentStore: std::fmt::Debug {
    /// Rows of `collection` matching the symbol and any of the dates.
    ///
    /// Returns a table with columns `{date (String, ISO), security_id, value}`.
    fn find(&self, collection: &str, symbol: &str, dates: &[Date]) -> Result<DataFrame>;

    /// Delete all rows of `collection` matching (symbol, date).
    fn delete(&self, collection: &str, symbol: &str, date: Date) -> Result<()>;

    /// Insert rows into `collection`.
    ///
    /// Expects columns `{symbol, date (String, ISO), security_id, value, updated_at}`.
    fn insert(&self, collection: &str, df: &DataFrame) -> Result<()>;

    /// Whether a collection exists.
    fn has_collection(&self, name: &str) -> Result<bool>;
}

/// A configured backing store, tagged by family.
#[derive(Debug)]
pub enum StoreBackend {
    /// Relational family.
    Relational(Box<dyn RelationalStore>),
    /// Document family.
    Document(Box<dyn DocumentStore>),
}

impl StoreBackend {
    /// Family tag of this backend.
    pub const fn kind(&self) -> StoreKind {
        match self {
            Self::Relational(_) => StoreKind::Relational,
            Self::Document(_) => StoreKind::Document,
        }
    }
}
