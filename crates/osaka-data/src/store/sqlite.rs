//! SQLite implementation of the relational store family.
//!
//! This is the reference relational backend: generic query text in,
//! DataFrames out, with table creation on first write. An in-memory
//! variant exists for testing.

use crate::error::Result;
use crate::store::RelationalStore;
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;

/// SQLite-backed relational store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a SQLite database file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }
}

impl RelationalStore for SqliteStore {
    fn run_query(&self, sql: &str) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut cols: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, col) in cols.iter_mut().enumerate() {
                col.push(row.get::<_, Value>(i)?);
            }
        }
        drop(rows);

        let columns: Vec<Column> = names
            .iter()
            .zip(&cols)
            .map(|(name, vals)| value_column(name, vals))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    fn run_delete(&self, sql: &str) -> Result<()> {
        self.conn.execute(sql, [])?;
        Ok(())
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn write_table(&self, df: &DataFrame, table: &str) -> Result<()> {
        let df = normalize_for_write(df)?;

        if !self.has_table(table)? {
            let defs: Vec<String> = df
                .get_columns()
                .iter()
                .map(|c| format!("{} {}", c.name(), sql_type(c.dtype())))
                .collect();
            self.conn.execute(
                &format!("CREATE TABLE IF NOT EXISTS {} ({})", table, defs.join(", ")),
                [],
            )?;
        }

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            names.join(", "),
            placeholders.join(", ")
        );

        let rows = frame_rows(&df)?;
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in &rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

/// Cast non-storable dtypes to something SQLite understands.
fn normalize_for_write(df: &DataFrame) -> Result<DataFrame> {
    let mut lf = df.clone().lazy();
    for c in df.get_columns() {
        match c.dtype() {
            DataType::Date | DataType::Datetime(_, _) => {
                lf = lf.with_column(col(c.name().as_str()).cast(DataType::String));
            }
            DataType::Boolean => {
                lf = lf.with_column(col(c.name().as_str()).cast(DataType::Int64));
            }
            _ => {}
        }
    }
    Ok(lf.collect()?)
}

fn sql_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Float32 | DataType::Float64 => "REAL",
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Boolean => "INTEGER",
        _ => "TEXT",
    }
}

fn value_column(name: &str, vals: &[Value]) -> Column {
    let any_real = vals.iter().any(|v| matches!(v, Value::Real(_)));
    let any_int = vals.iter().any(|v| matches!(v, Value::Integer(_)));

    if any_real {
        let data: Vec<Option<f64>> = vals
            .iter()
            .map(|v| match v {
                Value::Real(f) => Some(*f),
                Value::Integer(i) => Some(*i as f64),
                _ => None,
            })
            .collect();
        Series::new(name.into(), data).into()
    } else if any_int {
        let data: Vec<Option<i64>> = vals
            .iter()
            .map(|v| match v {
                Value::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        Series::new(name.into(), data).into()
    } else {
        let data: Vec<Option<String>> = vals
            .iter()
            .map(|v| match v {
                Value::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        Series::new(name.into(), data).into()
    }
}

fn frame_rows(df: &DataFrame) -> Result<Vec<Vec<Value>>> {
    let mut by_col: Vec<Vec<Value>> = Vec::with_capacity(df.width());
    for c in df.get_columns() {
        let vals: Vec<Value> = match c.dtype() {
            DataType::String => c
                .str()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                .collect(),
            DataType::Float32 | DataType::Float64 => {
                let cast = c.cast(&DataType::Float64)?;
                let ca = cast.f64()?;
                ca.into_iter()
                    .map(|v| v.map_or(Value::Null, Value::Real))
                    .collect()
            }
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => {
                let cast = c.cast(&DataType::Int64)?;
                let ca = cast.i64()?;
                ca.into_iter()
                    .map(|v| v.map_or(Value::Null, Value::Integer))
                    .collect()
            }
            _ => {
                let cast = c.cast(&DataType::String)?;
                let ca = cast.str()?;
                ca.into_iter()
                    .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                    .collect()
            }
        };
        by_col.push(vals);
    }

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(by_col.iter().map(|c| c[i].clone()).collect());
    }
    Ok(rows)
}
