//! Helpers for building simple statements from table and column mappings.

use indexmap::IndexMap;
use thiserror::Error;

use super::params::Params;
use super::value::Value;

/// Column name to value, in the order the columns should appear in the statement.
pub type Record = IndexMap<String, Value>;

/// A statement produced by one of the helpers, not yet expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no columns given for {0}")]
    NoColumns(&'static str),
    #[error("refusing to build an UPDATE of {0} without a WHERE clause")]
    NoWhere(String),
}

/// `LIMIT` clause of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// `LIMIT count`
    Rows(u64),
    /// `LIMIT offset, count`
    Range { offset: u64, count: u64 },
}

/// Optional clauses of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Expression list after `SELECT`. Defaults to `*`.
    pub select_expr: Option<String>,
    /// Expression after `ORDER BY`.
    pub order: Option<String>,
    pub limit: Option<Limit>,
}

/// `INSERT INTO table (a, b) VALUES (?, ?)`
pub fn insert(table: &str, record: &Record) -> Result<Statement, BuildError> {
    into_statement("INSERT", table, record)
}

/// `REPLACE INTO table (a, b) VALUES (?, ?)`
pub fn replace(table: &str, record: &Record) -> Result<Statement, BuildError> {
    into_statement("REPLACE", table, record)
}

fn into_statement(verb: &'static str, table: &str, record: &Record) -> Result<Statement, BuildError> {
    if record.is_empty() {
        return Err(BuildError::NoColumns(verb));
    }
    let columns = record.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; record.len()].join(", ");
    Ok(Statement {
        sql: format!("{verb} INTO {table} ({columns}) VALUES ({placeholders})"),
        params: Params::values(record.values().cloned()),
    })
}

/// `UPDATE table SET a = ?, b = ? WHERE x = ? AND y = ?`
pub fn update(table: &str, set: &Record, filter: &Record) -> Result<Statement, BuildError> {
    if set.is_empty() {
        return Err(BuildError::NoColumns("UPDATE"));
    }
    if filter.is_empty() {
        return Err(BuildError::NoWhere(table.to_string()));
    }
    let pairs = set
        .keys()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let conditions = filter
        .keys()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");

    Ok(Statement {
        sql: format!("UPDATE {table} SET {pairs} WHERE {conditions}"),
        params: Params::values(set.values().chain(filter.values()).cloned()),
    })
}

/// `SELECT <select_expr> FROM table WHERE <condition> [ORDER BY ..] [LIMIT ..]`
///
/// The condition and its parameters are passed through untouched, so list parameters are
/// expanded when the statement is executed.
pub fn search(table: &str, condition: &str, params: Params, options: &SearchOptions) -> Statement {
    let select_expr = options.select_expr.as_deref().unwrap_or("*");
    let mut sql = format!("SELECT {select_expr} FROM {table} WHERE {condition}");

    if let Some(order) = &options.order {
        sql.push_str(&format!(" ORDER BY {order}"));
    }
    match options.limit {
        None => {}
        Some(Limit::Rows(count)) => sql.push_str(&format!(" LIMIT {count}")),
        Some(Limit::Range { offset, count }) => {
            sql.push_str(&format!(" LIMIT {offset}, {count}"));
        }
    }

    Statement { sql, params }
}
