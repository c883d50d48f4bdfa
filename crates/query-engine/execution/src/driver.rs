//! The contract a database driver fulfils.
//!
//! The driver owns the physical connection. It prepares and executes one statement at a time,
//! materialises its rows and reports failures as errors; it never fails silently.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;

use query_engine_sql::sql::{Query, Value};

use crate::error::DriverError;

/// One result row: column name to value, in select-list order.
pub type Row = IndexMap<String, Value>;

/// The outcome of one statement as reported by the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Row>,
    /// Rows inserted, updated or deleted by the statement.
    pub rows_affected: u64,
}

impl ResultSet {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        ResultSet {
            rows,
            rows_affected: 0,
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        ResultSet {
            rows: vec![],
            rows_affected,
        }
    }
}

/// A live connection to one database.
pub trait Driver: Send {
    /// Prepare and execute a statement whose parameters are already expanded.
    fn execute(&mut self, query: &Query) -> Result<ResultSet, DriverError>;

    /// The id generated by the most recent insert, if any.
    fn last_insert_id(&mut self) -> Result<Option<i64>, DriverError>;

    /// Close the physical connection. Called at most once.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// Everything needed to open a connection to a destination.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ConnectSettings {
    pub dsn: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub options: BTreeMap<String, String>,
}

impl ConnectSettings {
    pub fn new(dsn: impl Into<String>) -> Self {
        ConnectSettings {
            dsn: dsn.into(),
            ..ConnectSettings::default()
        }
    }
}

// keep credentials out of logs
impl fmt::Debug for ConnectSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectSettings")
            .field("dsn", &self.dsn)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("options", &self.options)
            .finish()
    }
}

/// Opens drivers.
pub trait Connector {
    fn connect(&self, settings: &ConnectSettings) -> Result<Box<dyn Driver>, DriverError>;
}
