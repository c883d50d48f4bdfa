//! A blocking driver for SQLite.
//!
//! sqlx is asynchronous, so every driver owns a current-thread tokio runtime and blocks on it
//! for each call. Do not call into the driver from inside another tokio runtime.

use std::borrow::Cow;
use std::str::FromStr;

use futures::TryStreamExt;
use indexmap::IndexMap;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{
    Column, ConnectOptions, Connection as _, Either, Row as _, Sqlite, TypeInfo, ValueRef,
};
use tokio::runtime::Runtime;

use query_engine_execution::driver::{ConnectSettings, Connector, Driver, ResultSet, Row};
use query_engine_execution::error::DriverError;
use query_engine_sql::sql::scan;
use query_engine_sql::sql::{BoundParams, Query, Value};

/// One SQLite database connection.
pub struct SqliteDriver {
    runtime: Runtime,
    connection: Option<SqliteConnection>,
}

impl SqliteDriver {
    /// Open the database named by `settings.dsn`, e.g. `sqlite::memory:` or
    /// `sqlite://data.db?mode=rwc`. Driver options are applied as pragmas.
    pub fn connect(settings: &ConnectSettings) -> Result<Self, DriverError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| DriverError::Connect(err.to_string()))?;

        let mut options = SqliteConnectOptions::from_str(&settings.dsn)
            .map_err(|err| DriverError::Connect(err.to_string()))?;
        for (key, value) in &settings.options {
            options = options.pragma(
                Cow::<'static, str>::Owned(key.clone()),
                Cow::<'static, str>::Owned(value.clone()),
            );
        }
        if settings.username.is_some() || settings.password.is_some() {
            tracing::debug!(dsn = %settings.dsn, "sqlite ignores username and password");
        }

        let connection = runtime
            .block_on(options.connect())
            .map_err(|err| DriverError::Connect(err.to_string()))?;

        Ok(SqliteDriver {
            runtime,
            connection: Some(connection),
        })
    }

    fn connection(&mut self) -> Result<(&Runtime, &mut SqliteConnection), DriverError> {
        match &mut self.connection {
            Some(connection) => Ok((&self.runtime, connection)),
            None => Err(DriverError::Database("connection is closed".to_string())),
        }
    }
}

impl Driver for SqliteDriver {
    fn execute(&mut self, query: &Query) -> Result<ResultSet, DriverError> {
        let (sql, values) = bind_order(query)?;
        let (runtime, connection) = self.connection()?;

        runtime.block_on(async {
            let statement = values
                .iter()
                .fold(sqlx::query(&sql), |statement, value| bind(statement, value));

            let mut results = statement.fetch_many(&mut *connection);
            let mut rows = vec![];
            let mut rows_affected = 0;
            while let Some(step) = results.try_next().await.map_err(database_error)? {
                match step {
                    Either::Left(done) => rows_affected += done.rows_affected(),
                    Either::Right(row) => rows.push(decode_row(&row)?),
                }
            }

            Ok::<_, DriverError>(ResultSet {
                rows,
                rows_affected,
            })
        })
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, DriverError> {
        let (runtime, connection) = self.connection()?;
        let id: i64 = runtime
            .block_on(sqlx::query_scalar("SELECT last_insert_rowid()").fetch_one(connection))
            .map_err(database_error)?;
        Ok((id != 0).then_some(id))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        match self.connection.take() {
            Some(connection) => self
                .runtime
                .block_on(connection.close())
                .map_err(database_error),
            None => Ok(()),
        }
    }
}

/// Opens [`SqliteDriver`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect(&self, settings: &ConnectSettings) -> Result<Box<dyn Driver>, DriverError> {
        Ok(Box::new(SqliteDriver::connect(settings)?))
    }
}

fn database_error(err: sqlx::Error) -> DriverError {
    DriverError::Database(err.to_string())
}

/// The SQL to prepare and its values in binding order.
///
/// Named placeholders become numbered ones, numbered by first appearance, so that a name used
/// twice binds one value. Names resolve with or without the leading colon.
fn bind_order(query: &Query) -> Result<(Cow<'_, str>, Vec<Value>), DriverError> {
    let named = match &query.params {
        BoundParams::Positional(values) => return Ok((Cow::Borrowed(&query.sql), values.clone())),
        BoundParams::Named(_) => &query.params,
    };

    let mut numbers: IndexMap<String, usize> = IndexMap::new();
    let mut values = vec![];
    let mut missing = vec![];

    let sql = scan::replace_bind_names(&query.sql, |token| {
        if let Some(number) = numbers.get(token.name) {
            return Some(format!("?{number}"));
        }
        match named.get_named(token.name) {
            Some(value) => {
                values.push(value.clone());
                let number = values.len();
                numbers.insert(token.name.to_string(), number);
                Some(format!("?{number}"))
            }
            None => {
                missing.push(token.token());
                None
            }
        }
    });

    if !missing.is_empty() {
        return Err(DriverError::Database(format!(
            "no value bound for {}",
            missing.join(", ")
        )));
    }
    Ok((Cow::Owned(sql), values))
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind<'q>(statement: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => statement.bind(None::<i64>),
        Value::Bool(value) => statement.bind(*value),
        Value::Int(value) => statement.bind(*value),
        Value::Float(value) => statement.bind(*value),
        Value::Text(value) => statement.bind(value.clone()),
        Value::Blob(value) => statement.bind(value.clone()),
    }
}

/// Decode a row by the storage class of each value, not the declared column type.
fn decode_row(row: &SqliteRow) -> Result<Row, DriverError> {
    let mut decoded = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index).map_err(database_error)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => {
                    Value::Int(row.try_get_unchecked(index).map_err(database_error)?)
                }
                "REAL" => Value::Float(row.try_get_unchecked(index).map_err(database_error)?),
                "BLOB" => Value::Blob(row.try_get_unchecked(index).map_err(database_error)?),
                _ => Value::Text(row.try_get_unchecked(index).map_err(database_error)?),
            }
        };
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}
