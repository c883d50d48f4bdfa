//! Errors raised while executing queries.

use thiserror::Error;

use query_engine_sql::sql::helpers::BuildError;
use query_engine_sql::sql::ExpandError;

/// A failure reported by the database driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("unable to connect: {0}")]
    Connect(String),
    #[error("{0}")]
    Database(String),
    #[error("the driver does not support {0}")]
    Unsupported(String),
}

/// Errors surfaced to callers of a connection.
///
/// Nothing is retried: a caller that wants to retry must re-issue the whole query or
/// transaction.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection was disconnected.
    #[error("Database not connected")]
    NotConnected,
    /// The outermost commit was refused because a nested transaction rolled back.
    #[error("Cannot commit because a nested transaction was rolled back")]
    TransactionIntegrity,
    /// The operation is not allowed while a transaction is open.
    #[error("Cannot disconnect while a transaction is in progress")]
    TransactionState,
    /// The driver failed to execute a statement. `sql` is the statement after expansion.
    #[error("query failed: {sql}: {source}")]
    QueryFailed {
        sql: String,
        #[source]
        source: DriverError,
    },
    /// A result cursor was iterated a second time.
    #[error("Can only iterate a result once")]
    IterationReuse,
    #[error("unable to connect to {dsn}: {source}")]
    Connect {
        dsn: String,
        #[source]
        source: DriverError,
    },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Raised by an interceptor that refuses a query.
    #[error("query rejected by interceptor: {0}")]
    Rejected(String),
}

/// A destination could not be turned into connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to resolve destination '{destination}': {message}")]
pub struct ResolveError {
    pub destination: String,
    pub message: String,
}
