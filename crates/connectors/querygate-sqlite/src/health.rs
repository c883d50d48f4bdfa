//! Health check for a destination.

use query_engine_execution::{Connection, Error};
use query_engine_sql::sql::{Params, Value};

/// Check that the database behind a connection answers queries.
pub fn health_check(connection: &mut Connection) -> Result<(), Error> {
    match connection.value("SELECT 1", Params::none())? {
        Some(Value::Int(1)) => Ok(()),
        other => Err(Error::Rejected(format!(
            "health check returned {other:?} instead of 1"
        ))),
    }
}
