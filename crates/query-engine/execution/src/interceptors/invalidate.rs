use query_engine_sql::sql::{BoundParams, Query, Value};

use super::statement::{write_target, WriteKind};
use crate::error::Error;
use crate::interceptor::{Execution, Interceptor, Next};

/// Calls `invalidate` before every `UPDATE <table>` or `DELETE FROM <table>` runs, with the first
/// bound parameter (typically the key in the `WHERE` clause).
///
/// Whatever cache the callback evicts from is the caller's.
pub struct InvalidateOnWrite<F> {
    table: String,
    invalidate: F,
}

impl<F> InvalidateOnWrite<F>
where
    F: Fn(Option<&Value>) + Send + Sync,
{
    pub fn new(table: impl Into<String>, invalidate: F) -> Self {
        InvalidateOnWrite {
            table: table.into(),
            invalidate,
        }
    }
}

fn first_value(params: &BoundParams) -> Option<&Value> {
    match params {
        BoundParams::Positional(values) => values.first(),
        BoundParams::Named(values) => values.values().next(),
    }
}

impl<F> Interceptor for InvalidateOnWrite<F>
where
    F: Fn(Option<&Value>) + Send + Sync,
{
    fn intercept(&self, mut next: Next<'_>, query: Query) -> Result<Execution, Error> {
        let matches = write_target(&query.sql).is_some_and(|target| {
            target.kind != WriteKind::Insert && target.table.eq_ignore_ascii_case(&self.table)
        });
        if matches {
            (self.invalidate)(first_value(&query.params));
        }
        next.run(query)
    }
}
