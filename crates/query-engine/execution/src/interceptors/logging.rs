use query_engine_sql::sql::Query;

use crate::error::Error;
use crate::interceptor::{Execution, Interceptor, Next};

/// Emits one `tracing` event per query once it has finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn intercept(&self, mut next: Next<'_>, query: Query) -> Result<Execution, Error> {
        let sql = query.sql.clone();
        let params = format!("{:?}", query.params);
        let result = next.run(query);

        match &result {
            Ok(execution) => tracing::info!(
                sql = %sql,
                params = %params,
                dsn = %next.session().dsn,
                elapsed_ms = execution.elapsed.as_secs_f64() * 1000.0,
                rows = execution.result.rows.len(),
                rows_affected = execution.rows_affected(),
                "query"
            ),
            Err(err) => tracing::error!(
                meta.signal_type = "log",
                event.domain = crate::EVENT_DOMAIN,
                event.name = "Query failed",
                name = "Query failed",
                body = %err,
                sql = %sql,
                params = %params,
                dsn = %next.session().dsn,
                error = true,
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use query_engine_sql::sql::BoundParams;

    use super::*;
    use crate::driver::{Driver, ResultSet};
    use crate::error::DriverError;
    use crate::interceptor::{InterceptorChain, SessionInfo};

    struct Refusing;

    impl Driver for Refusing {
        fn execute(&mut self, _query: &Query) -> Result<ResultSet, DriverError> {
            Err(DriverError::Database("disk I/O error".to_string()))
        }

        fn last_insert_id(&mut self) -> Result<Option<i64>, DriverError> {
            Ok(None)
        }

        fn close(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[test]
    fn failures_are_logged_and_passed_on() {
        let chain = InterceptorChain::new();
        chain.register_shared(Arc::new(TracingInterceptor));
        let session = SessionInfo {
            destination: None,
            dsn: "refusing:".to_string(),
        };
        let query = Query {
            sql: "DELETE FROM users WHERE id = ?".to_string(),
            params: BoundParams::Positional(vec![1.into()]),
        };

        match chain.execute(&mut Refusing, &session, query) {
            Err(Error::QueryFailed { sql, source }) => {
                assert_eq!(sql, "DELETE FROM users WHERE id = ?");
                assert_eq!(source, DriverError::Database("disk I/O error".to_string()));
            }
            other => panic!("expected a query failure, got {other:?}"),
        }
    }
}
