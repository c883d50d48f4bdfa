//! Run one query: expand its parameters, then pass it through the interceptor chain.

use tracing::{info_span, Level};

use query_engine_sql::sql::{self, Params};

use crate::driver::Driver;
use crate::error::Error;
use crate::interceptor::{Execution, InterceptorChain, SessionInfo};

/// Execute a query on a driver.
///
/// The elapsed time in the returned [`Execution`] covers the driver call only, not the
/// interceptors around it.
pub fn execute(
    interceptors: &InterceptorChain,
    driver: &mut (dyn Driver + 'static),
    session: &SessionInfo,
    sql: &str,
    params: Params,
) -> Result<Execution, Error> {
    let query = info_span!("Expand parameters").in_scope(|| sql::expand(sql, params))?;

    if tracing::enabled!(Level::DEBUG) {
        tracing::debug!(
            generated_sql = %query.sql,
            params = ?&query.params,
            dsn = %session.dsn,
        );
    }

    info_span!("Execute query", dsn = %session.dsn)
        .in_scope(|| interceptors.execute(driver, session, query))
}
