use query_engine_sql::sql::Query;

use crate::error::Error;
use crate::interceptor::{Execution, Interceptor, Next};
use crate::metrics::Metrics;

/// Counts queries and transaction boundaries, and observes driver time.
#[derive(Debug, Clone)]
pub struct MetricsInterceptor {
    metrics: Metrics,
}

impl MetricsInterceptor {
    pub fn new(metrics: Metrics) -> Self {
        MetricsInterceptor { metrics }
    }
}

impl Interceptor for MetricsInterceptor {
    fn intercept(&self, mut next: Next<'_>, query: Query) -> Result<Execution, Error> {
        let sql = query.sql.clone();
        let result = next.run(query);
        match &result {
            Ok(execution) => {
                self.metrics.query_total.inc();
                self.metrics.record_boundary(&sql);
                self.metrics
                    .query_execution_time
                    .observe(execution.elapsed.as_secs_f64());
            }
            Err(_) => self.metrics.query_failure_total.inc(),
        }
        result
    }
}
