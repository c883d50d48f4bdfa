//! Metrics setup and update for query execution.

use prometheus::core::{AtomicI64, AtomicU64, GenericCounter, GenericGauge};
use prometheus::Histogram;

/// The collection of all metrics exposed through the `/metrics` endpoint of a host service.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub query_total: GenericCounter<AtomicU64>,
    pub query_failure_total: GenericCounter<AtomicU64>,
    pub transaction_begin_total: GenericCounter<AtomicU64>,
    pub transaction_commit_total: GenericCounter<AtomicU64>,
    pub transaction_rollback_total: GenericCounter<AtomicU64>,
    pub connections_open: GenericGauge<AtomicI64>,
    pub query_execution_time: Histogram,
}

impl Metrics {
    /// Set up counters, gauges and histograms used to produce Prometheus metrics.
    pub fn initialize(metrics_registry: &mut prometheus::Registry) -> Result<Self, prometheus::Error> {
        let query_total = add_int_counter_metric(
            metrics_registry,
            "querygate_query_total",
            "Total successful queries.",
        )?;

        let query_failure_total = add_int_counter_metric(
            metrics_registry,
            "querygate_query_failure_total",
            "Total queries that failed in the driver or an interceptor.",
        )?;

        let transaction_begin_total = add_int_counter_metric(
            metrics_registry,
            "querygate_transaction_begin_total",
            "Total physical transactions opened.",
        )?;

        let transaction_commit_total = add_int_counter_metric(
            metrics_registry,
            "querygate_transaction_commit_total",
            "Total physical transactions committed.",
        )?;

        let transaction_rollback_total = add_int_counter_metric(
            metrics_registry,
            "querygate_transaction_rollback_total",
            "Total physical transactions rolled back.",
        )?;

        let connections_open = add_int_gauge_metric(
            metrics_registry,
            "querygate_connections_open",
            "The number of cached connections that are currently connected.",
        )?;

        let query_execution_time = add_histogram_metric(
            metrics_registry,
            "querygate_query_execution_time",
            "Time taken by the driver to execute a query, in seconds.",
        )?;

        Ok(Self {
            query_total,
            query_failure_total,
            transaction_begin_total,
            transaction_commit_total,
            transaction_rollback_total,
            connections_open,
            query_execution_time,
        })
    }

    /// Count a transaction boundary statement that reached the database.
    pub fn record_boundary(&self, sql: &str) {
        match sql.trim().to_ascii_uppercase().as_str() {
            "BEGIN" => self.transaction_begin_total.inc(),
            "COMMIT" => self.transaction_commit_total.inc(),
            "ROLLBACK" => self.transaction_rollback_total.inc(),
            _ => {}
        }
    }

    pub fn set_connections_open(&self, count: usize) {
        self.connections_open
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

/// Create a new int counter metric and register it with the provided Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericCounter<AtomicU64>, prometheus::Error> {
    let int_counter =
        prometheus::IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_counter.clone()))?;
    Ok(int_counter)
}

/// Create a new int gauge metric and register it with the provided Prometheus Registry
fn add_int_gauge_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericGauge<AtomicI64>, prometheus::Error> {
    let int_gauge =
        prometheus::IntGauge::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_gauge.clone()))?;
    Ok(int_gauge)
}

/// Create a new histogram metric using the default buckets, and register it with the provided
/// Prometheus Registry.
fn add_histogram_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<Histogram, prometheus::Error> {
    let histogram = Histogram::with_opts(prometheus::HistogramOpts::new(
        metric_name,
        metric_description,
    ))?;
    metrics_registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_metric_once() {
        let mut registry = prometheus::Registry::new();
        let metrics = Metrics::initialize(&mut registry).unwrap();
        metrics.query_total.inc();
        metrics.record_boundary("commit");
        metrics.set_connections_open(2);

        assert_eq!(metrics.transaction_commit_total.get(), 1);
        assert_eq!(metrics.connections_open.get(), 2);
        assert_eq!(registry.gather().len(), 7);
        // a second registration of the same names is refused
        assert!(Metrics::initialize(&mut registry).is_err());
    }
}
