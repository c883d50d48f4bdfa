//! Transient state used by querygate.
//!
//! This is initialized on startup.

use thiserror::Error;
use tracing::info_span;

use query_engine_execution::interceptors::{MetricsInterceptor, TracingInterceptor};
use query_engine_execution::metrics;
use query_engine_execution::ConnectionRegistry;
use querygate_configuration::Configuration;

use crate::driver::SqliteConnector;
use crate::resolver::ConfigurationResolver;

pub type Registry = ConnectionRegistry<ConfigurationResolver, SqliteConnector>;

/// State for querygate.
pub struct State {
    pub metrics: metrics::Metrics,
    pub registry: Registry,
}

/// Create the connection registry, with query tracing and metrics installed, and wrap it
/// inside a State.
pub fn create_state(
    configuration: Configuration,
    metrics_registry: &mut prometheus::Registry,
) -> Result<State, InitializationError> {
    let metrics = info_span!("Setup metrics").in_scope(|| {
        metrics::Metrics::initialize(metrics_registry).map_err(InitializationError::MetricsError)
    })?;

    let registry = ConnectionRegistry::new(ConfigurationResolver::new(configuration), SqliteConnector);
    registry.add_interceptor(TracingInterceptor);
    registry.add_interceptor(MetricsInterceptor::new(metrics.clone()));

    Ok(State { metrics, registry })
}

impl State {
    /// Refresh the gauges that are not updated by queries.
    pub fn update_metrics(&self) {
        self.metrics.set_connections_open(self.registry.len());
    }
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("error initializing metrics: {0}")]
    MetricsError(prometheus::Error),
}
