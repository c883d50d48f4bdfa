//! A driver that records what it is asked to do, for tests that care about the statements
//! reaching the database rather than their effect.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use query_engine_execution::driver::{ConnectSettings, Connector, Driver, ResultSet};
use query_engine_execution::error::{DriverError, ResolveError};
use query_engine_execution::DestinationResolver;
use query_engine_sql::sql::{BoundParams, Query};

/// Everything the fake drivers of one test did, shared between the test and the drivers.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Recorded>>,
}

#[derive(Debug, Default)]
struct Recorded {
    statements: Vec<(String, String)>,
    params: Vec<BoundParams>,
    failing: Vec<String>,
    opened: usize,
    closed: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Every statement executed, in order.
    pub fn statements(&self) -> Vec<String> {
        self.with(|recorded| recorded.statements.iter().map(|(_, sql)| sql.clone()).collect())
    }

    /// Statements executed on connections to one dsn.
    pub fn statements_on(&self, dsn: &str) -> Vec<String> {
        self.with(|recorded| {
            recorded
                .statements
                .iter()
                .filter(|(on, _)| on == dsn)
                .map(|(_, sql)| sql.clone())
                .collect()
        })
    }

    /// The parameters of every statement executed, in order.
    pub fn params(&self) -> Vec<BoundParams> {
        self.with(|recorded| recorded.params.clone())
    }

    /// How many times `sql` was executed.
    pub fn count(&self, sql: &str) -> usize {
        self.with(|recorded| recorded.statements.iter().filter(|(_, s)| s == sql).count())
    }

    /// Fail every execution of `sql`.
    pub fn fail_on(&self, sql: &str) {
        self.with(|recorded| recorded.failing.push(sql.to_string()));
    }

    pub fn opened(&self) -> usize {
        self.with(|recorded| recorded.opened)
    }

    pub fn closed(&self) -> usize {
        self.with(|recorded| recorded.closed)
    }
}

/// A driver that logs statements to a [`Recorder`] and returns empty results.
#[derive(Debug)]
pub struct RecordingDriver {
    dsn: String,
    recorder: Recorder,
}

impl RecordingDriver {
    pub fn new(dsn: impl Into<String>, recorder: Recorder) -> Self {
        RecordingDriver {
            dsn: dsn.into(),
            recorder,
        }
    }
}

impl Driver for RecordingDriver {
    fn execute(&mut self, query: &Query) -> Result<ResultSet, DriverError> {
        self.recorder.with(|recorded| {
            recorded
                .statements
                .push((self.dsn.clone(), query.sql.clone()));
            recorded.params.push(query.params.clone());
            if recorded.failing.contains(&query.sql) {
                return Err(DriverError::Database(format!("forced failure: {}", query.sql)));
            }
            Ok(ResultSet::default())
        })
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, DriverError> {
        Ok(None)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.recorder.with(|recorded| recorded.closed += 1);
        Ok(())
    }
}

/// Opens [`RecordingDriver`]s that all report to the same [`Recorder`].
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    pub recorder: Recorder,
}

impl Connector for RecordingConnector {
    fn connect(&self, settings: &ConnectSettings) -> Result<Box<dyn Driver>, DriverError> {
        self.recorder.with(|recorded| recorded.opened += 1);
        Ok(Box::new(RecordingDriver::new(
            settings.dsn.clone(),
            self.recorder.clone(),
        )))
    }
}

/// Resolves destinations from a fixed table of dsns. `None` resolves as `"default"`.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    dsns: BTreeMap<String, String>,
}

impl StaticResolver {
    pub fn new<const N: usize>(destinations: [(&str, &str); N]) -> Self {
        StaticResolver {
            dsns: destinations
                .into_iter()
                .map(|(name, dsn)| (name.to_string(), dsn.to_string()))
                .collect(),
        }
    }
}

impl DestinationResolver for StaticResolver {
    fn resolve(&self, destination: Option<&str>) -> Result<ConnectSettings, ResolveError> {
        let name = destination.unwrap_or("default");
        self.dsns
            .get(name)
            .map(ConnectSettings::new)
            .ok_or_else(|| ResolveError {
                destination: name.to_string(),
                message: "no such destination".to_string(),
            })
    }
}
