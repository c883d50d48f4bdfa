//! The connection cache: one connection per dsn, opened on first use.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::connection::Connection;
use crate::driver::{ConnectSettings, Connector};
use crate::error::{Error, ResolveError};
use crate::interceptor::{Interceptor, InterceptorChain, SessionInfo};

/// Turns a destination name into connection settings. `None` is the default destination.
pub trait DestinationResolver {
    fn resolve(&self, destination: Option<&str>) -> Result<ConnectSettings, ResolveError>;
}

/// Hands out connections to destinations, reusing an open connection for every destination that
/// resolves to the same dsn.
///
/// The registry owns the interceptor chain shared by all of its connections.
pub struct ConnectionRegistry<R, C> {
    resolver: R,
    connector: C,
    interceptors: InterceptorChain,
    connections: BTreeMap<String, Connection>,
}

impl<R: DestinationResolver, C: Connector> ConnectionRegistry<R, C> {
    pub fn new(resolver: R, connector: C) -> Self {
        ConnectionRegistry {
            resolver,
            connector,
            interceptors: InterceptorChain::new(),
            connections: BTreeMap::new(),
        }
    }

    /// The connection for a destination, connecting if there is none yet or the cached one was
    /// disconnected.
    pub fn conn(&mut self, destination: Option<&str>) -> Result<&mut Connection, Error> {
        let settings = self.resolver.resolve(destination)?;

        let reusable = self
            .connections
            .get(&settings.dsn)
            .is_some_and(Connection::is_connected);
        if !reusable {
            let connection = self.connect(destination, &settings)?;
            self.connections.insert(settings.dsn.clone(), connection);
        }

        self.connections
            .get_mut(&settings.dsn)
            .ok_or(Error::NotConnected)
    }

    fn connect(
        &self,
        destination: Option<&str>,
        settings: &ConnectSettings,
    ) -> Result<Connection, Error> {
        tracing::info!(
            destination = destination.unwrap_or("default"),
            dsn = %settings.dsn,
            "connecting"
        );
        let driver = self
            .connector
            .connect(settings)
            .map_err(|source| Error::Connect {
                dsn: settings.dsn.clone(),
                source,
            })?;
        Ok(Connection::new(
            SessionInfo {
                destination: destination.map(str::to_string),
                dsn: settings.dsn.clone(),
            },
            driver,
            self.interceptors.clone(),
        ))
    }

    /// Register an interceptor for every query on every connection of this registry, current
    /// and future.
    pub fn add_interceptor(&self, interceptor: impl Interceptor + 'static) {
        self.interceptors.register(interceptor);
    }

    pub fn add_shared_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.register_shared(interceptor);
    }

    pub fn clear_interceptors(&self) {
        self.interceptors.clear();
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Number of cached connections that are still connected.
    pub fn len(&self) -> usize {
        self.connections
            .values()
            .filter(|connection| connection.is_connected())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disconnect every cached connection, keeping the cache entries. Connections inside a
    /// transaction stay open and the first such failure is returned.
    pub fn disconnect_all(&mut self) -> Result<(), Error> {
        let mut first_error = None;
        for connection in self.connections.values_mut() {
            if let Err(err) = connection.disconnect() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Disconnect and forget every connection. Nothing is dropped if any connection is inside
    /// a transaction.
    pub fn reset(&mut self) -> Result<(), Error> {
        if self
            .connections
            .values()
            .any(|connection| connection.transaction_depth() > 0)
        {
            return Err(Error::TransactionState);
        }
        let result = self.disconnect_all();
        self.connections.clear();
        result
    }
}

impl<R, C> std::fmt::Debug for ConnectionRegistry<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}
