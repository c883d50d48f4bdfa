//! Query execution: connections to a database, the nested transactions they run, and the
//! interceptor chain every query passes through on its way to the driver.
//!
//! A caller asks a [`registry::ConnectionRegistry`] for the connection to a destination and
//! runs queries on it. Each query is expanded (see `query_engine_sql::sql::expand`), handed to
//! the registered interceptors in order, and finally executed by the [`driver::Driver`].

pub mod connection;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod executor;
pub mod interceptor;
pub mod interceptors;
pub mod metrics;
pub mod registry;
pub mod transaction;

/// `event.domain` of the structured error events this crate emits.
pub(crate) const EVENT_DOMAIN: &str = "querygate";

pub use connection::Connection;
pub use error::Error;
pub use registry::{ConnectionRegistry, DestinationResolver};
