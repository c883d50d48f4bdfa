//! querygate over SQLite: a driver built on sqlx, destinations read from the configuration
//! file, and the state the `querygate` binary runs with.

pub mod driver;
pub mod health;
pub mod resolver;
pub mod state;

pub use driver::{SqliteConnector, SqliteDriver};
pub use resolver::ConfigurationResolver;
