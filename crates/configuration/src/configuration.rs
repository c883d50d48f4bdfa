//! Configuration for querygate.

use std::collections::BTreeMap;

use schemars::{gen::SchemaSettings, schema::RootSchema};

use crate::version1::ParsedConfiguration;

/// The destination used when a caller does not name one.
pub const DEFAULT_DESTINATION: &str = "default";

/// The 'Configuration' type collects all the information necessary to open connections at
/// runtime: every secret is resolved.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration'.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub destinations: BTreeMap<String, ResolvedDestination>,
}

/// Connection settings of one destination, secrets included.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    pub dsn: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub driver_options: BTreeMap<String, String>,
}

impl std::fmt::Debug for ResolvedDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedDestination")
            .field("dsn", &self.dsn)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("driver_options", &self.driver_options)
            .finish()
    }
}

impl Configuration {
    /// Settings for a destination; `None` means the default one.
    pub fn destination(&self, name: Option<&str>) -> Option<&ResolvedDestination> {
        self.destinations.get(name.unwrap_or(DEFAULT_DESTINATION))
    }
}

/// Generate the JSON schema of the configuration file.
pub fn generate_latest_schema() -> RootSchema {
    SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<ParsedConfiguration>()
}
