//! Destinations resolved from the configuration file.

use query_engine_execution::driver::ConnectSettings;
use query_engine_execution::error::ResolveError;
use query_engine_execution::DestinationResolver;
use querygate_configuration::configuration::DEFAULT_DESTINATION;
use querygate_configuration::Configuration;

/// Resolves destinations against a runtime [`Configuration`].
#[derive(Debug, Clone)]
pub struct ConfigurationResolver {
    configuration: Configuration,
}

impl ConfigurationResolver {
    pub fn new(configuration: Configuration) -> Self {
        ConfigurationResolver { configuration }
    }
}

impl DestinationResolver for ConfigurationResolver {
    fn resolve(&self, destination: Option<&str>) -> Result<ConnectSettings, ResolveError> {
        let resolved =
            self.configuration
                .destination(destination)
                .ok_or_else(|| ResolveError {
                    destination: destination.unwrap_or(DEFAULT_DESTINATION).to_string(),
                    message: "not found in the configuration".to_string(),
                })?;

        Ok(ConnectSettings {
            dsn: resolved.dsn.clone(),
            username: resolved.username.clone(),
            password: resolved.password.clone(),
            options: resolved.driver_options.clone(),
        })
    }
}
