//! Version 1 of the configuration file format.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::configuration::{Configuration, ResolvedDestination, DEFAULT_DESTINATION};
use crate::environment::Environment;
use crate::error::{
    MakeRuntimeConfigurationError, ParseConfigurationError, WriteParsedConfigurationError,
};
use crate::values::{ConnectionUri, Secret};

pub const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";
pub const DEFAULT_DSN_VARIABLE: &str = "QUERYGATE_DSN";

/// The configuration file as written by a user.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    /// Which version of the configuration format are we using
    pub version: u32,
    /// Path to the JSON schema of this file, for editors.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Named databases. The one named `default` is used when no destination is given.
    pub destinations: BTreeMap<String, DestinationSettings>,
}

/// How to connect to one destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSettings {
    pub dsn: ConnectionUri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    /// Options passed to the driver untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub driver_options: BTreeMap<String, String>,
}

impl ParsedConfiguration {
    /// A configuration whose default destination reads its dsn from `QUERYGATE_DSN`.
    pub fn initial() -> Self {
        ParsedConfiguration {
            version: CURRENT_VERSION,
            schema: Some(CONFIGURATION_JSONSCHEMA_FILENAME.to_string()),
            destinations: BTreeMap::from([(
                DEFAULT_DESTINATION.to_string(),
                DestinationSettings {
                    dsn: ConnectionUri(Secret::from_environment(DEFAULT_DSN_VARIABLE)),
                    username: None,
                    password: None,
                    driver_options: BTreeMap::new(),
                },
            )]),
        }
    }
}

/// Parse the configuration format from a directory.
pub fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents = fs::read_to_string(&configuration_file).map_err(|err| {
        ParseConfigurationError::IoErrorButStringified(format!(
            "{}: {}",
            &configuration_file.display(),
            err
        ))
    })?;

    let parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    if parsed_config.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion(
            parsed_config.version,
        ));
    }

    Ok(parsed_config)
}

/// Write the parsed configuration and its JSON schema into a directory on disk.
pub fn write_parsed_configuration(
    parsed_config: &ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref())?;

    fs::write(
        configuration_file,
        serde_json::to_string_pretty(parsed_config)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )?;

    let configuration_jsonschema_file_path =
        out_dir.as_ref().join(CONFIGURATION_JSONSCHEMA_FILENAME);
    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )?;

    Ok(())
}

/// Resolve every secret of the configuration against the environment.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    if !parsed_config.destinations.contains_key(DEFAULT_DESTINATION) {
        return Err(MakeRuntimeConfigurationError::NoDefaultDestination(
            DEFAULT_DESTINATION,
        ));
    }

    let mut destinations = BTreeMap::new();
    for (name, settings) in parsed_config.destinations {
        let resolve = |secret: &Secret| {
            secret
                .resolve(&environment)
                .map(std::borrow::Cow::into_owned)
                .map_err(|source| MakeRuntimeConfigurationError::MissingEnvironmentVariable {
                    destination: name.clone(),
                    source,
                })
        };
        let resolved = ResolvedDestination {
            dsn: resolve(&settings.dsn.0)?,
            username: settings.username.as_ref().map(resolve).transpose()?,
            password: settings.password.as_ref().map(resolve).transpose()?,
            driver_options: settings.driver_options,
        };
        destinations.insert(name, resolved);
    }

    Ok(Configuration { destinations })
}
