//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::environment::EnvironmentError;

/// The errors that can be thrown when parsing a configuration file.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {0}")]
    UnsupportedVersion(u32),

    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
}

/// The errors that can be thrown when writing a configuration to disk.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when turning a parsed configuration into a runtime one.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("invalid destination '{destination}': {source}")]
    MissingEnvironmentVariable {
        destination: String,
        #[source]
        source: EnvironmentError,
    },
    #[error("the configuration has no '{0}' destination")]
    NoDefaultDestination(&'static str),
}
