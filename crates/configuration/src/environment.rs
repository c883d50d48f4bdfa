//! Where secrets that are not written into the configuration come from.

use std::collections::BTreeMap;

use thiserror::Error;

/// A source of environment variables.
pub trait Environment {
    fn read(&self, variable: &str) -> Result<String, EnvironmentError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    #[error("the environment variable {0} is not set")]
    NonExistentVariable(String),
    #[error("the environment variable {0} is not valid unicode")]
    NotUnicode(String),
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn read(&self, variable: &str) -> Result<String, EnvironmentError> {
        std::env::var(variable).map_err(|err| match err {
            std::env::VarError::NotPresent => {
                EnvironmentError::NonExistentVariable(variable.to_string())
            }
            std::env::VarError::NotUnicode(_) => EnvironmentError::NotUnicode(variable.to_string()),
        })
    }
}

/// A fixed set of variables, for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedEnvironment(BTreeMap<String, String>);

impl<const N: usize> From<[(String, String); N]> for FixedEnvironment {
    fn from(entries: [(String, String); N]) -> Self {
        FixedEnvironment(BTreeMap::from(entries))
    }
}

impl Environment for FixedEnvironment {
    fn read(&self, variable: &str) -> Result<String, EnvironmentError> {
        self.0
            .get(variable)
            .cloned()
            .ok_or_else(|| EnvironmentError::NonExistentVariable(variable.to_string()))
    }
}

impl<E: Environment> Environment for &E {
    fn read(&self, variable: &str) -> Result<String, EnvironmentError> {
        (*self).read(variable)
    }
}
