use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::environment::{Environment, EnvironmentError};

/// A value given either in the configuration file or through an environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Secret {
    Plain(String),
    #[serde(rename_all = "camelCase")]
    FromEnvironment { variable: String },
}

impl Secret {
    pub fn from_environment(variable: impl Into<String>) -> Self {
        Secret::FromEnvironment {
            variable: variable.into(),
        }
    }

    pub fn resolve(&self, environment: &impl Environment) -> Result<Cow<'_, str>, EnvironmentError> {
        match self {
            Secret::Plain(value) => Ok(Cow::Borrowed(value)),
            Secret::FromEnvironment { variable } => Ok(Cow::Owned(environment.read(variable)?)),
        }
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret::Plain(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}
