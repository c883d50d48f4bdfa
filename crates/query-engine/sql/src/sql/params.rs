//! Parameter sets as callers provide them, and as drivers receive them after expansion.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use super::value::Value;

/// The key of one element of a list-valued parameter.
///
/// Lists are not necessarily dense: an element keeps its own key, which becomes the suffix
/// of the generated placeholder when a named parameter is expanded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListKey {
    Index(i64),
    Name(String),
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ListKey::Index(i) => write!(f, "{i}"),
            ListKey::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for ListKey {
    fn from(value: i64) -> Self {
        ListKey::Index(value)
    }
}

impl From<&str> for ListKey {
    fn from(value: &str) -> Self {
        ListKey::Name(value.to_string())
    }
}

impl From<String> for ListKey {
    fn from(value: String) -> Self {
        ListKey::Name(value)
    }
}

/// An ordered, keyed list of scalars. Iteration order is insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamList(Vec<(ListKey, Value)>);

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dense list, keyed `0..n`.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut list = ParamList::new();
        for value in values {
            let index = i64::try_from(list.len()).unwrap_or(i64::MAX);
            list.push(ListKey::Index(index), value);
        }
        list
    }

    /// A list with explicit keys, kept in the given order.
    pub fn keyed<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ListKey>,
        V: Into<Value>,
    {
        ParamList(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn push(&mut self, key: ListKey, value: impl Into<Value>) {
        self.0.push((key, value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ListKey, Value)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, value)| value)
    }
}

/// One parameter: either a scalar bound to a single placeholder, or a list that requests
/// placeholder expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Scalar(Value),
    List(ParamList),
}

impl Param {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Param::Scalar(value.into())
    }

    /// A dense list parameter.
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Param::List(ParamList::from_values(values))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Param::List(_))
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param::Scalar(value)
    }
}

impl From<ParamList> for Param {
    fn from(value: ParamList) -> Self {
        Param::List(value)
    }
}

/// The parameters a caller passes along with a SQL string.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Bound to `?` placeholders in order.
    Positional(Vec<Param>),
    /// Bound to `:name` placeholders. Keys may be given with or without the leading colon.
    Named(IndexMap<String, Param>),
}

impl Default for Params {
    fn default() -> Self {
        Params::none()
    }
}

impl Params {
    pub fn none() -> Self {
        Params::Positional(vec![])
    }

    pub fn positional<I, P>(params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        Params::Positional(params.into_iter().map(Into::into).collect())
    }

    pub fn named<I, K, P>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<Param>,
    {
        Params::Named(
            params
                .into_iter()
                .map(|(key, param)| (key.into(), param.into()))
                .collect(),
        )
    }

    /// Positional scalars, the shape the statement builders produce.
    pub fn values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Params::Positional(
            values
                .into_iter()
                .map(|value| Param::Scalar(value.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Positional(params) => params.len(),
            Params::Named(params) => params.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a parameter set from JSON: an array is positional, an object is named, `null`
    /// means no parameters. Inside either, an array or object value is a list parameter.
    pub fn from_json(json: serde_json::Value) -> Result<Params, ParamsError> {
        match json {
            serde_json::Value::Null => Ok(Params::none()),
            serde_json::Value::Array(items) => Ok(Params::Positional(
                items
                    .into_iter()
                    .map(param_from_json)
                    .collect::<Result<_, _>>()?,
            )),
            serde_json::Value::Object(entries) => Ok(Params::Named(
                entries
                    .into_iter()
                    .map(|(key, value)| Ok((key, param_from_json(value)?)))
                    .collect::<Result<_, ParamsError>>()?,
            )),
            other => Err(ParamsError::NotAParameterSet(other.to_string())),
        }
    }
}

fn param_from_json(json: serde_json::Value) -> Result<Param, ParamsError> {
    match json {
        serde_json::Value::Array(items) => {
            let mut list = ParamList::new();
            for (index, item) in (0_i64..).zip(items) {
                list.push(ListKey::Index(index), scalar_from_json(item)?);
            }
            Ok(Param::List(list))
        }
        serde_json::Value::Object(entries) => {
            let mut list = ParamList::new();
            for (key, item) in entries {
                let key = match key.parse::<i64>() {
                    Ok(index) => ListKey::Index(index),
                    Err(_) => ListKey::Name(key),
                };
                list.push(key, scalar_from_json(item)?);
            }
            Ok(Param::List(list))
        }
        scalar => Ok(Param::Scalar(scalar_from_json(scalar)?)),
    }
}

fn scalar_from_json(json: serde_json::Value) -> Result<Value, ParamsError> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| ParamsError::UnsupportedNumber(n.to_string())),
        },
        serde_json::Value::String(s) => Ok(Value::Text(s)),
        nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            Err(ParamsError::NestedList(nested.to_string()))
        }
    }
}

/// Parameters after expansion: no value is a list any more.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundParams {
    Positional(Vec<Value>),
    Named(IndexMap<String, Value>),
}

impl Default for BoundParams {
    fn default() -> Self {
        BoundParams::Positional(vec![])
    }
}

impl BoundParams {
    pub fn len(&self) -> usize {
        match self {
            BoundParams::Positional(values) => values.len(),
            BoundParams::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at a positional index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            BoundParams::Positional(values) => values.get(index),
            BoundParams::Named(values) => values.get_index(index).map(|(_, value)| value),
        }
    }

    /// Look up a named value the way drivers do: by the bare name first, then with the colon.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        match self {
            BoundParams::Positional(_) => None,
            BoundParams::Named(values) => values
                .get(name)
                .or_else(|| values.get(format!(":{name}").as_str())),
        }
    }
}

/// A query as it is handed to the interceptor chain and the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: BoundParams,
}

impl Query {
    /// A query without parameters, e.g. a transaction boundary.
    pub fn bare(sql: impl Into<String>) -> Self {
        Query {
            sql: sql.into(),
            params: BoundParams::default(),
        }
    }
}

/// Errors converting external input into a parameter set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("parameters must be an array, an object or null, got {0}")]
    NotAParameterSet(String),
    #[error("list parameters may only contain scalars, got {0}")]
    NestedList(String),
    #[error("number {0} cannot be bound")]
    UnsupportedNumber(String),
}
