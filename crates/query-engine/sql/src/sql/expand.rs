//! List-placeholder expansion.
//!
//! Drivers bind one scalar per placeholder, so a list-valued parameter (typically the
//! right-hand side of an `IN`) is rewritten into one placeholder per element before the
//! query reaches the driver:
//!
//! - `IN (?)` with `[10, 20, 30]` becomes `IN (?, ?, ?)` bound to `10, 20, 30`.
//! - `IN (:foo)` with `{":foo": [10, 20, 30]}` becomes `IN (:foo_0, :foo_1, :foo_2)` bound to
//!   `:foo_0 => 10, :foo_1 => 20, :foo_2 => 30`.
//!
//! An empty list binds a single `NULL` instead, so the statement never contains `IN ()`.
//! Named mode does the same on purpose: `:foo` stays and binds `NULL` rather than collapsing to
//! `IN ()` with the key dropped.

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use super::params::{BoundParams, Param, Params, Query};
use super::scan;
use super::value::Value;

/// Errors produced while expanding list parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("list parameter '{key}' has a numeric key in a named parameter set")]
    MixedParameterStyles { key: String },
    #[error("query has {placeholders} positional placeholders but {params} parameters")]
    PlaceholderCountMismatch { placeholders: usize, params: usize },
    #[error("list parameter '{key}' does not match any placeholder")]
    UnusedListParameter { key: String },
}

/// Expand list-valued parameters into repeated placeholders.
///
/// When no parameter is a list the SQL text is returned unchanged and the parameters are only
/// converted to their bound form.
pub fn expand(sql: &str, params: Params) -> Result<Query, ExpandError> {
    match params {
        Params::Positional(params) => {
            if params.iter().any(Param::is_list) {
                expand_positional(sql, params)
            } else {
                Ok(Query {
                    sql: sql.to_string(),
                    params: BoundParams::Positional(params.into_iter().map(into_scalar).collect()),
                })
            }
        }
        Params::Named(params) => match params.iter().find(|(_, param)| param.is_list()) {
            None => Ok(Query {
                sql: sql.to_string(),
                params: BoundParams::Named(
                    params
                        .into_iter()
                        .map(|(key, param)| (key, into_scalar(param)))
                        .collect(),
                ),
            }),
            Some((key, _)) if is_numeric(key) => {
                Err(ExpandError::MixedParameterStyles { key: key.clone() })
            }
            Some(_) => expand_named(sql, params),
        },
    }
}

/// Integer keys such as `"0"` address positional parameters.
fn is_numeric(key: &str) -> bool {
    key.parse::<i64>().is_ok()
}

fn into_scalar(param: Param) -> Value {
    match param {
        Param::Scalar(value) => value,
        // only reachable when the caller checked there are no lists
        Param::List(_) => Value::Null,
    }
}

fn expand_positional(sql: &str, params: Vec<Param>) -> Result<Query, ExpandError> {
    let fragments = scan::split_positional(sql);
    let placeholders = fragments.len() - 1;
    if placeholders != params.len() {
        return Err(ExpandError::PlaceholderCountMismatch {
            placeholders,
            params: params.len(),
        });
    }

    let mut fragments = fragments.into_iter();
    let mut expanded = String::with_capacity(sql.len());
    expanded.push_str(fragments.next().unwrap_or_default());
    let mut values = Vec::with_capacity(params.len());

    for (param, fragment) in params.into_iter().zip(fragments) {
        match param {
            Param::List(list) if list.is_empty() => {
                expanded.push(scan::POSITIONAL_PLACEHOLDER);
                values.push(Value::Null);
            }
            Param::List(list) => {
                expanded.push_str(&vec!["?"; list.len()].join(", "));
                values.extend(list.values().cloned());
            }
            Param::Scalar(value) => {
                expanded.push(scan::POSITIONAL_PLACEHOLDER);
                values.push(value);
            }
        }
        expanded.push_str(fragment);
    }

    Ok(Query {
        sql: expanded,
        params: BoundParams::Positional(values),
    })
}

fn expand_named(sql: &str, params: IndexMap<String, Param>) -> Result<Query, ExpandError> {
    // identifier -> text substituted for each of its occurrences
    let mut replacements: HashMap<String, Option<String>> = HashMap::new();
    // parameter key -> the bound entries that take its place
    let mut expanded: HashMap<String, Vec<(String, Value)>> = HashMap::new();

    let sql = scan::replace_named(sql, |token| {
        if let Some(replacement) = replacements.get(token.name) {
            return replacement.clone();
        }

        let replacement = resolve_key(&params, token.name).and_then(|key| match &params[key] {
            Param::Scalar(_) => None,
            Param::List(list) if list.is_empty() => {
                expanded.insert(key.to_string(), vec![(key.to_string(), Value::Null)]);
                None
            }
            Param::List(list) => {
                let entries: Vec<(String, Value)> = list
                    .iter()
                    .map(|(subkey, value)| (format!(":{}_{subkey}", token.name), value.clone()))
                    .collect();
                let replacement = entries
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                expanded.insert(key.to_string(), entries);
                Some(replacement)
            }
        });

        replacements.insert(token.name.to_string(), replacement.clone());
        replacement
    });

    let mut bound = IndexMap::with_capacity(params.len());
    for (key, param) in params {
        if let Some(entries) = expanded.remove(&key) {
            bound.extend(entries);
            continue;
        }
        match param {
            Param::Scalar(value) => {
                bound.insert(key, value);
            }
            Param::List(_) => return Err(ExpandError::UnusedListParameter { key }),
        }
    }

    Ok(Query {
        sql,
        params: BoundParams::Named(bound),
    })
}

/// The parameter key a `:name` token refers to: the bare name if present, otherwise the name
/// with its colon.
fn resolve_key<'a>(params: &'a IndexMap<String, Param>, name: &str) -> Option<&'a str> {
    params
        .get_key_value(name)
        .or_else(|| params.get_key_value(format!(":{name}").as_str()))
        .map(|(key, _)| key.as_str())
}
