//! Binder: turns tokenizer output into the typed value bag handed to an
//! action, applying defaults and the transform, validate and callback hooks.

use crate::definition::{ArgumentDefinition, OptionSet};
use crate::error::ExecuteError;
use crate::parser::{RawArgs, RawValue};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// Request to stop early with an exit code and an optional message, e.g.
/// after printing a version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    pub exit_code: i32,
    pub message: Option<String>,
}

impl Termination {
    pub fn new(exit_code: i32, message: Option<String>) -> Self {
        Self { exit_code, message }
    }

    /// Exit code 0 with a message.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(0, Some(message.into()))
    }
}

/// What an option callback wants to happen next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate(Termination),
}

/// Result of a bind that may have been cut short by a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound<T> {
    Complete(T),
    Terminated(Termination),
}

/// Bound values keyed by argument and option name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Matches {
    pub args: IndexMap<String, Value>,
    pub options: IndexMap<String, Value>,
}

impl Matches {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// String value of an argument, `None` if unset or not a string.
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str)
    }

    /// String value of an option, `None` if unset or not a string.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// Whether a boolean option is set.
    pub fn flag(&self, name: &str) -> bool {
        self.option(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String items of an array argument or option.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.args
            .get(name)
            .or_else(|| self.options.get(name))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

fn raw_to_value(raw: RawValue) -> Value {
    match raw {
        RawValue::Switch => Value::Bool(true),
        RawValue::Single(value) => Value::String(value),
        RawValue::Many(values) => Value::Array(values.into_iter().map(Value::String).collect()),
    }
}

/// Bind positional values to arguments in declaration order.
pub fn bind_arguments<'a, I>(
    positionals: Vec<String>,
    definitions: I,
) -> Result<IndexMap<String, Value>, ExecuteError>
where
    I: IntoIterator<Item = &'a ArgumentDefinition>,
{
    let mut remaining: VecDeque<String> = positionals.into();
    let mut bound = IndexMap::new();

    for definition in definitions {
        let value = if definition.array {
            if remaining.is_empty() {
                if !definition.optional {
                    return Err(ExecuteError::MissingArgument(definition.name.clone()));
                }
                definition
                    .default
                    .clone()
                    .unwrap_or_else(|| Value::Array(Vec::new()))
            } else {
                Value::Array(remaining.drain(..).map(Value::String).collect())
            }
        } else {
            match remaining.pop_front() {
                Some(value) => Value::String(value),
                None => match &definition.default {
                    Some(default) => default.clone(),
                    None if definition.optional => Value::Null,
                    None => return Err(ExecuteError::MissingArgument(definition.name.clone())),
                },
            }
        };

        let value = definition.hooks.apply(value)?;
        bound.insert(definition.name.clone(), value);
    }

    if !remaining.is_empty() {
        trace!(ignored = remaining.len(), "surplus positionals");
    }
    Ok(bound)
}

/// Bind raw option values to every declared option.
pub fn bind_options(
    mut raw: HashMap<String, RawValue>,
    options: &OptionSet,
) -> Result<Bound<IndexMap<String, Value>>, ExecuteError> {
    let mut bound = IndexMap::new();

    for definition in options.iter() {
        let value = match raw.remove(&definition.name) {
            Some(raw_value) => raw_to_value(raw_value),
            None => match &definition.default {
                Some(default) => default.clone(),
                None if definition.optional => Value::Null,
                None => return Err(ExecuteError::MissingOption(definition.signature_name())),
            },
        };

        let value = definition.hooks.apply(value)?;
        if let Some(callback) = &definition.callback {
            if let Flow::Terminate(termination) = callback(&value)? {
                debug!(
                    option = %definition.name,
                    exit_code = termination.exit_code,
                    "option callback requested termination"
                );
                return Ok(Bound::Terminated(termination));
            }
        }
        bound.insert(definition.name.clone(), value);
    }
    Ok(Bound::Complete(bound))
}

/// Bind a full tokenizer output. Options are bound first so that a
/// terminating callback (such as `--version`) wins over missing arguments.
pub fn bind<'a, I>(
    raw: RawArgs,
    arguments: I,
    options: &OptionSet,
) -> Result<Bound<Matches>, ExecuteError>
where
    I: IntoIterator<Item = &'a ArgumentDefinition>,
{
    let options = match bind_options(raw.options, options)? {
        Bound::Complete(options) => options,
        Bound::Terminated(termination) => return Ok(Bound::Terminated(termination)),
    };
    let args = bind_arguments(raw.positionals, arguments)?;
    debug!(args = args.len(), options = options.len(), "bound argv");
    Ok(Bound::Complete(Matches { args, options }))
}
