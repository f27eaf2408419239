//! Argv tokenizer: splits a raw argument vector into option values and
//! positional values according to the known option definitions.

use crate::definition::OptionSet;
use crate::error::ExecuteError;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Raw value recorded for one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// A boolean switch was present.
    Switch,
    /// A non-array option's value.
    Single(String),
    /// Every value of an array option, in encounter order.
    Many(Vec<String>),
}

/// Output of [`tokenize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArgs {
    /// Keyed by canonical option name.
    pub options: HashMap<String, RawValue>,
    pub positionals: Vec<String>,
}

/// Output of [`tokenize_until_command`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTokens {
    pub options: HashMap<String, RawValue>,
    /// First positional token, the candidate sub-command name.
    pub command: Option<String>,
    /// Everything after the sub-command name, untouched.
    pub rest: Vec<String>,
}

/// Tokenize the whole argv.
pub fn tokenize(argv: &[String], options: &OptionSet) -> Result<RawArgs, ExecuteError> {
    let mut tokenizer = Tokenizer::new(options);
    let mut positionals = Vec::new();
    let mut iter = argv.iter();

    while let Some(token) = iter.next() {
        if token.starts_with('-') {
            tokenizer.take_option(token, &mut iter)?;
        } else {
            positionals.push(token.clone());
        }
    }

    debug!(
        options = tokenizer.raw.len(),
        positionals = positionals.len(),
        "tokenized argv"
    );
    Ok(RawArgs {
        options: tokenizer.raw,
        positionals,
    })
}

/// Tokenize group-level options up to the first positional token, which is
/// returned as the sub-command name along with the unparsed remainder.
pub fn tokenize_until_command(
    argv: &[String],
    options: &OptionSet,
) -> Result<GroupTokens, ExecuteError> {
    let mut tokenizer = Tokenizer::new(options);
    let mut iter = argv.iter();

    while let Some(token) = iter.next() {
        if token.starts_with('-') {
            tokenizer.take_option(token, &mut iter)?;
        } else {
            debug!(command = %token, "found sub-command token");
            return Ok(GroupTokens {
                options: tokenizer.raw,
                command: Some(token.clone()),
                rest: iter.as_slice().to_vec(),
            });
        }
    }

    Ok(GroupTokens {
        options: tokenizer.raw,
        command: None,
        rest: Vec::new(),
    })
}

/// Per-call accumulator; dropped when the call returns.
struct Tokenizer<'a> {
    options: &'a OptionSet,
    raw: HashMap<String, RawValue>,
}

impl<'a> Tokenizer<'a> {
    fn new(options: &'a OptionSet) -> Self {
        Self {
            options,
            raw: HashMap::new(),
        }
    }

    fn take_option(
        &mut self,
        token: &str,
        rest: &mut std::slice::Iter<'_, String>,
    ) -> Result<(), ExecuteError> {
        // Check for --option=value format
        let (alias, inline_value) = match token.split_once('=') {
            Some((alias, value)) => (alias, Some(value)),
            None => (token, None),
        };

        let definition = self
            .options
            .lookup(alias)
            .ok_or_else(|| ExecuteError::UnknownOption(token.to_string()))?;
        let name = definition.name.as_str();

        if !definition.array && self.raw.contains_key(name) {
            return Err(ExecuteError::DuplicateOption(token.to_string()));
        }

        if definition.boolean {
            // switches never consume input; an inline value is ignored
            trace!(option = name, "switch");
            self.raw.insert(name.to_string(), RawValue::Switch);
            return Ok(());
        }

        let value = match inline_value {
            Some(v) => v.to_string(),
            None => rest
                .next()
                .ok_or_else(|| ExecuteError::MissingValue(alias.to_string()))?
                .clone(),
        };
        trace!(option = name, value = %value, "value");

        if definition.array {
            match self
                .raw
                .entry(name.to_string())
                .or_insert_with(|| RawValue::Many(Vec::new()))
            {
                RawValue::Many(values) => values.push(value),
                other => *other = RawValue::Many(vec![value]),
            }
        } else {
            self.raw.insert(name.to_string(), RawValue::Single(value));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::parse_option;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn option_set(signatures: &[&str]) -> OptionSet {
        let mut set = OptionSet::new();
        for signature in signatures {
            set.insert(parse_option(signature).unwrap()).unwrap();
        }
        set
    }

    fn standard() -> OptionSet {
        option_set(&["--bool", "--A|age=10", "--tags?=*", "--output="])
    }

    #[test]
    fn test_positionals_in_order() {
        let raw = tokenize(&args(&["a", "b", "c"]), &standard()).unwrap();
        assert_eq!(raw.positionals, args(&["a", "b", "c"]));
        assert!(raw.options.is_empty());
    }

    #[test]
    fn test_option_space_value() {
        let raw = tokenize(&args(&["--output", "file.txt"]), &standard()).unwrap();
        assert_eq!(
            raw.options.get("output"),
            Some(&RawValue::Single("file.txt".to_string()))
        );
    }

    #[test]
    fn test_option_equals_value() {
        let raw = tokenize(&args(&["-A=20"]), &standard()).unwrap();
        assert_eq!(
            raw.options.get("age"),
            Some(&RawValue::Single("20".to_string()))
        );
    }

    #[test]
    fn test_option_equals_empty() {
        let raw = tokenize(&args(&["--output=", "next"]), &standard()).unwrap();
        assert_eq!(
            raw.options.get("output"),
            Some(&RawValue::Single(String::new()))
        );
        assert_eq!(raw.positionals, args(&["next"]));
    }

    #[test]
    fn test_value_split_at_first_equals() {
        let raw = tokenize(&args(&["--output=a=b"]), &standard()).unwrap();
        assert_eq!(
            raw.options.get("output"),
            Some(&RawValue::Single("a=b".to_string()))
        );
    }

    #[test]
    fn test_boolean_does_not_consume() {
        let raw = tokenize(&args(&["--bool", "value1"]), &standard()).unwrap();
        assert_eq!(raw.options.get("bool"), Some(&RawValue::Switch));
        assert_eq!(raw.positionals, args(&["value1"]));
    }

    #[test]
    fn test_boolean_inline_value_ignored() {
        let raw = tokenize(&args(&["--bool=no"]), &standard()).unwrap();
        assert_eq!(raw.options.get("bool"), Some(&RawValue::Switch));
    }

    #[test]
    fn test_array_accumulates_across_aliases() {
        let set = option_set(&["--a|alias=*"]);
        let raw = tokenize(&args(&["-a", "x", "--alias", "y", "-a=z"]), &set).unwrap();
        assert_eq!(
            raw.options.get("alias"),
            Some(&RawValue::Many(args(&["x", "y", "z"])))
        );
    }

    #[test]
    fn test_error_unknown_option() {
        let result = tokenize(&args(&["--unknown"]), &standard());
        assert!(matches!(result, Err(ExecuteError::UnknownOption(ref s)) if s == "--unknown"));
    }

    #[test]
    fn test_error_missing_value() {
        let result = tokenize(&args(&["--output"]), &standard());
        assert!(matches!(result, Err(ExecuteError::MissingValue(ref s)) if s == "--output"));
    }

    #[test]
    fn test_error_duplicate_option() {
        let result = tokenize(&args(&["-A", "1", "--age", "2"]), &standard());
        assert!(matches!(result, Err(ExecuteError::DuplicateOption(ref s)) if s == "--age"));
    }

    #[test]
    fn test_error_duplicate_switch() {
        let result = tokenize(&args(&["--bool", "--bool"]), &standard());
        assert!(matches!(result, Err(ExecuteError::DuplicateOption(_))));
    }

    #[test]
    fn test_value_may_start_with_dash() {
        let raw = tokenize(&args(&["--output", "-"]), &standard()).unwrap();
        assert_eq!(
            raw.options.get("output"),
            Some(&RawValue::Single("-".to_string()))
        );
    }

    #[test]
    fn test_until_command_stops_at_first_positional() {
        let set = option_set(&["--h|help", "--env="]);
        let tokens =
            tokenize_until_command(&args(&["--env", "prod", "deploy", "-x", "--env", "y"]), &set)
                .unwrap();
        assert_eq!(
            tokens.options.get("env"),
            Some(&RawValue::Single("prod".to_string()))
        );
        assert_eq!(tokens.command.as_deref(), Some("deploy"));
        // the remainder is forwarded verbatim, unknown options included
        assert_eq!(tokens.rest, args(&["-x", "--env", "y"]));
    }

    #[test]
    fn test_until_command_without_positional() {
        let set = option_set(&["--h|help"]);
        let tokens = tokenize_until_command(&args(&["-h"]), &set).unwrap();
        assert_eq!(tokens.command, None);
        assert!(tokens.rest.is_empty());
        assert_eq!(tokens.options.get("help"), Some(&RawValue::Switch));
    }

    #[test]
    fn test_fresh_state_each_call() {
        let set = standard();
        tokenize(&args(&["-A", "1"]), &set).unwrap();
        // a second call must not see the first call's -A
        let raw = tokenize(&args(&["-A", "2"]), &set).unwrap();
        assert_eq!(
            raw.options.get("age"),
            Some(&RawValue::Single("2".to_string()))
        );
    }
}
