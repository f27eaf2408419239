//! A single command: its definition model, help handling and action.

use crate::binder::{bind, Bound, Matches, Termination};
use crate::definition::{
    ArgumentDefinition, ArgumentPatch, OptionDefinition, OptionPatch, OptionSet,
};
use crate::error::{DefinitionError, ExecuteError};
use crate::help::{render_help, render_usage};
use crate::parser::tokenize;
use crate::signature::{parse_argument, parse_option, parse_signature, Signature};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type Action = Box<dyn Fn(&Matches) -> anyhow::Result<i32> + Send + Sync>;
type HelpWrapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Conversion of an action's return value into a process exit code.
pub trait IntoExitCode {
    fn into_exit_code(self) -> i32;
}

impl IntoExitCode for () {
    fn into_exit_code(self) -> i32 {
        0
    }
}

impl IntoExitCode for i32 {
    fn into_exit_code(self) -> i32 {
        self
    }
}

impl IntoExitCode for bool {
    fn into_exit_code(self) -> i32 {
        i32::from(self)
    }
}

impl IntoExitCode for Option<i32> {
    fn into_exit_code(self) -> i32 {
        self.unwrap_or(0)
    }
}

/// Numeric coercion: null, false and non-numeric values give 0.
impl IntoExitCode for Value {
    fn into_exit_code(self) -> i32 {
        match self {
            Value::Bool(b) => i32::from(b),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(|n| i32::try_from(n).unwrap_or(if n < 0 { i32::MIN } else { i32::MAX }))
                .unwrap_or(0),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| f.trunc() as i32)
                .unwrap_or(0),
            _ => 0,
        }
    }
}

/// How a run ended when nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran and produced this exit code.
    Completed(i32),
    /// Help was requested; the text is to be printed with exit code 0.
    Help(String),
    /// A callback asked to stop early.
    Terminated(Termination),
}

/// Result of [`Command::parse`], before any action runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Help(String),
    Matches(Matches),
    Terminated(Termination),
}

/// Anything that can be executed with an argv: commands and groups.
pub trait Runnable {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn help_text(&self) -> String;
    fn run(&self, argv: &[String]) -> anyhow::Result<Outcome>;
}

#[derive(Clone)]
enum HelpOverride {
    Text(String),
    Wrap(HelpWrapper),
}

pub struct Command {
    name: String,
    description: String,
    arguments: IndexMap<String, ArgumentDefinition>,
    options: OptionSet,
    help: bool,
    help_override: Option<HelpOverride>,
    action: Option<Action>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("arguments", &self.arguments)
            .field("options", &self.options)
            .field("help", &self.help)
            .field("action", &self.action.is_some())
            .finish()
    }
}

impl Command {
    /// Build a command from a signature such as
    /// `test {name} {--A|age=10} description`.
    pub fn new(signature: &str) -> Result<Self, DefinitionError> {
        Self::from_signature(parse_signature(signature)?)
    }

    /// Build a command from an already parsed signature.
    pub fn from_signature(parsed: Signature) -> Result<Self, DefinitionError> {
        let mut command = Command::named(parsed.name);
        command.description = parsed.description;
        for argument in parsed.arguments {
            command.add_argument(argument)?;
        }
        for option in parsed.options {
            command.add_option(option)?;
        }
        Ok(command)
    }

    /// An empty command with the given name, for builder-style definition.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            arguments: IndexMap::new(),
            options: OptionSet::new(),
            help: true,
            help_override: None,
            action: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    /// Arguments in binding order.
    pub fn arguments(&self) -> impl Iterator<Item = &ArgumentDefinition> {
        self.arguments.values()
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.get(name)
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Look up an option by any public spelling (`--age`, `-A`).
    pub fn option(&self, alias: &str) -> Option<&OptionDefinition> {
        self.options.lookup(alias)
    }

    /// Append an argument. Only the last argument may be an array, and no
    /// required scalar may follow an optional one.
    pub fn add_argument(
        &mut self,
        argument: ArgumentDefinition,
    ) -> Result<&mut Self, DefinitionError> {
        let argument = argument.checked()?;
        if self.arguments.contains_key(&argument.name) {
            return Err(DefinitionError::DuplicateArgument(argument.name));
        }
        if argument.array && self.arguments.values().any(|a| a.array) {
            return Err(DefinitionError::SecondArrayArgument(argument.name));
        }
        if let Some(previous) = self.arguments.values().last() {
            let required_scalar = !argument.optional && !argument.array;
            if previous.array || (previous.optional && required_scalar) {
                return Err(DefinitionError::ArgumentAfterOptional {
                    previous: previous.name.clone(),
                    next: argument.name,
                });
            }
        }
        self.arguments.insert(argument.name.clone(), argument);
        Ok(self)
    }

    /// Append an argument from its signature token, e.g. `files?* : inputs`.
    pub fn add_argument_signature(&mut self, signature: &str) -> Result<&mut Self, DefinitionError> {
        self.add_argument(parse_argument(signature)?)
    }

    pub fn add_option(&mut self, option: OptionDefinition) -> Result<&mut Self, DefinitionError> {
        self.options.insert(option)?;
        Ok(self)
    }

    /// Add an option from its signature token, e.g. `--A|age=10 : your age`.
    pub fn add_option_signature(&mut self, signature: &str) -> Result<&mut Self, DefinitionError> {
        self.add_option(parse_option(signature)?)
    }

    /// Patch hooks or description of an existing option. The change is
    /// visible through every alias of the option.
    pub fn merge_option(&mut self, name: &str, patch: OptionPatch) -> Result<&mut Self, DefinitionError> {
        let option = self
            .options
            .get_mut(name)
            .ok_or_else(|| DefinitionError::UnknownOption(name.to_string()))?;
        patch.apply_to(option);
        Ok(self)
    }

    pub fn merge_argument(
        &mut self,
        name: &str,
        patch: ArgumentPatch,
    ) -> Result<&mut Self, DefinitionError> {
        let argument = self
            .arguments
            .get_mut(name)
            .ok_or_else(|| DefinitionError::UnknownArgument(name.to_string()))?;
        patch.apply_to(argument);
        Ok(self)
    }

    /// Set the action run with the bound values.
    pub fn action<F, R>(&mut self, action: F) -> &mut Self
    where
        F: Fn(&Matches) -> anyhow::Result<R> + Send + Sync + 'static,
        R: IntoExitCode,
    {
        self.action = Some(Box::new(move |matches: &Matches| {
            action(matches).map(IntoExitCode::into_exit_code)
        }));
        self
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Stop treating `--help` / `-h` specially.
    pub fn remove_help_option(&mut self) -> &mut Self {
        self.help = false;
        self
    }

    pub fn has_help_option(&self) -> bool {
        self.help
    }

    /// Replace the rendered help text.
    pub fn custom_help(&mut self, text: impl Into<String>) -> &mut Self {
        self.help = true;
        self.help_override = Some(HelpOverride::Text(text.into()));
        self
    }

    /// Post-process the rendered help text.
    pub fn wrap_help<F>(&mut self, wrap: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.help = true;
        self.help_override = Some(HelpOverride::Wrap(Arc::new(wrap)));
        self
    }

    /// Help spellings that are not claimed by a declared option.
    pub fn help_spellings(&self) -> Vec<&'static str> {
        if !self.help {
            return Vec::new();
        }
        ["-h", "--help"]
            .into_iter()
            .filter(|s| !self.options.contains_alias(s))
            .collect()
    }

    pub fn usage(&self) -> String {
        render_usage(self)
    }

    pub fn help_text(&self) -> String {
        match &self.help_override {
            None => render_help(self),
            Some(HelpOverride::Text(text)) => text.clone(),
            Some(HelpOverride::Wrap(wrap)) => wrap(&render_help(self)),
        }
    }

    fn wants_help(&self, argv: &[String]) -> bool {
        let spellings = self.help_spellings();
        argv.iter().any(|arg| spellings.contains(&arg.as_str()))
    }

    /// Tokenize and bind `argv` without running the action.
    pub fn parse(&self, argv: &[String]) -> Result<Parsed, ExecuteError> {
        if self.wants_help(argv) {
            debug!(command = %self.name, "help requested");
            return Ok(Parsed::Help(self.help_text()));
        }

        let raw = tokenize(argv, &self.options)?;
        match bind(raw, self.arguments.values(), &self.options)? {
            Bound::Complete(matches) => Ok(Parsed::Matches(matches)),
            Bound::Terminated(termination) => Ok(Parsed::Terminated(termination)),
        }
    }
}

impl Runnable for Command {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn help_text(&self) -> String {
        Command::help_text(self)
    }

    fn run(&self, argv: &[String]) -> anyhow::Result<Outcome> {
        let action = self
            .action
            .as_ref()
            .ok_or_else(|| DefinitionError::MissingAction(self.name.clone()))?;

        match self.parse(argv)? {
            Parsed::Help(text) => Ok(Outcome::Help(text)),
            Parsed::Terminated(termination) => Ok(Outcome::Terminated(termination)),
            Parsed::Matches(matches) => {
                debug!(command = %self.name, "running action");
                let code = action(&matches)?;
                Ok(Outcome::Completed(code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Flow;
    use serde_json::json;
    use std::sync::Mutex;

    const STANDARD: &str = "test {name} {--bool} {--A|age=10} {--tags?=*} command description";

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn unwrap_matches(parsed: Parsed) -> Matches {
        match parsed {
            Parsed::Matches(matches) => matches,
            other => panic!("Expected Matches, got {:?}", other),
        }
    }

    #[test]
    fn test_check_defines() {
        let mut c = Command::new(STANDARD).unwrap();
        c.add_option(OptionDefinition::new("ext")).unwrap();

        assert_eq!(c.name(), "test");
        assert_eq!(c.description(), "command description");

        let name = c.argument("name").unwrap();
        assert!(!name.array);
        assert!(!name.optional);

        let bool_opt = c.option("--bool").unwrap();
        assert!(bool_opt.optional);
        assert!(bool_opt.boolean);

        let age = c.option("--age").unwrap();
        assert!(age.optional);
        assert!(!age.boolean);
        assert_eq!(age.default, Some(json!("10")));
        let flag = c.option("-A").unwrap();
        assert_eq!(flag.name, "age");
        assert_eq!(flag.default, Some(json!("10")));

        let ext = c.option("--ext").unwrap();
        assert!(!ext.optional);
        assert!(!ext.boolean);
        assert_eq!(ext.default, None);

        let tags = c.option("--tags").unwrap();
        assert!(tags.optional);
        assert!(tags.array);
        assert_eq!(tags.default, Some(json!([])));
    }

    #[test]
    fn test_call_command() {
        let c = Command::new(STANDARD).unwrap();
        let matches = unwrap_matches(c.parse(&args(&["joe", "-A", "20"])).unwrap());
        assert_eq!(matches.arg_str("name"), Some("joe"));
        assert_eq!(matches.option("bool"), Some(&json!(false)));
        assert_eq!(matches.option("age"), Some(&json!("20")));
        assert_eq!(matches.option("tags"), Some(&json!([])));
    }

    #[test]
    fn test_call_command_with_tags() {
        let c = Command::new(STANDARD).unwrap();
        let matches = unwrap_matches(
            c.parse(&args(&["joe", "-A", "20", "--tags", "tag1", "--tags", "tag2"]))
                .unwrap(),
        );
        assert_eq!(matches.values("tags"), vec!["tag1", "tag2"]);
    }

    #[test]
    fn test_call_command_inline_values() {
        let c = Command::new(STANDARD).unwrap();
        let matches =
            unwrap_matches(c.parse(&args(&["joe", "-A=20", "--tags=tag1", "--tags=tag2"])).unwrap());
        assert_eq!(matches.option_str("age"), Some("20"));
        assert_eq!(matches.values("tags"), vec!["tag1", "tag2"]);
    }

    #[test]
    fn test_merge_option_transform() {
        let mut c = Command::new(STANDARD).unwrap();
        c.merge_option(
            "age",
            OptionPatch::new().transform(|v| {
                let n = v
                    .as_str()
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| ExecuteError::rejected("age must be a number"))?;
                Ok(json!(n.trunc() as i64))
            }),
        )
        .unwrap();

        let age = c.option("-A").unwrap();
        assert_eq!(age.name, "age");
        assert_eq!(age.flag, Some('A'));
        assert!(age.optional);
        assert!(age.hooks().has_transform());

        let matches = unwrap_matches(c.parse(&args(&["joe", "-A", "20.11"])).unwrap());
        assert_eq!(matches.option("age"), Some(&json!(20)));
    }

    #[test]
    fn test_merge_option_callback_side_effect() {
        let seen = Arc::new(Mutex::new(json!(1)));
        let sink = seen.clone();
        let mut c = Command::new(STANDARD).unwrap();
        c.merge_option(
            "age",
            OptionPatch::new().callback(move |v| {
                *sink.lock().unwrap() = v.clone();
                Ok(Flow::Continue)
            }),
        )
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), json!(1));
        c.parse(&args(&["joe", "-A", "20"])).unwrap();
        assert_eq!(*seen.lock().unwrap(), json!("20"));
    }

    #[test]
    fn test_merge_option_callback_rejects() {
        let mut c = Command::new(STANDARD).unwrap();
        c.merge_option(
            "age",
            OptionPatch::new().callback(|v| {
                let age: i64 = v.as_str().and_then(|s| s.parse().ok()).unwrap_or(0);
                if age > 10 {
                    Err(ExecuteError::rejected("age should be less than 10"))
                } else {
                    Ok(Flow::Continue)
                }
            }),
        )
        .unwrap();
        c.action(|_| -> anyhow::Result<()> { panic!("action must not run") });

        let err = c.run(&args(&["joe", "-A", "20"])).unwrap_err();
        assert_eq!(err.to_string(), "age should be less than 10");
    }

    #[test]
    fn test_merge_unknown_option() {
        let mut c = Command::new(STANDARD).unwrap();
        let err = c.merge_option("nope", OptionPatch::new()).unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownOption(_)));
    }

    #[test]
    fn test_merge_argument() {
        let mut c = Command::new("count {n}").unwrap();
        c.merge_argument(
            "n",
            ArgumentPatch::new()
                .description("how many")
                .transform(|v| Ok(json!(v.as_str().map(str::len).unwrap_or(0)))),
        )
        .unwrap();
        assert_eq!(c.argument("n").unwrap().description, "how many");
        let matches = unwrap_matches(c.parse(&args(&["abcd"])).unwrap());
        assert_eq!(matches.arg("n"), Some(&json!(4)));
    }

    #[test]
    fn test_duplicate_option_rejected() {
        let err = Command::new("x {--a|all} {--a|any}").unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateOption(ref s) if s == "-a"));
    }

    #[test]
    fn test_duplicate_argument_rejected() {
        let err = Command::new("x {name} {name}").unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateArgument(_)));
    }

    #[test]
    fn test_second_array_argument_rejected() {
        let err = Command::new("x {a*} {b*}").unwrap_err();
        assert!(matches!(err, DefinitionError::SecondArrayArgument(_)));
    }

    #[test]
    fn test_argument_after_array_rejected() {
        let err = Command::new("x {files*} {name?}").unwrap_err();
        assert!(matches!(err, DefinitionError::ArgumentAfterOptional { .. }));
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let err = Command::new("x {name?} {other}").unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::ArgumentAfterOptional { ref previous, ref next }
                if previous == "name" && next == "other"
        ));
        assert!(Command::new("x {a?} {b?}").is_ok());
        assert!(Command::new("x {a?} {rest*}").is_ok());
    }

    #[test]
    fn test_help_short_circuits() {
        let c = Command::new("x {name} {--queue=}").unwrap();
        // required argument and option are both missing, help still wins
        match c.parse(&args(&["--help"])).unwrap() {
            Parsed::Help(text) => assert!(text.starts_with("Usage:\n  x [options] <name>")),
            other => panic!("Expected Help, got {:?}", other),
        }
        assert!(matches!(c.parse(&args(&["-h"])).unwrap(), Parsed::Help(_)));
    }

    #[test]
    fn test_help_removed() {
        let mut c = Command::new("x").unwrap();
        c.remove_help_option();
        let err = c.parse(&args(&["--help"])).unwrap_err();
        assert!(matches!(err, ExecuteError::UnknownOption(_)));
    }

    #[test]
    fn test_help_flag_claimed_by_option() {
        let c = Command::new("serve {--h|host=localhost}").unwrap();
        let matches = unwrap_matches(c.parse(&args(&["-h", "example.org"])).unwrap());
        assert_eq!(matches.option_str("host"), Some("example.org"));
        assert!(matches!(c.parse(&args(&["--help"])).unwrap(), Parsed::Help(_)));
    }

    #[test]
    fn test_custom_help() {
        let mut c = Command::new("x").unwrap();
        c.custom_help("just run it\n");
        assert_eq!(c.help_text(), "just run it\n");

        c.wrap_help(|origin| format!("x 1.0\n\n{}", origin));
        assert!(c.help_text().starts_with("x 1.0\n\nUsage:"));
    }

    #[test]
    fn test_run_without_action() {
        let c = Command::new("x").unwrap();
        let err = c.run(&[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DefinitionError>(),
            Some(DefinitionError::MissingAction(_))
        ));
    }

    #[test]
    fn test_run_exit_code() {
        let mut c = Command::new("x {code}").unwrap();
        c.action(|m| Ok(m.arg("code").cloned().unwrap_or(Value::Null)));
        assert_eq!(c.run(&args(&["3"])).unwrap(), Outcome::Completed(3));
        assert_eq!(c.run(&args(&["abc"])).unwrap(), Outcome::Completed(0));
    }

    #[test]
    fn test_repeated_runs_do_not_leak() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut c = Command::new(STANDARD).unwrap();
        c.action(move |m| {
            sink.lock().unwrap().push(m.clone());
            Ok(())
        });

        c.run(&args(&["joe", "--tags", "a", "--bool"])).unwrap();
        c.run(&args(&["ann"])).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[1].arg_str("name"), Some("ann"));
        assert_eq!(seen[1].option("tags"), Some(&json!([])));
        assert!(!seen[1].flag("bool"));
    }

    #[test]
    fn test_into_exit_code() {
        assert_eq!(().into_exit_code(), 0);
        assert_eq!(7.into_exit_code(), 7);
        assert_eq!(true.into_exit_code(), 1);
        assert_eq!(None::<i32>.into_exit_code(), 0);
        assert_eq!(json!(null).into_exit_code(), 0);
        assert_eq!(json!(false).into_exit_code(), 0);
        assert_eq!(json!(2.9).into_exit_code(), 2);
        assert_eq!(json!("12").into_exit_code(), 12);
        assert_eq!(json!("twelve").into_exit_code(), 0);
        // out-of-range codes saturate instead of wrapping to success
        assert_eq!(json!(4294967296i64).into_exit_code(), i32::MAX);
        assert_eq!(json!(-4294967296i64).into_exit_code(), i32::MIN);
    }
}
