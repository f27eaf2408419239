//! Definition model: one record per argument or option, plus the alias index
//! that makes every public spelling of an option resolve to the same record.

use crate::binder::Flow;
use crate::error::{DefinitionError, ExecuteError};
use crate::help::HELP_DESCRIPTION;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Converts a bound value into another value. Identity when absent.
pub type Transform = Arc<dyn Fn(Value) -> Result<Value, ExecuteError> + Send + Sync>;
/// Rejects a bound value by returning an error.
pub type Validate = Arc<dyn Fn(&Value) -> Result<(), ExecuteError> + Send + Sync>;
/// Invoked with the final value of an option.
pub type Callback = Arc<dyn Fn(&Value) -> Result<Flow, ExecuteError> + Send + Sync>;

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z][-a-zA-Z0-9_]*$").unwrap())
}

/// Check that `name` is usable as an argument or option name.
pub fn validate_name(name: &str) -> Result<(), DefinitionError> {
    if name_regex().is_match(name) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidName(name.to_string()))
    }
}

/// Transform and validate hooks shared by arguments and options.
#[derive(Clone, Default)]
pub struct Hooks {
    transform: Option<Transform>,
    validate: Option<Validate>,
}

impl Hooks {
    /// Run transform, then validate.
    pub(crate) fn apply(&self, value: Value) -> Result<Value, ExecuteError> {
        let value = match &self.transform {
            Some(transform) => transform(value)?,
            None => value,
        };
        if let Some(validate) = &self.validate {
            validate(&value)?;
        }
        Ok(value)
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    pub fn has_validate(&self) -> bool {
        self.validate.is_some()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("transform", &self.transform.is_some())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// A positional argument.
#[derive(Debug, Clone)]
pub struct ArgumentDefinition {
    pub name: String,
    pub description: String,
    pub optional: bool,
    pub array: bool,
    pub default: Option<Value>,
    pub(crate) hooks: Hooks,
}

impl ArgumentDefinition {
    /// A required scalar argument.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            optional: false,
            array: false,
            default: None,
            hooks: Hooks::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Set a default; an argument with a default is optional.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.optional = true;
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ExecuteError> + Send + Sync + 'static,
    {
        self.hooks.transform = Some(Arc::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ExecuteError> + Send + Sync + 'static,
    {
        self.hooks.validate = Some(Arc::new(f));
        self
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Usage form: `<name>`, `[name]`, `<name...>` or `[name...]`.
    pub fn signature_name(&self) -> String {
        let inner = if self.array {
            format!("{}...", self.name)
        } else {
            self.name.clone()
        };
        if self.optional {
            format!("[{}]", inner)
        } else {
            format!("<{}>", inner)
        }
    }

    pub(crate) fn checked(self) -> Result<Self, DefinitionError> {
        validate_name(&self.name)?;
        if self.array {
            match &self.default {
                None => {}
                Some(Value::Array(items)) if items.is_empty() => {}
                Some(_) => return Err(DefinitionError::ArrayDefault(self.name)),
            }
        }
        Ok(self)
    }
}

/// A `--name` / `-f` option.
#[derive(Clone)]
pub struct OptionDefinition {
    pub name: String,
    pub flag: Option<char>,
    pub description: String,
    pub optional: bool,
    pub array: bool,
    pub boolean: bool,
    pub default: Option<Value>,
    pub(crate) hooks: Hooks,
    pub(crate) callback: Option<Callback>,
}

impl fmt::Debug for OptionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDefinition")
            .field("name", &self.name)
            .field("flag", &self.flag)
            .field("description", &self.description)
            .field("optional", &self.optional)
            .field("array", &self.array)
            .field("boolean", &self.boolean)
            .field("default", &self.default)
            .field("hooks", &self.hooks)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl OptionDefinition {
    /// A required option taking one value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flag: None,
            description: String::new(),
            optional: false,
            array: false,
            boolean: false,
            default: None,
            hooks: Hooks::default(),
            callback: None,
        }
    }

    pub fn flag(mut self, flag: char) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// A switch: never takes a value, optional, defaults to `false`.
    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    /// Set a default; an option with a default is optional.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.optional = true;
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ExecuteError> + Send + Sync + 'static,
    {
        self.hooks.transform = Some(Arc::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ExecuteError> + Send + Sync + 'static,
    {
        self.hooks.validate = Some(Arc::new(f));
        self
    }

    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Flow, ExecuteError> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Display form used in help and errors: `-f, --flag` or `--flag`.
    pub fn signature_name(&self) -> String {
        match self.flag {
            Some(flag) => format!("-{}, --{}", flag, self.name),
            None => format!("--{}", self.name),
        }
    }

    /// Every public spelling, long form first.
    pub fn spellings(&self) -> Vec<String> {
        let mut keys = vec![format!("--{}", self.name)];
        if let Some(flag) = self.flag {
            keys.push(format!("-{}", flag));
        }
        keys
    }

    /// Enforce the cardinality invariants and fill implied defaults.
    pub(crate) fn normalized(mut self) -> Result<Self, DefinitionError> {
        validate_name(&self.name)?;
        if let Some(flag) = self.flag {
            if !flag.is_ascii_alphanumeric() {
                return Err(DefinitionError::InvalidFlag(flag.to_string()));
            }
        }
        if self.boolean {
            if self.array {
                return Err(DefinitionError::BooleanArray(self.name));
            }
            self.optional = true;
            self.default = Some(Value::Bool(false));
        }
        if self.array {
            match self.default.take() {
                None => self.default = Some(Value::Array(Vec::new())),
                Some(Value::Array(items)) if items.is_empty() => {
                    self.default = Some(Value::Array(items));
                }
                Some(_) => return Err(DefinitionError::ArrayDefault(self.name)),
            }
            self.optional = true;
        }
        Ok(self)
    }
}

/// Metadata patch for an existing argument. Name and cardinality are not
/// patchable.
#[derive(Clone, Default)]
pub struct ArgumentPatch {
    description: Option<String>,
    transform: Option<Transform>,
    validate: Option<Validate>,
}

impl ArgumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ExecuteError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ExecuteError> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    pub(crate) fn apply_to(self, definition: &mut ArgumentDefinition) {
        if let Some(description) = self.description {
            definition.description = description;
        }
        if self.transform.is_some() {
            definition.hooks.transform = self.transform;
        }
        if self.validate.is_some() {
            definition.hooks.validate = self.validate;
        }
    }
}

/// Metadata patch for an existing option. Name, flag and cardinality are not
/// patchable.
#[derive(Clone, Default)]
pub struct OptionPatch {
    description: Option<String>,
    transform: Option<Transform>,
    validate: Option<Validate>,
    callback: Option<Callback>,
}

impl OptionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ExecuteError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ExecuteError> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Flow, ExecuteError> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    pub(crate) fn apply_to(self, definition: &mut OptionDefinition) {
        if let Some(description) = self.description {
            definition.description = description;
        }
        if self.transform.is_some() {
            definition.hooks.transform = self.transform;
        }
        if self.validate.is_some() {
            definition.hooks.validate = self.validate;
        }
        if self.callback.is_some() {
            definition.callback = self.callback;
        }
    }
}

/// Options in declaration order, addressable by every public spelling.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    definitions: Vec<OptionDefinition>,
    aliases: HashMap<String, usize>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the `-h, --help` switch.
    pub(crate) fn with_help() -> Self {
        let help = OptionDefinition {
            flag: Some('h'),
            description: HELP_DESCRIPTION.to_string(),
            optional: true,
            boolean: true,
            default: Some(Value::Bool(false)),
            ..OptionDefinition::new("help")
        };
        let mut aliases = HashMap::new();
        for spelling in help.spellings() {
            aliases.insert(spelling, 0);
        }
        Self {
            definitions: vec![help],
            aliases,
        }
    }

    /// Register an option under `--name` and, if present, `-flag`.
    pub fn insert(&mut self, definition: OptionDefinition) -> Result<(), DefinitionError> {
        let definition = definition.normalized()?;
        let spellings = definition.spellings();
        if let Some(taken) = spellings.iter().find(|s| self.aliases.contains_key(*s)) {
            return Err(DefinitionError::DuplicateOption(taken.clone()));
        }

        let index = self.definitions.len();
        self.definitions.push(definition);
        for spelling in spellings {
            self.aliases.insert(spelling, index);
        }
        Ok(())
    }

    /// Resolve a public spelling such as `--age` or `-A`.
    pub fn lookup(&self, alias: &str) -> Option<&OptionDefinition> {
        self.aliases.get(alias).map(|&i| &self.definitions[i])
    }

    /// Resolve a canonical name such as `age`.
    pub fn get(&self, name: &str) -> Option<&OptionDefinition> {
        self.lookup(&format!("--{}", name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut OptionDefinition> {
        let index = *self.aliases.get(&format!("--{}", name))?;
        self.definitions.get_mut(index)
    }

    /// Drop an option by canonical name, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<OptionDefinition> {
        let index = *self.aliases.get(&format!("--{}", name))?;
        let removed = self.definitions.remove(index);
        self.aliases = self
            .definitions
            .iter()
            .enumerate()
            .flat_map(|(i, d)| d.spellings().into_iter().map(move |s| (s, i)))
            .collect();
        Some(removed)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
