//! JSON form of a command definition.
//!
//! A config either names its arguments and options explicitly or carries a
//! `signature` string; explicit entries are appended after the signature's.
//! Hooks and actions are code and are attached after loading with
//! [`Command::merge_option`], [`Command::merge_argument`] and
//! [`Command::action`].

use crate::command::Command;
use crate::definition::{ArgumentDefinition, OptionDefinition};
use crate::error::DefinitionError;
use crate::signature::{parse_signature, Signature};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

fn default_help() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Top-level definition of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Command name; overrides the name in `signature` when both are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Signature in `name {arg} {--opt=}` form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Whether `-h, --help` is recognized (default: true)
    #[serde(default = "default_help", skip_serializing_if = "is_true")]
    pub help: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgumentConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionConfig>,
}

/// A positional argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgumentConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A `--name` option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionConfig {
    pub name: String,
    /// Single-character short form, e.g. `"f"` for `-f`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<char>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub array: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub boolean: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl CommandConfig {
    /// Parse a JSON string into a CommandConfig.
    pub fn from_json(json: &str) -> Result<CommandConfig, DefinitionError> {
        let config: CommandConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// A config holding only a signature.
    pub fn from_signature(signature: impl Into<String>) -> Self {
        Self {
            name: None,
            signature: Some(signature.into()),
            description: String::new(),
            help: true,
            args: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Build the command. All definition invariants are checked here.
    pub fn into_command(self) -> Result<Command, DefinitionError> {
        let mut signature = match &self.signature {
            Some(text) => parse_signature(text)?,
            None => Signature {
                name: String::new(),
                arguments: Vec::new(),
                options: Vec::new(),
                description: String::new(),
            },
        };
        if let Some(name) = self.name {
            signature.name = name;
        }
        if signature.name.is_empty() {
            return Err(DefinitionError::MissingName);
        }
        if !self.description.is_empty() {
            signature.description = self.description;
        }

        let mut command = Command::from_signature(signature)?;
        for argument in self.args {
            command.add_argument(argument.into_definition())?;
        }
        for option in self.options {
            command.add_option(option.into_definition())?;
        }
        if !self.help {
            command.remove_help_option();
        }

        debug!(command = %command.name(), "loaded command config");
        Ok(command)
    }

    /// Explicit config describing an existing command.
    pub fn from_command(command: &Command) -> Self {
        Self {
            name: Some(command.name().to_string()),
            signature: None,
            description: command.description().to_string(),
            help: command.has_help_option(),
            args: command.arguments().map(ArgumentConfig::from).collect(),
            options: command.options().iter().map(OptionConfig::from).collect(),
        }
    }
}

impl ArgumentConfig {
    pub fn into_definition(self) -> ArgumentDefinition {
        let mut definition = ArgumentDefinition::new(self.name).description(self.description);
        if self.optional {
            definition = definition.optional();
        }
        if self.array {
            definition = definition.array();
        }
        if let Some(default) = self.default {
            definition = definition.default_value(default);
        }
        definition
    }
}

impl From<&ArgumentDefinition> for ArgumentConfig {
    fn from(definition: &ArgumentDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            optional: definition.optional,
            array: definition.array,
            default: definition.default.clone(),
        }
    }
}

impl OptionConfig {
    pub fn into_definition(self) -> OptionDefinition {
        OptionDefinition {
            flag: self.flag,
            description: self.description,
            optional: self.optional || self.default.is_some(),
            array: self.array,
            boolean: self.boolean,
            default: self.default,
            ..OptionDefinition::new(self.name)
        }
    }
}

impl From<&OptionDefinition> for OptionConfig {
    fn from(definition: &OptionDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            flag: definition.flag,
            description: definition.description.clone(),
            optional: definition.optional,
            array: definition.array,
            boolean: definition.boolean,
            default: definition.default.clone(),
        }
    }
}

impl Command {
    /// The definition model in its JSON config shape, for inspection.
    pub fn to_config(&self) -> CommandConfig {
        CommandConfig::from_command(self)
    }
}
