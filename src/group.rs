//! Command groups: group-level options followed by a sub-command name.

use crate::binder::{bind_options, Bound, Matches};
use crate::command::{Command, IntoExitCode, Outcome, Runnable};
use crate::definition::{OptionDefinition, OptionPatch, OptionSet};
use crate::error::{DefinitionError, ExecuteError};
use crate::help::render_group_help;
use crate::parser::tokenize_until_command;
use crate::signature::parse_option;
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Dispatches to a named sub-command. Groups are [`Runnable`] themselves,
/// so they nest.
pub struct GroupCommand {
    name: String,
    description: String,
    options: OptionSet,
    help: bool,
    commands: IndexMap<String, Box<dyn Runnable>>,
}

impl fmt::Debug for GroupCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCommand")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GroupCommand {
    /// A group with only the `-h, --help` option.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            options: OptionSet::with_help(),
            help: true,
            commands: IndexMap::new(),
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

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn add_option(&mut self, option: OptionDefinition) -> Result<&mut Self, DefinitionError> {
        self.options.insert(option)?;
        Ok(self)
    }

    pub fn add_option_signature(&mut self, signature: &str) -> Result<&mut Self, DefinitionError> {
        self.add_option(parse_option(signature)?)
    }

    pub fn merge_option(&mut self, name: &str, patch: OptionPatch) -> Result<&mut Self, DefinitionError> {
        let option = self
            .options
            .get_mut(name)
            .ok_or_else(|| DefinitionError::UnknownOption(name.to_string()))?;
        patch.apply_to(option);
        Ok(self)
    }

    pub fn remove_help_option(&mut self) -> &mut Self {
        if self.help {
            self.options.remove("help");
            self.help = false;
        }
        self
    }

    pub fn add_command<R>(&mut self, command: R) -> Result<&mut Self, DefinitionError>
    where
        R: Runnable + 'static,
    {
        let name = command.name().to_string();
        if self.commands.contains_key(&name) {
            return Err(DefinitionError::DuplicateCommand(name));
        }
        self.commands.insert(name, Box::new(command));
        Ok(self)
    }

    /// Shorthand for building a [`Command`] from a signature and an action
    /// and adding it.
    pub fn add_signature_command<F, R>(
        &mut self,
        signature: &str,
        action: F,
    ) -> Result<&mut Self, DefinitionError>
    where
        F: Fn(&Matches) -> anyhow::Result<R> + Send + Sync + 'static,
        R: IntoExitCode,
    {
        let mut command = Command::new(signature)?;
        command.action(action);
        self.add_command(command)
    }

    pub fn command(&self, name: &str) -> Option<&dyn Runnable> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    /// Sub-commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &dyn Runnable> {
        self.commands.values().map(|c| c.as_ref())
    }

    pub fn help_text(&self) -> String {
        render_group_help(self)
    }
}

impl Runnable for GroupCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn help_text(&self) -> String {
        render_group_help(self)
    }

    fn run(&self, argv: &[String]) -> anyhow::Result<Outcome> {
        let tokens = tokenize_until_command(argv, &self.options)?;
        if self.help && tokens.options.contains_key("help") {
            debug!(group = %self.name, "help requested");
            return Ok(Outcome::Help(render_group_help(self)));
        }

        if let Bound::Terminated(termination) = bind_options(tokens.options, &self.options)? {
            return Ok(Outcome::Terminated(termination));
        }

        let name = tokens.command.ok_or(ExecuteError::NoCommand)?;
        let command = self
            .commands
            .get(&name)
            .ok_or_else(|| ExecuteError::UnknownCommand(name.clone()))?;

        debug!(group = %self.name, command = %name, forwarded = tokens.rest.len(), "dispatching");
        command.run(&tokens.rest)
    }
}
