//! sigcli - command-line definitions from compact signatures.
//!
//! A signature such as `test {name} {--bool} {--A|age=10} {--tags?=*}`
//! declares a command's arguments and options. The library tokenizes argv
//! against it, binds the values (running transform, validate and callback
//! hooks), renders help, dispatches command groups, and maps outcomes to
//! exit codes.

pub mod binder;
pub mod command;
pub mod config;
pub mod definition;
pub mod error;
pub mod executor;
pub mod group;
pub mod help;
pub mod output;
pub mod parser;
pub mod signature;

pub use binder::{Flow, Matches, Termination};
pub use command::{Command, IntoExitCode, Outcome, Parsed, Runnable};
pub use config::{ArgumentConfig, CommandConfig, OptionConfig};
pub use definition::{ArgumentDefinition, ArgumentPatch, OptionDefinition, OptionPatch};
pub use error::{DefinitionError, ExecuteError};
pub use executor::{execute, Exit};
pub use group::GroupCommand;
pub use signature::{parse_signature, Signature};
