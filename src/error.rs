//! Error types for definition building and argv binding.

use thiserror::Error;

/// Exit code carried by an [`ExecuteError`] unless one is set explicitly.
pub const DEFAULT_EXIT_CODE: i32 = -1;

/// Mistakes made by the author of a command, found while the definition
/// model is being built. These never originate from user-supplied argv.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("unable to determine {kind} name from signature: {signature}")]
    MalformedSignature {
        kind: &'static str,
        signature: String,
    },

    #[error("invalid name '{0}': must match [a-zA-Z][-a-zA-Z0-9_]*")]
    InvalidName(String),

    #[error("invalid flag '{0}': must be a single alphanumeric character")]
    InvalidFlag(String),

    #[error("duplicate option: {0}")]
    DuplicateOption(String),

    #[error("duplicate argument: {0}")]
    DuplicateArgument(String),

    #[error("only one argument can be an array, found a second one: {0}")]
    SecondArrayArgument(String),

    #[error("argument '{next}' cannot follow optional or array argument '{previous}'")]
    ArgumentAfterOptional { previous: String, next: String },

    #[error("option '{0}' cannot be both boolean and array")]
    BooleanArray(String),

    #[error("array option '{0}' can only default to an empty list")]
    ArrayDefault(String),

    #[error("no option named '{0}'")]
    UnknownOption(String),

    #[error("no argument named '{0}'")]
    UnknownArgument(String),

    #[error("duplicate command: {0}")]
    DuplicateCommand(String),

    #[error("command '{0}' has no action bound")]
    MissingAction(String),

    #[error("definition has neither a name nor a signature")]
    MissingName,

    #[error("failed to parse JSON definition: {0}")]
    Json(#[from] serde_json::Error),
}

/// Mistakes in the argv supplied by the end user.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("no value provided for option: {0}")]
    MissingValue(String),

    #[error("duplicate option provided: {0}")]
    DuplicateOption(String),

    #[error("not enough arguments provided for {{{0}}}")]
    MissingArgument(String),

    #[error("missing required option: {0}")]
    MissingOption(String),

    #[error("no command provided")]
    NoCommand,

    #[error("command \"{0}\" is not defined")]
    UnknownCommand(String),

    /// Raised by transform, validate and callback hooks.
    #[error("{message}")]
    Rejected { message: String, exit_code: i32 },
}

impl ExecuteError {
    /// A hook rejection carrying the default exit code.
    pub fn rejected(message: impl Into<String>) -> Self {
        ExecuteError::Rejected {
            message: message.into(),
            exit_code: DEFAULT_EXIT_CODE,
        }
    }

    /// A hook rejection carrying a specific exit code.
    pub fn rejected_with_code(message: impl Into<String>, exit_code: i32) -> Self {
        ExecuteError::Rejected {
            message: message.into(),
            exit_code,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ExecuteError::Rejected { exit_code, .. } => *exit_code,
            _ => DEFAULT_EXIT_CODE,
        }
    }
}
