//! Outermost executor: turns the outcome of a run, or the error it raised,
//! into an exit code plus the text destined for stdout and stderr.

use crate::command::{Outcome, Runnable};
use crate::error::{DefinitionError, ExecuteError};
use std::io::{self, Write};
use tracing::debug;

/// Exit code for errors that are neither [`ExecuteError`] nor
/// [`DefinitionError`].
pub const UNCLASSIFIED_EXIT_CODE: i32 = -2;

/// Appended to every usage error.
pub const HELP_HINT: &str = "use --help to get more info";

/// Exit record of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exit {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Exit {
    fn code(code: i32) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// Print the captured streams to the process's stdout and stderr.
    pub fn write_to<O: Write, E: Write>(&self, stdout: &mut O, stderr: &mut E) -> io::Result<()> {
        stdout.write_all(self.stdout.as_bytes())?;
        stderr.write_all(self.stderr.as_bytes())?;
        stdout.flush()?;
        stderr.flush()
    }
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Run `runnable` with `argv` and classify the result.
///
/// Author mistakes ([`DefinitionError`]) are returned as `Err` rather than
/// folded into an exit code.
pub fn execute(runnable: &dyn Runnable, argv: &[String]) -> Result<Exit, DefinitionError> {
    let exit = match runnable.run(argv) {
        Ok(Outcome::Completed(code)) => Exit::code(code),
        Ok(Outcome::Help(text)) => Exit {
            stdout: text,
            ..Exit::code(0)
        },
        Ok(Outcome::Terminated(termination)) => {
            let mut exit = Exit::code(termination.exit_code);
            if let Some(message) = termination.message {
                if termination.exit_code == 0 {
                    exit.stdout = with_newline(message);
                } else {
                    exit.stderr = with_newline(message);
                }
            }
            exit
        }
        Err(err) => match err.downcast::<ExecuteError>() {
            Ok(err) => Exit {
                stderr: format!("error: {}\n{}\n", err, HELP_HINT),
                ..Exit::code(err.exit_code())
            },
            Err(err) => match err.downcast::<DefinitionError>() {
                Ok(err) => return Err(err),
                Err(err) => Exit {
                    stderr: format!("unexpected error: {:#}\n", err),
                    ..Exit::code(UNCLASSIFIED_EXIT_CODE)
                },
            },
        },
    };

    debug!(command = %runnable.name(), code = exit.code, "executed");
    Ok(exit)
}
