//! Shell bridge: sourceable scripts built from bound values, help text,
//! terminations and errors.

use crate::binder::{Matches, Termination};
use anyhow::Result;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Heredoc delimiter for help output.
const HELP_DELIMITER: &str = "SIGCLI_HELP";
/// Heredoc delimiter for termination messages.
const MESSAGE_DELIMITER: &str = "SIGCLI_MESSAGE";

/// Default variable prefix.
pub const DEFAULT_PREFIX: &str = "SIGCLI_";

/// Single-quote a string for the shell. Inside single quotes nothing is
/// special, so only `'` itself needs the `'\''` dance.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Upper-case, hyphens to underscores.
fn to_shell_var_name(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}

fn quoted(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    shell_quote(&text)
}

fn assignment(prefix: &str, name: &str, value: &Value) -> String {
    let var_name = format!("{}{}", prefix, to_shell_var_name(name));
    match value {
        // bash cannot export arrays
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(quoted).collect();
            format!("{}=({})", var_name, items.join(" "))
        }
        other => format!("export {}={}", var_name, quoted(other)),
    }
}

/// Assignments for every bound argument, then every bound option, in
/// declaration order.
pub fn render_exports(matches: &Matches, prefix: &str) -> String {
    matches
        .args
        .iter()
        .chain(matches.options.iter())
        .map(|(name, value)| assignment(prefix, name, value) + "\n")
        .collect()
}

/// Write [`render_exports`] to a temporary file and return its path. The
/// file outlives the process so the calling script can source it.
pub fn write_exports(matches: &Matches, prefix: &str) -> Result<PathBuf> {
    write_temp_file(&render_exports(matches, prefix))
}

/// Script that prints the error to stderr and exits 1.
pub fn render_error(message: &str) -> String {
    format!("echo {} >&2\nexit 1\n", shell_quote(&format!("sigcli: {}", message)))
}

pub fn write_error(message: &str) -> Result<PathBuf> {
    write_temp_file(&render_error(message))
}

fn heredoc(delimiter: &str, text: &str, redirect: &str) -> String {
    let newline = if text.ends_with('\n') { "" } else { "\n" };
    format!(
        "cat{redirect} <<'{delimiter}'\n{text}{newline}{delimiter}\n",
        redirect = redirect,
        delimiter = delimiter,
        text = text,
        newline = newline
    )
}

/// Script that prints the help text and exits 0.
pub fn render_help(help_text: &str) -> String {
    heredoc(HELP_DELIMITER, help_text, "") + "exit 0\n"
}

pub fn write_help(help_text: &str) -> Result<PathBuf> {
    write_temp_file(&render_help(help_text))
}

/// Script that prints the termination message, to stdout for exit code 0
/// and to stderr otherwise, and exits with the termination's code.
pub fn render_termination(termination: &Termination) -> String {
    let mut script = String::new();
    if let Some(message) = &termination.message {
        let redirect = if termination.exit_code == 0 { "" } else { " >&2" };
        script.push_str(&heredoc(MESSAGE_DELIMITER, message, redirect));
    }
    script.push_str(&format!("exit {}\n", termination.exit_code.rem_euclid(256)));
    script
}

pub fn write_termination(termination: &Termination) -> Result<PathBuf> {
    write_temp_file(&render_termination(termination))
}

/// Write content to a temporary file and return its path.
fn write_temp_file(content: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    let path = file.into_temp_path().keep()?;
    Ok(path)
}
