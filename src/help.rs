//! Help text rendering for commands and command groups.
//!
//! Output is plain text; styling is left to the caller.

use crate::command::Command;
use crate::definition::{OptionDefinition, OptionSet};
use crate::group::GroupCommand;
use serde_json::Value;

/// Column at which descriptions start.
pub const HELP_COLUMN: usize = 30;

/// Description shown for the built-in help switch.
pub const HELP_DESCRIPTION: &str = "Display this help message";

fn entry(left: &str, description: &str) -> String {
    let line = if left.len() < HELP_COLUMN {
        format!("  {:<width$}{}", left, description, width = HELP_COLUMN)
    } else {
        format!("  {}  {}", left, description)
    };
    line.trim_end().to_string()
}

fn default_suffix(option: &OptionDefinition) -> String {
    if option.boolean || option.array {
        return String::new();
    }
    match &option.default {
        Some(Value::String(s)) if !s.is_empty() => format!("[={}]", s),
        Some(Value::Null) | Some(Value::String(_)) | None => String::new(),
        Some(other) => format!("[={}]", other),
    }
}

fn option_entry(option: &OptionDefinition) -> String {
    let left = format!("{}{}", option.signature_name(), default_suffix(option));
    if option.array {
        let description = if option.description.is_empty() {
            "(multiple values allowed)".to_string()
        } else {
            format!("{} (multiple values allowed)", option.description)
        };
        entry(&left, &description)
    } else {
        entry(&left, &option.description)
    }
}

fn option_lines(options: &OptionSet) -> Vec<String> {
    options.iter().map(option_entry).collect()
}

fn section(title: &str, lines: &[String]) -> String {
    format!("{}:\n{}", title, lines.join("\n"))
}

/// Usage line: `name [options] <arg> [opt] [rest...]`.
pub fn render_usage(command: &Command) -> String {
    let mut parts = vec![command.name().to_string()];
    if !command.options().is_empty() || !command.help_spellings().is_empty() {
        parts.push("[options]".to_string());
    }
    parts.extend(command.arguments().map(|a| a.signature_name()));
    parts.join(" ")
}

/// Full help text for a command.
pub fn render_help(command: &Command) -> String {
    let mut sections = vec![section("Usage", &[format!("  {}", render_usage(command))])];

    let arguments: Vec<String> = command
        .arguments()
        .map(|a| entry(&a.signature_name(), &a.description))
        .collect();
    if !arguments.is_empty() {
        sections.push(section("Arguments", &arguments));
    }

    let mut options = option_lines(command.options());
    let help = command.help_spellings();
    if !help.is_empty() {
        options.push(entry(&help.join(", "), HELP_DESCRIPTION));
    }
    if !options.is_empty() {
        sections.push(section("Options", &options));
    }

    if !command.description().is_empty() {
        sections.push(section(
            "Description",
            &[format!("  {}", command.description())],
        ));
    }

    sections.join("\n\n") + "\n"
}

/// Full help text for a group: its own options and the available commands.
pub fn render_group_help(group: &GroupCommand) -> String {
    let mut usage = vec![group.name().to_string()];
    if !group.options().is_empty() {
        usage.push("[options]".to_string());
    }
    usage.push("<command> [args...]".to_string());
    let mut sections = vec![section("Usage", &[format!("  {}", usage.join(" "))])];

    let options = option_lines(group.options());
    if !options.is_empty() {
        sections.push(section("Options", &options));
    }

    let commands: Vec<String> = group
        .commands()
        .map(|command| entry(command.name(), command.description()))
        .collect();
    if !commands.is_empty() {
        sections.push(section("Available commands", &commands));
    }

    if !group.description().is_empty() {
        sections.push(section(
            "Description",
            &[format!("  {}", group.description())],
        ));
    }

    sections.join("\n\n") + "\n"
}
