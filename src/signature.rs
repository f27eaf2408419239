//! Signature grammar.
//!
//! A signature declares a command in one string:
//!
//! ```text
//! test {name} {files?*} {--bool} {--A|age=10 : your age} {--tags?=*} free text description
//! ```
//!
//! Braced tokens starting with `-` are options, other braced tokens are
//! arguments. The first word before any brace is the command name and the
//! remaining text is the description. `{{` and `}}` are literal braces.

use crate::definition::{validate_name, ArgumentDefinition, OptionDefinition};
use crate::error::DefinitionError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const OPEN_ESCAPE: char = '\u{E000}';
const CLOSE_ESCAPE: char = '\u{E001}';

/// Result of parsing a full command signature.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    pub arguments: Vec<ArgumentDefinition>,
    pub options: Vec<OptionDefinition>,
    pub description: String,
}

fn command_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([a-zA-Z][-a-zA-Z0-9:_]*)").unwrap())
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^}]*)\}").unwrap())
}

fn argument_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z][-a-zA-Z0-9_]*)(\?)?(\*)?(?:=(.*))?$").unwrap())
}

fn option_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^--(?:([^|=?\s]+)\|)?([^|=?\s]+)(\?)?(?:=(.*))?$").unwrap())
}

fn escape_braces(text: &str) -> String {
    text.replace("{{", &OPEN_ESCAPE.to_string())
        .replace("}}", &CLOSE_ESCAPE.to_string())
}

fn restore_braces(text: &str) -> String {
    text.replace(OPEN_ESCAPE, "{").replace(CLOSE_ESCAPE, "}")
}

/// Split `expression : description`.
fn split_description(token: &str) -> (&str, String) {
    match token.split_once(" : ") {
        Some((expression, description)) => {
            (expression.trim(), restore_braces(description.trim()))
        }
        None => (token.trim(), String::new()),
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parse a full signature into name, arguments, options and description.
pub fn parse_signature(signature: &str) -> Result<Signature, DefinitionError> {
    let escaped = escape_braces(signature);

    let head = escaped.split('{').next().unwrap_or_default();
    let name = command_name_regex()
        .captures(head)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DefinitionError::MalformedSignature {
            kind: "command",
            signature: signature.to_string(),
        })?;

    let mut arguments = Vec::new();
    let mut options = Vec::new();
    for caps in token_regex().captures_iter(&escaped) {
        let token = caps[1].trim();
        if token.starts_with('-') {
            options.push(parse_option(token)?);
        } else {
            arguments.push(parse_argument(token)?);
        }
    }

    let rest = token_regex().replace_all(&escaped, "");
    let rest = command_name_regex().replace(&rest, "");
    let description = restore_braces(rest.trim());

    Ok(Signature {
        name,
        arguments,
        options,
        description,
    })
}

/// Parse one argument token (the text between the braces).
///
/// `name`, `name?`, `name*`, `name?*`, `name=default`, `name=*`, each
/// optionally followed by ` : description`.
pub fn parse_argument(token: &str) -> Result<ArgumentDefinition, DefinitionError> {
    let escaped = escape_braces(token);
    let (expression, description) = split_description(&escaped);
    let malformed = || DefinitionError::MalformedSignature {
        kind: "argument",
        signature: token.to_string(),
    };
    let caps = argument_regex().captures(expression).ok_or_else(malformed)?;

    let mut definition = ArgumentDefinition::new(&caps[1]).description(description);
    definition.optional = caps.get(2).is_some();
    let starred = caps.get(3).is_some();
    let payload = caps.get(4).map(|m| m.as_str());

    match (starred, payload) {
        (true, Some(_)) => return Err(malformed()),
        (true, None) | (false, Some("*")) => definition.array = true,
        (false, Some("")) | (false, None) => {}
        (false, Some(value)) => {
            definition.optional = true;
            definition.default = Some(Value::String(restore_braces(unquote(value))));
        }
    }
    Ok(definition)
}

/// Parse one option token (the text between the braces).
///
/// `--name`, `--f|name`, then optional `?`, then `=`, `=default` or `=*`,
/// each optionally followed by ` : description`. Without `=` the option is a
/// boolean switch.
pub fn parse_option(token: &str) -> Result<OptionDefinition, DefinitionError> {
    let escaped = escape_braces(token);
    let (expression, description) = split_description(&escaped);
    let caps = option_regex()
        .captures(expression)
        .ok_or_else(|| DefinitionError::MalformedSignature {
            kind: "option",
            signature: token.to_string(),
        })?;

    let name = &caps[2];
    validate_name(name)?;
    let mut definition = OptionDefinition::new(name).description(description);

    if let Some(flag) = caps.get(1) {
        let mut chars = flag.as_str().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => definition.flag = Some(c),
            _ => return Err(DefinitionError::InvalidFlag(flag.as_str().to_string())),
        }
    }

    match caps.get(4).map(|m| m.as_str()) {
        None => definition.boolean = true,
        Some(payload) => {
            definition.optional = caps.get(3).is_some();
            match payload {
                "" => {}
                "*" => {
                    definition.array = true;
                    definition.default = Some(Value::Array(Vec::new()));
                }
                value => {
                    definition.optional = true;
                    definition.default = Some(Value::String(restore_braces(unquote(value))));
                }
            }
        }
    }
    definition.normalized()
}
