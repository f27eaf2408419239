//! sigcli - signature-driven argument parsing for shell scripts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sigcli::output::{write_error, write_exports, write_help, write_termination, DEFAULT_PREFIX};
use sigcli::{Command, CommandConfig, Parsed};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Signature-driven argument parsing for shell scripts.
#[derive(Parser, Debug)]
#[command(name = "sigcli", version, about, disable_help_subcommand = true)]
struct Cli {
    /// Log filter, e.g. `debug` or `sigcli=trace`
    #[arg(long, global = true, env = "SIGCLI_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

/// Where the command definition comes from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Source {
    /// Command signature, e.g. `deploy {target} {--f|force}`
    #[arg(long)]
    signature: Option<String>,

    /// JSON command definition
    #[arg(long)]
    config: Option<String>,
}

impl Source {
    fn load(&self) -> Result<Command> {
        let config = match (&self.signature, &self.config) {
            (Some(signature), _) => CommandConfig::from_signature(signature.clone()),
            (None, Some(json)) => {
                CommandConfig::from_json(json).context("failed to parse config JSON")?
            }
            (None, None) => anyhow::bail!("either --signature or --config is required"),
        };
        config.into_command().context("invalid command definition")
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse script arguments and output a sourceable file of variables
    Parse {
        #[command(flatten)]
        source: Source,

        /// Variable name prefix
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,

        /// Arguments to parse for the target script
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print help text for the target script
    Help {
        #[command(flatten)]
        source: Source,
    },

    /// Print the command definition as JSON
    Inspect {
        #[command(flatten)]
        source: Source,
    },
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Commands::Parse {
            source,
            prefix,
            args,
        } => {
            let command = source.load()?;
            let path = match command.parse(&args) {
                Ok(Parsed::Matches(matches)) => write_exports(&matches, &prefix),
                Ok(Parsed::Help(text)) => write_help(&text),
                Ok(Parsed::Terminated(termination)) => write_termination(&termination),
                Err(err) => {
                    debug!(error = %err, "argv rejected");
                    write_error(&err.to_string())
                }
            }
            .context("failed to generate output file")?;

            println!("{}", path.display());
        }
        Commands::Help { source } => {
            let command = source.load()?;
            print!("{}", command.help_text());
        }
        Commands::Inspect { source } => {
            let command = source.load()?;
            let json = serde_json::to_string_pretty(&command.to_config())
                .context("failed to serialize definition")?;
            println!("{}", json);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_subcommand_parses_signature() {
        let cli = Cli::try_parse_from(["sigcli", "parse", "--signature", "test {name}", "--"])
            .unwrap();

        match cli.command {
            Commands::Parse {
                source,
                prefix,
                args,
            } => {
                assert_eq!(source.signature.as_deref(), Some("test {name}"));
                assert!(source.config.is_none());
                assert_eq!(prefix, "SIGCLI_");
                assert!(args.is_empty());
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_parse_subcommand_parses_prefix_and_args() {
        let cli = Cli::try_parse_from([
            "sigcli",
            "parse",
            "--config",
            r#"{"name":"test"}"#,
            "--prefix",
            "MYAPP_",
            "--",
            "-A",
            "20",
            "joe",
        ])
        .unwrap();

        match cli.command {
            Commands::Parse { prefix, args, .. } => {
                assert_eq!(prefix, "MYAPP_");
                assert_eq!(args, vec!["-A", "20", "joe"]);
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_source_required() {
        let result = Cli::try_parse_from(["sigcli", "parse", "--"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_exclusive() {
        let result = Cli::try_parse_from([
            "sigcli",
            "help",
            "--signature",
            "test",
            "--config",
            r#"{"name":"test"}"#,
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_inspect_subcommand() {
        let cli = Cli::try_parse_from(["sigcli", "inspect", "--config", r#"{"name":"test"}"#])
            .unwrap();
        match cli.command {
            Commands::Inspect { source } => {
                assert_eq!(source.load().unwrap().name(), "test");
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_source_load_reports_bad_config() {
        let source = Source {
            signature: None,
            config: Some("{".to_string()),
        };
        let err = source.load().unwrap_err();
        assert!(err.to_string().contains("failed to parse config JSON"));

        let source = Source {
            signature: Some("{name}".to_string()),
            config: None,
        };
        let err = source.load().unwrap_err();
        assert!(err.to_string().contains("invalid command definition"));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["sigcli"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }
}
