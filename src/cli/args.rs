//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Answer;

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Request capabilities, asking for consent where needed
    Request {
        /// Capability identifiers
        #[arg(required = true)]
        capabilities: Vec<String>,

        /// How the scripted consent flow answers
        #[arg(long, value_enum)]
        answer: Option<Answer>,

        /// Delay before the consent flow answers, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Cancel the request if it has not completed after this many milliseconds
        #[arg(long)]
        cancel_after_ms: Option<u64>,
    },
    /// Report current grant status without asking
    Check {
        /// Capability identifiers
        #[arg(required = true)]
        capabilities: Vec<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigSubcommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommands {
    /// Initialize a new config file
    Init,
    /// Print config file location
    Where,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let cli = Cli::parse_from([
            "warden",
            "--json",
            "request",
            "camera",
            "mic",
            "--answer",
            "deny-permanently",
            "--cancel-after-ms",
            "100",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Request {
                capabilities,
                answer,
                cancel_after_ms,
                ..
            } => {
                assert_eq!(capabilities, vec!["camera", "mic"]);
                assert_eq!(answer, Some(Answer::DenyPermanently));
                assert_eq!(cancel_after_ms, Some(100));
            }
            other => panic!("Expected request command, got {other:?}"),
        }
    }

    #[test]
    fn test_request_requires_capabilities() {
        assert!(Cli::try_parse_from(["warden", "request"]).is_err());
    }
}
