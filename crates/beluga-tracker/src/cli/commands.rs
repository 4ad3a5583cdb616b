//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Arguments for a single tracking invocation.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Opaque JSON event from the scheduler (logged, otherwise unused)
    #[arg(short, long, value_name = "JSON", default_value = "{}", value_parser = parse_event)]
    pub event: serde_json::Value,

    /// Locate, resolve and render, but print the post instead of publishing it
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_event(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("event is not valid JSON: {e}"))
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration (credentials are never shown)
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_accepts_json() {
        let event = parse_event(r#"{"source": "aws.events"}"#).unwrap();
        assert_eq!(event["source"], "aws.events");
    }

    #[test]
    fn test_parse_event_rejects_garbage() {
        let err = parse_event("not json").unwrap_err();
        assert!(err.contains("not valid JSON"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
