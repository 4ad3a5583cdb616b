//! `beluga-tracker` - CLI for beluga-tracker
//!
//! Intended to be started by a scheduler (cron, a systemd timer, a cloud
//! event rule) with `beluga-tracker run`. Each start is one invocation.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use beluga_tracker::cli::{Cli, Command, ConfigCommand, RunCommand};
use beluga_tracker::{init_logging, Config, Error, Invocation, Outcome, Tracker};

/// Exit status when the configuration or credentials are at fault.
const EXIT_CONFIG: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from(cli.config).context("loading configuration")?;

    match cli.command {
        Command::Run(run_cmd) => handle_run(&config, run_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn exit_status(error: &anyhow::Error) -> u8 {
    let is_config = error
        .downcast_ref::<Error>()
        .is_some_and(Error::is_configuration_error);
    if is_config {
        EXIT_CONFIG
    } else {
        1
    }
}

async fn handle_run(config: &Config, cmd: RunCommand) -> anyhow::Result<()> {
    let tracker = Tracker::from_config(config)?.with_dry_run(cmd.dry_run);
    let invocation = Invocation::new(cmd.event);

    let outcome = tracker
        .run(&invocation)
        .await
        .with_context(|| format!("invocation {} failed", invocation.context.invocation_id))?;

    if let Outcome::DryRun(sighting) = outcome {
        println!("{}", sighting.status);
        println!();
        println!("Map image: {}", sighting.map.path.display());
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Fleet]");
                println!("  Name:               {}", config.fleet.name);
                println!("  Transponders:       {}", config.fleet.icao24.join(", "));
                println!("  Hashtags:           {}", config.fleet.hashtags);
                println!();
                println!("[Map]");
                println!("  Zoom:               {}", config.map.zoom);
                println!(
                    "  Size:               {}x{}",
                    config.map.width, config.map.height
                );
                println!("  Output:             {}", config.map_output_path().display());
                println!();
                println!("[Credentials]");
                println!(
                    "  Maps API key:       {}",
                    set_or_missing(config.credentials.maps_api_key().is_ok())
                );
                println!(
                    "  Twitter OAuth:      {}",
                    set_or_missing(config.credentials.twitter().is_ok())
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn set_or_missing(present: bool) -> &'static str {
    if present {
        "set"
    } else {
        "missing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_for_configuration_errors() {
        let err = anyhow::Error::from(Error::MissingCredential {
            name: "Twitter_API_Key",
        })
        .context("invocation 00ff failed");
        assert_eq!(exit_status(&err), EXIT_CONFIG);

        let err = anyhow::Error::from(Error::ConfigValidation {
            message: "map zoom (30) must be between 0 and 21".to_string(),
        });
        assert_eq!(exit_status(&err), EXIT_CONFIG);
    }

    #[test]
    fn test_exit_status_for_service_errors() {
        let err = anyhow::Error::from(Error::api("OpenSky", 503, "Service Unavailable"))
            .context("invocation 00ff failed");
        assert_eq!(exit_status(&err), 1);
        assert_eq!(exit_status(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn test_validate_rejects_bad_file() {
        let path = std::env::temp_dir().join(format!(
            "beluga-tracker-validate-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[map]\nzoom = 30\n").unwrap();

        let result = handle_config(
            &Config::default(),
            ConfigCommand::Validate {
                file: Some(path.clone()),
            },
        );
        std::fs::remove_file(&path).ok();

        let err = result.unwrap_err();
        assert_eq!(exit_status(&err), EXIT_CONFIG);
        assert!(format!("{err:#}").contains("zoom"));
    }
}
