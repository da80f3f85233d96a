//! Rigging CLI - provision cloud infrastructure and deploy the application
//!
//! Two stages, run as separate invocations:
//! - `provision-infrastructure` creates and wires the resources, then writes
//!   the deployment context file
//! - `deploy-application` reads that file and publishes the application package

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod azure;
mod commands;
mod config;
mod error;
mod lookup;
mod output;
mod sqlcmd;

use commands::{application, provision, TargetArgs};
use config::RiggingConfig;
use error::CliResult;

/// Rigging CLI application
#[derive(Parser)]
#[command(name = "rigging")]
#[command(about = "Rigging - infrastructure provisioning orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RIGGING_CONFIG")]
    config: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Provision all infrastructure and write the deployment context
    ProvisionInfrastructure {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Publish the application using the deployment context
    DeployApplication {
        #[command(flatten)]
        target: TargetArgs,

        /// Application package (zip); defaults to the configured package path
        #[arg(short, long)]
        package: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = RiggingConfig::load(cli.config.as_deref())?;
    let workdir = std::env::current_dir()?;

    match cli.command {
        Commands::ProvisionInfrastructure { target } => {
            provision::execute(target, &config, &workdir, cli.output).await
        }
        Commands::DeployApplication { target, package } => {
            application::execute(target, package, &config, &workdir, cli.output).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_provision_flags() {
        let cli = Cli::try_parse_from([
            "rigging",
            "provision-infrastructure",
            "--resource-group",
            "rg-expenses",
            "--location",
            "eastus",
            "--deploy-genai",
        ])
        .unwrap();

        match cli.command {
            Commands::ProvisionInfrastructure { target } => {
                assert_eq!(target.resource_group, "rg-expenses");
                assert_eq!(target.location, "eastus");
                assert_eq!(target.base_name, "expensemgmt");
                assert!(target.deploy_genai);
            }
            _ => panic!("expected provision-infrastructure"),
        }
        assert_eq!(cli.output, output::OutputFormat::Table);
    }

    #[test]
    fn test_deploy_application_flags() {
        let cli = Cli::try_parse_from([
            "rigging",
            "--output",
            "json",
            "deploy-application",
            "-g",
            "rg-expenses",
            "-l",
            "eastus",
            "--base-name",
            "demo",
            "--package",
            "dist/app.zip",
        ])
        .unwrap();

        match cli.command {
            Commands::DeployApplication { target, package } => {
                assert_eq!(target.base_name, "demo");
                assert!(!target.deploy_genai);
                assert_eq!(package, Some(PathBuf::from("dist/app.zip")));
            }
            _ => panic!("expected deploy-application"),
        }
        assert_eq!(cli.output, output::OutputFormat::Json);
    }

    #[test]
    fn test_region_is_an_alias_for_location() {
        let cli = Cli::try_parse_from([
            "rigging",
            "provision-infrastructure",
            "-g",
            "rg-expenses",
            "--region",
            "westeurope",
        ])
        .unwrap();

        match cli.command {
            Commands::ProvisionInfrastructure { target } => {
                assert_eq!(target.location, "westeurope");
            }
            _ => panic!("expected provision-infrastructure"),
        }
    }

    #[test]
    fn test_resource_group_is_required() {
        let result = Cli::try_parse_from([
            "rigging",
            "provision-infrastructure",
            "--location",
            "eastus",
        ]);
        assert!(result.is_err());
    }
}
