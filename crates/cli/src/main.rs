//! DevHub E2E CLI - Main Entry Point

use clap::{Parser, Subcommand};
use devhub_e2e_common::gating::{JOB_NAME_ENV, SKIP_INJECTION_ENV};
use devhub_e2e_common::GatingDecision;

use devhub_e2e_cli::commands::{config, deploy, metadata, plugins};
use devhub_e2e_cli::output;

/// DevHub E2E - plugin metadata and test deployment tooling
#[derive(Parser)]
#[command(name = "devhub-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Skip plugin metadata handling (any non-empty value)
    #[arg(long, env = SKIP_INJECTION_ENV, global = true, hide_env_values = true)]
    skip_metadata_injection: Option<String>,

    /// CI job name; periodic jobs skip plugin metadata handling
    #[arg(long, env = JOB_NAME_ENV, global = true)]
    job_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive plugin names, generate or inject dynamic plugin configuration
    #[command(subcommand)]
    Plugins(plugins::PluginsCommands),

    /// Inspect plugin metadata descriptors
    #[command(subcommand)]
    Metadata(metadata::MetadataCommands),

    /// Merge layered YAML configuration files
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Render, install and remove test deployments
    #[command(subcommand)]
    Deploy(deploy::DeployCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let gating = GatingDecision::evaluate(
        cli.skip_metadata_injection.as_deref(),
        cli.job_name.as_deref(),
    );
    tracing::debug!("Plugin metadata handling: {}", gating);

    match cli.command {
        Commands::Plugins(cmd) => plugins::execute(cmd, &gating, cli.format).await?,
        Commands::Metadata(cmd) => metadata::execute(cmd, cli.format).await?,
        Commands::Config(cmd) => config::execute(cmd, cli.format).await?,
        Commands::Deploy(cmd) => deploy::execute(cmd, gating, cli.format).await?,
        Commands::Version => {
            println!("DevHub E2E CLI v{}", devhub_e2e_common::VERSION);
            println!("Plugin metadata, configuration layering and test deployments");
        }
    }

    Ok(())
}
