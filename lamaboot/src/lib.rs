//! lamaboot CLI library.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, SetupArgs};

use lamaboot_core::config::{BootstrapConfig, CliOverrides};

/// Run the CLI: parses args and dispatches to command handlers.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Setup(SetupArgs::default()));
    let overrides = match command {
        Commands::Setup(ref args) => args.to_overrides(cli.project_dir),
        _ => CliOverrides {
            project_dir: cli.project_dir,
            ..Default::default()
        },
    };
    // Config first: it loads the project's `.env`, which may set log options.
    let config = load_config(overrides);
    lamaboot_core::observability::init_tracing();
    tracing::debug!(?config, "Resolved configuration");

    match command {
        Commands::Setup(_) => {
            lamaboot_commands::setup::cmd_setup(&config)?;
        }
        Commands::Status { json } => {
            lamaboot_commands::status::cmd_status(&config, json)?;
        }
        Commands::Clean {
            dry_run,
            force,
            data,
        } => {
            lamaboot_commands::env::cmd_clean(&config, dry_run, force, data)?;
        }
    }
    Ok(())
}

fn load_config(overrides: CliOverrides) -> BootstrapConfig {
    BootstrapConfig::from_env_for(overrides.project_dir.clone()).with_cli_overrides(overrides)
}
