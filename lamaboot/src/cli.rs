use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use lamaboot_core::config::CliOverrides;

/// lamaboot - prepare and launch the DataLama local LLM environment
#[derive(Parser, Debug)]
#[command(name = "lamaboot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root; relative paths resolve against it (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Runs `setup` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the tool, build the venv, install requirements, seed data, run the entry point
    Setup(SetupArgs),

    /// Show what setup would find, without changing anything
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the virtual environment (and optionally the data directory)
    Clean {
        /// Only list what would be removed
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,

        /// Also remove the data directory so the info file is rewritten next run
        #[arg(long)]
        data: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct SetupArgs {
    /// Virtual environment directory (default: venv)
    #[arg(long, value_name = "DIR")]
    pub venv_dir: Option<PathBuf>,

    /// Requirements manifest (default: requirements.txt)
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Data directory to seed (default: data)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Program run on the venv interpreter at the end (default: src/datalama.py)
    #[arg(long, value_name = "FILE")]
    pub entry_point: Option<PathBuf>,

    /// Base interpreter used to create the venv (default: python3, then python)
    #[arg(long, value_name = "PYTHON")]
    pub python: Option<String>,

    /// Pull this model through the tool before the entry point runs
    #[arg(long, value_name = "MODEL")]
    pub pull_model: Option<String>,

    /// Fail instead of fetching the installer when the tool is missing
    #[arg(long)]
    pub no_install: bool,

    /// Stop after seeding; do not run the entry point (also LAMABOOT_SKIP_HANDOFF)
    #[arg(long)]
    pub skip_handoff: bool,
}

impl SetupArgs {
    pub fn to_overrides(&self, project_dir: Option<PathBuf>) -> CliOverrides {
        CliOverrides {
            project_dir,
            venv_dir: self.venv_dir.clone(),
            manifest: self.manifest.clone(),
            data_dir: self.data_dir.clone(),
            entry_point: self.entry_point.clone(),
            python: self.python.clone(),
            pull_model: self.pull_model.clone(),
            no_install: self.no_install,
            skip_handoff: self.skip_handoff,
        }
    }
}
