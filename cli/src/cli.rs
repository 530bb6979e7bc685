//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use crate::app::{AppContext, AppFlags, OutputFlags, PlatformFlags};
use crate::commands;

/// Disposable linked-clone sandboxes with tag-driven expiry
#[derive(Parser)]
#[command(
    name = "clonekeeper",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log diagnostic events to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ~/.clonekeeper/config.yaml)
    #[arg(long, global = true, env = "CLONEKEEPER_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// vCenter user name
    #[arg(long, global = true, env = "VCENTER_USER", hide_env_values = true)]
    pub username: Option<String>,

    /// vCenter password
    #[arg(long, global = true, env = "VCENTER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a tagged linked clone named after the environment
    CreateClone(commands::create_clone::CreateCloneArgs),

    /// Destroy tagged clones older than the retention window
    ReapClones(commands::reap_clones::ReapClonesArgs),

    /// Power off and destroy a VM by name
    DeleteVm(commands::VmNameArgs),

    /// Replace a VM's timestamp tag with the current time
    RefreshTimestamp(commands::VmNameArgs),

    /// List tracked clones with their age and reap status
    ListClones,

    /// Inspect configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self, app: &AppContext) -> Result<ExitCode> {
        match self.command {
            Command::CreateClone(args) => commands::create_clone::run(app, &args).await,
            Command::ReapClones(args) => commands::reap_clones::run(app, &args).await,
            Command::DeleteVm(args) => commands::delete_vm::run(app, &args).await,
            Command::RefreshTimestamp(args) => commands::refresh_timestamp::run(app, &args).await,
            Command::ListClones => commands::list_clones::run(app).await,
            Command::Config(cmd) => commands::config::run(app, &cmd),
            Command::Version => commands::version::run(app),
        }
    }

    /// Build the application context from the global flags.
    #[must_use]
    pub fn app_context(&self, cancel: watch::Receiver<bool>) -> AppContext {
        AppContext::new(
            AppFlags {
                output: OutputFlags {
                    no_color: self.no_color,
                    quiet: self.quiet,
                    json: self.json,
                },
                platform: PlatformFlags {
                    config: self.config.clone(),
                    username: self.username.clone(),
                    password: self.password.clone(),
                },
            },
            cancel,
        )
    }
}
