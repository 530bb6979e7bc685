//! `clonekeeper config`: inspect the effective configuration.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file, environment and defaults)
    Show,
    /// Print the configuration file path
    Path,
}

/// Run the config command. Never contacts the platform.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or is invalid.
pub fn run(app: &AppContext, cmd: &ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => {
            let config = app.load_config()?;
            let path = app.config_store.path()?;
            app.renderer().render_config(&config, &path)?;
        }
        ConfigCommand::Path => {
            app.renderer().render_config_path(&app.config_store.path()?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
