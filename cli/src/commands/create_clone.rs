//! `clonekeeper create-clone`: linked clone of the golden source, tagged for expiry.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::require_arg;

/// Arguments for the create-clone command.
#[derive(Args)]
pub struct CreateCloneArgs {
    /// Environment name; becomes the clone's VM name
    #[arg(long)]
    pub env: Option<String>,
}

/// Run `clonekeeper create-clone`.
///
/// # Errors
///
/// Returns an error if `--env` is missing, a placement object cannot be
/// found, or a platform task fails.
pub async fn run(app: &AppContext, args: &CreateCloneArgs) -> Result<ExitCode> {
    let env = require_arg(args.env.as_deref(), "--env")?;
    let session = app.connect().await?;
    let reporter = app.reporter();

    let result = app.lifecycle(&session, &reporter).create_clone(env).await;
    session.close().await;

    app.renderer().render_clone_created(env, &result?)?;
    Ok(ExitCode::SUCCESS)
}
