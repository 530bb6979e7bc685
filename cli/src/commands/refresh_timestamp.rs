//! `clonekeeper refresh-timestamp`: restart a clone's retention window.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::VmNameArgs;

/// Run `clonekeeper refresh-timestamp`.
///
/// # Errors
///
/// Returns an error if `--vmname` is missing, the VM does not exist, or the
/// tag service rejects a change.
pub async fn run(app: &AppContext, args: &VmNameArgs) -> Result<ExitCode> {
    let name = args.require()?;
    let session = app.connect().await?;
    let reporter = app.reporter();

    let result = app
        .lifecycle(&session, &reporter)
        .refresh_timestamp(name)
        .await;
    session.close().await;

    app.renderer().render_refreshed(name, &result?)?;
    Ok(ExitCode::SUCCESS)
}
