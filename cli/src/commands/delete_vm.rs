//! `clonekeeper delete-vm`: power off and destroy a VM by name.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::VmNameArgs;

/// Run `clonekeeper delete-vm`.
///
/// # Errors
///
/// Returns an error if `--vmname` is missing, the VM does not exist, or a
/// platform task fails.
pub async fn run(app: &AppContext, args: &VmNameArgs) -> Result<ExitCode> {
    let name = args.require()?;
    let session = app.connect().await?;
    let reporter = app.reporter();

    let result = app.lifecycle(&session, &reporter).delete_vm(name).await;
    session.close().await;

    result?;
    app.renderer().render_deleted(name)?;
    Ok(ExitCode::SUCCESS)
}
