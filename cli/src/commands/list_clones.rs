//! `clonekeeper list-clones`: show tracked clones with age and reap status.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;

/// Run `clonekeeper list-clones`. Read-only.
///
/// # Errors
///
/// Returns an error if the tag metadata or inventory cannot be read.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let session = app.connect().await?;
    let reporter = app.reporter();

    let result = app.lifecycle(&session, &reporter).list_clones().await;
    session.close().await;

    app.renderer().render_clones(&result?)?;
    Ok(ExitCode::SUCCESS)
}
