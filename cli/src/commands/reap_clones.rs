//! `clonekeeper reap-clones`: destroy tagged clones past the retention window.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;

/// Arguments for the reap-clones command.
#[derive(Args, Default)]
pub struct ReapClonesArgs {
    /// Report what would be destroyed without touching anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Run `clonekeeper reap-clones`.
///
/// The report is rendered even when some candidates failed; the failure is
/// returned afterwards so the exit code reflects it.
///
/// # Errors
///
/// Returns an error if the tag metadata cannot be read, the run is
/// cancelled, or any candidate could not be reaped.
pub async fn run(app: &AppContext, args: &ReapClonesArgs) -> Result<ExitCode> {
    let session = app.connect().await?;
    let reporter = app.reporter();

    let result = app
        .lifecycle(&session, &reporter)
        .reap_clones(args.dry_run)
        .await;
    session.close().await;

    let report = result?;
    app.renderer().render_reap(&report, args.dry_run)?;
    if let Some(err) = report.incomplete() {
        return Err(err.into());
    }
    Ok(ExitCode::SUCCESS)
}
