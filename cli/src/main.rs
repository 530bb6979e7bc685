//! clonekeeper - Disposable linked-clone sandboxes with tag-driven expiry

#![cfg_attr(test, allow(clippy::expect_used))]

use std::process::ExitCode;

use clap::Parser;
use clonekeeper_cli::cli::Cli;
use clonekeeper_cli::domain::classify;
use clonekeeper_cli::domain::error::EXIT_INTERRUPTED;
use clonekeeper_cli::output::json::format_error;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("interrupt received, cancelling (press Ctrl-C again to exit now)");
        let _ = cancel_tx.send(true);
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted.");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });

    let app = cli.app_context(cancel_rx);
    match cli.run(&app).await {
        Ok(code) => code,
        Err(e) => {
            let failure = classify(&e);
            tracing::debug!(code = failure.code, error = ?e, "command failed");
            if app.is_json() {
                match format_error(&format!("{e:#}"), failure.code) {
                    Ok(body) => println!("{body}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                app.output.error(&format!("{e:#}"));
            }
            ExitCode::from(failure.exit_code)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
