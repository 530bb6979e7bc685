//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()`. Commands borrow it to render output, load
//! configuration, and open a platform session.

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::watch;

use crate::application::ports::ConfigStore;
use crate::application::services::Lifecycle;
use crate::domain::{AppConfig, InputError, validate_config};
use crate::infra::clock::SystemClock;
use crate::infra::config::YamlConfigStore;
use crate::infra::vsphere::{Credentials, VsphereClient};
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Platform access flags.
pub struct PlatformFlags {
    /// Explicit config file path (`--config`).
    pub config: Option<PathBuf>,
    /// `--username` / `VCENTER_USER`.
    pub username: Option<String>,
    /// `--password` / `VCENTER_PASSWORD`.
    pub password: Option<String>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Platform access options.
    pub platform: PlatformFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Configuration file access.
    pub config_store: YamlConfigStore,
    /// Wall clock used for timestamp tags and expiry.
    pub clock: SystemClock,
    /// Flips to `true` on Ctrl-C.
    pub cancel: watch::Receiver<bool>,
    username: Option<String>,
    password: Option<String>,
}

/// An open platform session plus the configuration it was opened with.
pub struct Session {
    pub config: AppConfig,
    pub client: VsphereClient,
}

impl Session {
    /// Log out of the platform.
    pub async fn close(self) {
        self.client.logout().await;
    }
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// JSON mode implies quiet so stdout carries exactly one JSON document.
    #[must_use]
    pub fn new(flags: AppFlags, cancel: watch::Receiver<bool>) -> Self {
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let quiet = flags.output.quiet || flags.output.json;

        Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            config_store: YamlConfigStore::new(flags.platform.config),
            clock: SystemClock,
            cancel,
            username: flags.platform.username,
            password: flags.platform.password,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter handed to application services.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Credentials from flags or environment.
    ///
    /// # Errors
    ///
    /// Returns `InputError::MissingCredentials` if either value is missing or
    /// empty.
    pub fn credentials(&self) -> Result<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => Err(InputError::MissingCredentials.into()),
        }
    }

    /// Load and validate the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value is invalid.
    pub fn load_config(&self) -> Result<AppConfig> {
        let config = self.config_store.load()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Check credentials, load configuration and log in.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing, the configuration is
    /// invalid, or the platform rejects the login.
    pub async fn connect(&self) -> Result<Session> {
        let credentials = self.credentials()?;
        let config = self.load_config()?;
        let client = VsphereClient::connect(&config.platform, &credentials).await?;
        Ok(Session { config, client })
    }

    /// Lifecycle use-cases bound to `session`, cancellable via Ctrl-C.
    #[must_use]
    pub fn lifecycle<'a>(
        &'a self,
        session: &'a Session,
        reporter: &'a TerminalReporter<'a>,
    ) -> Lifecycle<'a, VsphereClient, SystemClock, TerminalReporter<'a>> {
        Lifecycle::new(&session.client, &self.clock, reporter, &session.config)
            .with_cancel(self.cancel.clone())
    }
}
