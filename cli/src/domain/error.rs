//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Task faults ───────────────────────────────────────────────────────────────

/// Coarse classification of a platform fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The object the operation targeted no longer exists.
    ObjectNotFound,
    /// Any other platform-reported failure.
    Other,
}

/// Error payload reported by a failed platform task, surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFault {
    pub kind: FaultKind,
    pub message: String,
}

impl TaskFault {
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Other,
            message: message.into(),
        }
    }

    pub fn object_not_found(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::ObjectNotFound,
            message: message.into(),
        }
    }
}

// ── Lifecycle errors ──────────────────────────────────────────────────────────

/// Errors raised by the clone lifecycle use-cases.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Source '{0}' not found.")]
    SourceNotFound(String),

    #[error("Host '{0}' not found.")]
    HostNotFound(String),

    #[error("Datastore '{0}' not found.")]
    DatastoreNotFound(String),

    #[error("Cluster '{0}' not found.")]
    ClusterNotFound(String),

    #[error("VM '{0}' not found.")]
    VmNotFound(String),

    #[error("{operation} failed: {}", fault.message)]
    TaskFailed { operation: String, fault: TaskFault },

    #[error("{operation} did not finish within {}s", elapsed.as_secs())]
    Timeout { operation: String, elapsed: Duration },

    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    #[error("Clone '{0}' was created but could not be found afterwards.")]
    CloneVerificationFailed(String),

    #[error("Could not tag '{vm}' as a clone: {reason}")]
    TagStampFailed { vm: String, reason: String },

    #[error("{failed} of {candidates} clone(s) could not be reaped")]
    ReapIncomplete { failed: usize, candidates: usize },
}

impl LifecycleError {
    /// Whether this error names a lookup that found nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::HostNotFound(_)
                | Self::DatastoreNotFound(_)
                | Self::ClusterNotFound(_)
                | Self::VmNotFound(_)
        )
    }

    /// Whether the wait was interrupted by the cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether a task failed because its target object is already gone.
    #[must_use]
    pub fn is_object_gone(&self) -> bool {
        matches!(
            self,
            Self::TaskFailed { fault, .. } if fault.kind == FaultKind::ObjectNotFound
        )
    }
}

// ── Input errors ──────────────────────────────────────────────────────────────

/// Caller mistakes detected before the platform is contacted.
#[derive(Debug, Error)]
pub enum InputError {
    #[error(
        "Username and password must be provided with --username/--password \
         or VCENTER_USER/VCENTER_PASSWORD."
    )]
    MissingCredentials,

    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(&'static str),
}

// ── Platform errors ───────────────────────────────────────────────────────────

/// Errors reported by the platform client outside of task execution.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("platform returned HTTP {status} for {path}: {message}")]
    Http {
        status: u16,
        path: String,
        message: String,
    },

    #[error("unexpected platform response for {path}: {message}")]
    Decode { path: String, message: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ── Exit classification ───────────────────────────────────────────────────────

/// Exit code for success.
pub const EXIT_OK: u8 = 0;
/// Generic failure, including failed platform tasks.
pub const EXIT_FAILURE: u8 = 1;
/// Missing credentials, missing arguments or invalid configuration.
pub const EXIT_USAGE: u8 = 2;
/// A named object could not be found.
pub const EXIT_NOT_FOUND: u8 = 3;
/// A platform task timed out or was cancelled.
pub const EXIT_INTERRUPTED: u8 = 4;

/// How a failed command is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub exit_code: u8,
    /// Stable machine-readable code used in `--json` error output.
    pub code: &'static str,
}

impl Failure {
    const fn new(exit_code: u8, code: &'static str) -> Self {
        Self { exit_code, code }
    }
}

/// Classify an error by the first typed error found in its chain.
#[must_use]
pub fn classify(err: &anyhow::Error) -> Failure {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<InputError>() {
            return match e {
                InputError::MissingCredentials => Failure::new(EXIT_USAGE, "missing_credentials"),
                InputError::MissingRequiredArgument(_) => Failure::new(EXIT_USAGE, "missing_argument"),
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return Failure::new(EXIT_USAGE, "invalid_config");
        }
        if let Some(e) = cause.downcast_ref::<LifecycleError>() {
            return match e {
                e if e.is_not_found() => Failure::new(EXIT_NOT_FOUND, "not_found"),
                LifecycleError::Timeout { .. } => Failure::new(EXIT_INTERRUPTED, "timeout"),
                LifecycleError::Cancelled { .. } => Failure::new(EXIT_INTERRUPTED, "cancelled"),
                LifecycleError::TaskFailed { .. } => Failure::new(EXIT_FAILURE, "task_failed"),
                LifecycleError::CloneVerificationFailed(_) => {
                    Failure::new(EXIT_FAILURE, "verification_failed")
                }
                LifecycleError::TagStampFailed { .. } => Failure::new(EXIT_FAILURE, "tag_stamp_failed"),
                _ => Failure::new(EXIT_FAILURE, "reap_incomplete"),
            };
        }
        if cause.downcast_ref::<PlatformError>().is_some() {
            return Failure::new(EXIT_FAILURE, "platform_error");
        }
    }
    Failure::new(EXIT_FAILURE, "error")
}
