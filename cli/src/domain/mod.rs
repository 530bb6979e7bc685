//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod clone;
pub mod config;
pub mod error;

pub use clone::{Eligibility, SourceState, is_expired, next_timestamp};
pub use config::{AppConfig, validate_config};
pub use error::{
    ConfigError, Failure, FaultKind, InputError, LifecycleError, PlatformError, TaskFault, classify,
};
