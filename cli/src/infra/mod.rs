//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: the vCenter HTTP client,
//! configuration file access, and the wall clock.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod clock;
pub mod config;
pub mod vsphere;
