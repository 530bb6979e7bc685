//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod clone_service;
pub mod lifecycle;
pub mod locator;
pub mod reaper;
pub mod tag_store;
pub mod task_awaiter;
pub mod timestamp_service;
pub mod vm_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use clone_service::CloneOutcome;
pub use lifecycle::Lifecycle;
pub use reaper::{CloneListing, ReapReport};
