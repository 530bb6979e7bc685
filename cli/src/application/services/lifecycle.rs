//! Shared context for the clone lifecycle use-cases.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};
use clonekeeper_common::{ObjectKind, PowerState};
use tokio::sync::watch;

use super::locator;
use super::tag_store::TagStore;
use super::task_awaiter::{TaskAwaiter, WaitPolicy};
use crate::application::ports::{Clock, InventoryObject, Platform, ProgressReporter};
use crate::domain::{AppConfig, LifecycleError};

/// Everything a lifecycle use-case needs, borrowed for one command run.
///
/// The use-cases live in sibling modules as `impl` blocks on this type:
/// `create_clone`, `reap_clones`/`list_clones`, `delete_vm` and
/// `refresh_timestamp`.
pub struct Lifecycle<'a, P: Platform, C: Clock, R: ProgressReporter> {
    pub(super) platform: &'a P,
    pub(super) clock: &'a C,
    pub(super) reporter: &'a R,
    pub(super) config: &'a AppConfig,
    pub(super) cancel: Option<watch::Receiver<bool>>,
}

impl<'a, P: Platform, C: Clock, R: ProgressReporter> Lifecycle<'a, P, C, R> {
    #[must_use]
    pub fn new(platform: &'a P, clock: &'a C, reporter: &'a R, config: &'a AppConfig) -> Self {
        Self {
            platform,
            clock,
            reporter,
            config,
            cancel: None,
        }
    }

    /// Abort any task wait or inventory scan once `cancel` becomes `true`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(super) fn awaiter(&self) -> TaskAwaiter<'a, P> {
        let awaiter = TaskAwaiter::new(self.platform, WaitPolicy::from(&self.config.tasks));
        match &self.cancel {
            Some(cancel) => awaiter.with_cancel(cancel.clone()),
            None => awaiter,
        }
    }

    /// `Cancelled` for `operation` once the signal has fired.
    pub(super) fn check_cancelled(&self, operation: &str) -> Result<()> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(LifecycleError::Cancelled {
                operation: operation.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub(super) fn tags(&self) -> TagStore<'a, P> {
        TagStore::new(self.platform)
    }

    /// Resolve a VM by exact name.
    pub(super) async fn find_vm(&self, name: &str) -> Result<Option<InventoryObject>> {
        locator::find_by_name(self.platform, &[ObjectKind::VirtualMachine], name, self.cancel.as_ref())
            .await
            .with_context(|| format!("looking up VM '{name}'"))
    }

    /// Resolve an object of `kind` by name, failing with `not_found` if absent.
    pub(super) async fn require(
        &self,
        kind: ObjectKind,
        name: &str,
        not_found: fn(String) -> LifecycleError,
    ) -> Result<InventoryObject> {
        locator::find_by_name(self.platform, &[kind], name, self.cancel.as_ref())
            .await
            .with_context(|| format!("looking up {kind} '{name}'"))?
            .ok_or_else(|| not_found(name.to_string()).into())
    }

    /// Power off `vm` if it is running, then destroy it.
    pub(super) async fn power_off_and_destroy(&self, vm: &InventoryObject) -> Result<()> {
        let awaiter = self.awaiter();
        let powered_on = vm
            .vm
            .as_ref()
            .is_some_and(|f| f.power_state == PowerState::PoweredOn);
        if powered_on {
            self.reporter.step(&format!("Powering off VM {}...", vm.name));
            let task = self
                .platform
                .power_off(&vm.obj)
                .await
                .with_context(|| format!("powering off '{}'", vm.name))?;
            awaiter
                .wait(&format!("power off of '{}'", vm.name), &task)
                .await?;
        }

        self.reporter.step(&format!("Destroying VM {}...", vm.name));
        let task = self
            .platform
            .destroy(&vm.obj)
            .await
            .with_context(|| format!("destroying '{}'", vm.name))?;
        awaiter.wait(&format!("destroy of '{}'", vm.name), &task).await?;
        tracing::info!(vm = %vm.name, id = %vm.obj.id, "vm destroyed");
        Ok(())
    }
}
