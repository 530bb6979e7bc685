//! Application service: delete a VM by name.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use clonekeeper_common::ObjectKind;

use super::lifecycle::Lifecycle;
use crate::application::ports::{Clock, Platform, ProgressReporter};
use crate::domain::LifecycleError;

impl<P: Platform, C: Clock, R: ProgressReporter> Lifecycle<'_, P, C, R> {
    /// Power off (if running) and destroy the VM named `name`.
    ///
    /// Works on any VM, tagged or not.
    ///
    /// # Errors
    ///
    /// `VmNotFound` before any mutation, or the failure of the power-off or
    /// destroy task.
    pub async fn delete_vm(&self, name: &str) -> Result<()> {
        let vm = self
            .require(ObjectKind::VirtualMachine, name, LifecycleError::VmNotFound)
            .await?;
        self.power_off_and_destroy(&vm).await?;
        self.reporter.success(&format!("VM '{name}' deleted."));
        Ok(())
    }
}
