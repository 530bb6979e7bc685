//! Application service: restart a clone's retention window.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use clonekeeper_common::{ObjectKind, ObjectRef, timestamp};

use super::lifecycle::Lifecycle;
use crate::application::ports::{Clock, Platform, ProgressReporter, TagInfo};
use crate::domain::{LifecycleError, next_timestamp};

const REFRESH_DESCRIPTION: &str = "Updated Timestamp";

impl<P: Platform, C: Clock, R: ProgressReporter> Lifecycle<'_, P, C, R> {
    /// Replace every timestamp tag on `name` with one for the current time.
    ///
    /// The new value is strictly later than any value it replaces. Returns the
    /// new tag name. The new tag is resolved before anything is detached; if a
    /// detach or the final attach fails, the newest detached timestamp is
    /// attached again so the VM keeps a creation time.
    ///
    /// # Errors
    ///
    /// `VmNotFound`, or the failure of a tag call.
    pub async fn refresh_timestamp(&self, name: &str) -> Result<String> {
        let cfg = &self.config.tagging;
        let vm = self
            .require(ObjectKind::VirtualMachine, name, LifecycleError::VmNotFound)
            .await?;
        let tags = self.tags();

        let stale = tags.timestamp_tags_on(&vm.obj, cfg).await?;
        let previous: Vec<_> = stale.iter().filter_map(|t| timestamp::parse(&t.name)).collect();
        let at = next_timestamp(self.clock.now(), &previous);
        let (tag_id, ts_name) = tags.timestamp_tag(at, cfg, REFRESH_DESCRIPTION).await?;

        let mut detached = Vec::with_capacity(stale.len());
        for tag in &stale {
            if let Err(e) = tags.detach(&tag.id, &vm.obj).await {
                self.restore_timestamp(&vm.obj, name, &detached).await;
                return Err(e.context(format!("detaching '{}' from '{name}'", tag.name)));
            }
            self.reporter
                .step(&format!("Detached old timestamp tag '{}'.", tag.name));
            detached.push(tag);
        }

        if let Err(e) = tags.attach(&tag_id, &vm.obj).await {
            self.restore_timestamp(&vm.obj, name, &detached).await;
            return Err(e.context(format!("attaching '{ts_name}' to '{name}'")));
        }
        self.reporter
            .success(&format!("Assigned new timestamp tag '{ts_name}' to VM '{name}'."));
        tracing::info!(vm = name, timestamp = %ts_name, replaced = stale.len(), "timestamp refreshed");
        Ok(ts_name)
    }

    /// Attach the newest parsable tag in `detached` (newest first) again.
    async fn restore_timestamp(&self, vm: &ObjectRef, name: &str, detached: &[&TagInfo]) {
        let Some(newest) = detached.iter().find(|t| timestamp::parse(&t.name).is_some()) else {
            return;
        };
        match self.tags().attach(&newest.id, vm).await {
            Ok(()) => self.reporter.warn(&format!(
                "Refresh failed, restored timestamp tag '{}' on VM '{name}'.",
                newest.name
            )),
            Err(e) => {
                tracing::warn!(vm = name, tag = %newest.name, error = %e, "could not restore timestamp tag");
            }
        }
    }
}
