//! Application service: linked-clone creation use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};
use clonekeeper_common::{ObjectKind, ObjectRef};

use super::lifecycle::Lifecycle;
use crate::application::ports::{
    CloneSpec, Clock, DiskMoveType, InventoryObject, Platform, ProgressReporter, RelocateSpec,
    SnapshotSpec,
};
use crate::domain::{LifecycleError, SourceState};

const SNAPSHOT_NAME: &str = "BaseSnapshot";
const SNAPSHOT_DESCRIPTION: &str = "Snapshot for linked clone";

/// Outcome of the `create_clone` use-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    /// The new VM.
    pub vm: ObjectRef,
    /// Name of the timestamp tag stamped on it.
    pub timestamp_tag: String,
    /// `None` when the source was already a VM; otherwise whether it was
    /// turned back into a template.
    pub source_reverted: Option<bool>,
}

impl<P: Platform, C: Clock, R: ProgressReporter> Lifecycle<'_, P, C, R> {
    /// Create a linked clone named `env_name` from the configured source and
    /// stamp it as a managed clone.
    ///
    /// A template source is converted to a VM first and converted back on
    /// every exit path after the conversion. Nothing else is rolled back: a
    /// failed clone task can leave a partial VM behind.
    ///
    /// # Errors
    ///
    /// `SourceNotFound`, `HostNotFound`, `DatastoreNotFound`,
    /// `ClusterNotFound`, `TaskFailed`, `CloneVerificationFailed` or
    /// `TagStampFailed`, plus platform call errors.
    pub async fn create_clone(&self, env_name: &str) -> Result<CloneOutcome> {
        let source_name = &self.config.placement.source;
        let source = self
            .require(ObjectKind::VirtualMachine, source_name, LifecycleError::SourceNotFound)
            .await?;
        let facts = source.vm.clone().unwrap_or_default();
        let state = SourceState::observe(facts.template, facts.root_snapshot.is_some());
        tracing::debug!(source = %source_name, ?state, "source resolved");

        let converted = state == SourceState::TemplateNoSnapshot;
        if converted {
            self.convert_template(&source).await?;
        }

        let cloned = self.snapshot_clone_and_stamp(env_name).await;

        let source_reverted = if converted {
            Some(self.revert_source().await)
        } else {
            None
        };

        let (vm, timestamp_tag) = cloned?;
        Ok(CloneOutcome {
            vm,
            timestamp_tag,
            source_reverted,
        })
    }

    async fn convert_template(&self, source: &InventoryObject) -> Result<()> {
        let placement = &self.config.placement;
        self.reporter.step(&format!(
            "Source '{}' is a Template. Converting to VM...",
            source.name
        ));
        let host = self
            .require(ObjectKind::HostSystem, &placement.host, LifecycleError::HostNotFound)
            .await?;
        let pool = host
            .resource_pool
            .as_ref()
            .with_context(|| format!("host '{}' has no resource pool", host.name))?;
        tracing::debug!(source = %source.name, state = ?SourceState::TemplateConverting, "converting");
        let task = self
            .platform
            .mark_as_vm(&source.obj, pool, &host.obj)
            .await
            .with_context(|| format!("converting template '{}'", source.name))?;
        self.awaiter()
            .wait(&format!("conversion of template '{}'", source.name), &task)
            .await?;
        self.reporter
            .success(&format!("Converted template '{}' to VM.", source.name));
        Ok(())
    }

    async fn snapshot_clone_and_stamp(&self, env_name: &str) -> Result<(ObjectRef, String)> {
        let placement = &self.config.placement;
        let awaiter = self.awaiter();

        // Conversion may change the object's identity; always re-resolve.
        let mut source = self
            .require(ObjectKind::VirtualMachine, &placement.source, LifecycleError::SourceNotFound)
            .await?;
        if source.vm.as_ref().and_then(|f| f.root_snapshot.as_ref()).is_none() {
            self.reporter.step(&format!(
                "No snapshot found for '{}', creating one...",
                source.name
            ));
            let task = self
                .platform
                .create_snapshot(
                    &source.obj,
                    &SnapshotSpec {
                        name: SNAPSHOT_NAME.to_string(),
                        description: SNAPSHOT_DESCRIPTION.to_string(),
                        memory: false,
                        quiesce: false,
                    },
                )
                .await
                .with_context(|| format!("snapshotting '{}'", source.name))?;
            awaiter
                .wait(&format!("snapshot of '{}'", source.name), &task)
                .await?;
            source = self
                .require(ObjectKind::VirtualMachine, &placement.source, LifecycleError::SourceNotFound)
                .await?;
            self.reporter
                .success(&format!("Snapshot created for '{}'.", source.name));
        }
        let snapshot = source
            .vm
            .as_ref()
            .and_then(|f| f.root_snapshot.clone())
            .with_context(|| format!("'{}' has no snapshot after snapshotting", source.name))?;
        tracing::debug!(source = %source.name, state = ?SourceState::VmWithSnapshot, %snapshot, "ready to clone");

        let datastore = self
            .require(ObjectKind::Datastore, &placement.datastore, LifecycleError::DatastoreNotFound)
            .await?;
        let cluster = self
            .require(
                ObjectKind::ClusterComputeResource,
                &placement.cluster,
                LifecycleError::ClusterNotFound,
            )
            .await?;
        let pool = cluster
            .resource_pool
            .clone()
            .with_context(|| format!("cluster '{}' has no resource pool", cluster.name))?;
        let folder = self.destination_folder().await?;

        let spec = CloneSpec {
            location: RelocateSpec {
                datastore: datastore.obj,
                pool,
                disk_move: DiskMoveType::CreateNewChildDiskBacking,
            },
            power_on: true,
            template: false,
            snapshot,
        };

        self.reporter.step(&format!(
            "Creating linked clone '{env_name}' from '{}'...",
            source.name
        ));
        let task = self
            .platform
            .clone_vm(&source.obj, &folder, env_name, &spec)
            .await
            .with_context(|| format!("cloning '{}'", source.name))?;
        awaiter.wait(&format!("clone of '{env_name}'"), &task).await?;
        self.reporter
            .success(&format!("Linked clone '{env_name}' created successfully."));
        tracing::debug!(vm = env_name, state = ?SourceState::Cloned, "clone task finished");

        let clone = self
            .find_vm(env_name)
            .await?
            .ok_or_else(|| LifecycleError::CloneVerificationFailed(env_name.to_string()))?;

        let ts_name = self
            .tags()
            .stamp_clone(&clone.obj, env_name, self.clock.now(), &self.config.tagging)
            .await?;
        self.reporter.step(&format!(
            "Assigned tags '{ts_name}' and '{}' to VM '{env_name}'",
            self.config.tagging.clone_tag
        ));
        tracing::info!(vm = env_name, id = %clone.obj.id, timestamp = %ts_name, state = ?SourceState::TaggedClone, "clone stamped");
        Ok((clone.obj, ts_name))
    }

    async fn destination_folder(&self) -> Result<ObjectRef> {
        let name = &self.config.placement.folder;
        let folder = super::locator::find_by_name(self.platform, &[ObjectKind::Folder], name, self.cancel.as_ref())
            .await
            .with_context(|| format!("looking up folder '{name}'"))?;
        Ok(match folder {
            Some(f) => f.obj,
            None => {
                self.reporter
                    .warn(&format!("Folder '{name}' not found, using root folder."));
                self.platform.root_folder()
            }
        })
    }

    /// Turn the source back into a template. Failures are reported, not raised.
    async fn revert_source(&self) -> bool {
        let name = &self.config.placement.source;
        self.reporter
            .step(&format!("Reverting '{name}' back to Template..."));
        let reverted = async {
            let source = self
                .require(ObjectKind::VirtualMachine, name, LifecycleError::SourceNotFound)
                .await?;
            let task = self.platform.mark_as_template(&source.obj).await?;
            self.awaiter()
                .wait(&format!("conversion of '{name}' to template"), &task)
                .await
        }
        .await;
        match reverted {
            Ok(_) => {
                self.reporter
                    .success(&format!("'{name}' is now a Template again."));
                tracing::debug!(source = %name, state = ?SourceState::RevertedToTemplate, "source reverted");
                true
            }
            Err(e) => {
                self.reporter
                    .warn(&format!("Could not revert '{name}' to a template: {e:#}"));
                false
            }
        }
    }
}
