//! Application service: expiry-driven garbage collection of tagged clones.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use clonekeeper_common::{ObjectKind, ObjectRef, PowerState};

use super::lifecycle::Lifecycle;
use super::locator;
use crate::application::ports::{Clock, InventoryObject, Platform, ProgressReporter};
use crate::domain::clone::format_age;
use crate::domain::{Eligibility, LifecycleError, PlatformError};

/// Per-candidate outcome of one reaper run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    /// Objects carrying the clone tag when the run started.
    pub candidates: usize,
    /// VMs destroyed (or already gone by the time destroy ran).
    pub reaped: Vec<String>,
    /// Expired VMs left in place because of `--dry-run`.
    pub eligible: Vec<String>,
    /// VMs inside the retention window.
    pub young: Vec<String>,
    /// Ids of tagged objects that no longer exist.
    pub missing: Vec<String>,
    /// VMs without a parsable timestamp tag.
    pub untimed: Vec<String>,
    /// Candidates whose lookup or teardown failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl ReapReport {
    /// `ReapIncomplete` if any candidate could not be torn down.
    #[must_use]
    pub fn incomplete(&self) -> Option<LifecycleError> {
        (!self.failed.is_empty()).then(|| LifecycleError::ReapIncomplete {
            failed: self.failed.len(),
            candidates: self.candidates,
        })
    }
}

fn lifecycle_error(e: &anyhow::Error) -> Option<&LifecycleError> {
    e.downcast_ref::<LifecycleError>()
}

/// The VM vanished between lookup and teardown, either inside a task or as
/// a rejected call.
fn already_gone(e: &anyhow::Error) -> bool {
    lifecycle_error(e).is_some_and(LifecycleError::is_object_gone)
        || matches!(
            e.downcast_ref::<PlatformError>(),
            Some(PlatformError::ObjectNotFound(_))
        )
}

/// One tagged clone as seen by `list_clones`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneListing {
    pub name: String,
    pub id: String,
    pub power_state: PowerState,
    pub created: Option<NaiveDateTime>,
    pub eligibility: Eligibility,
}

impl CloneListing {
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        match self.eligibility {
            Eligibility::Expired { age } | Eligibility::Young { age } => Some(age),
            Eligibility::Untimed => None,
        }
    }
}

impl<P: Platform, C: Clock, R: ProgressReporter> Lifecycle<'_, P, C, R> {
    /// Destroy every tagged clone older than the retention window.
    ///
    /// One candidate's failure never stops the loop; failures are collected
    /// in the report. Only cancellation aborts the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag metadata cannot be read or the run is
    /// cancelled.
    pub async fn reap_clones(&self, dry_run: bool) -> Result<ReapReport> {
        let cfg = &self.config.tagging;
        let Some(tagged) = self.tagged_clones().await? else {
            self.reporter
                .success(&format!("No {} tag found. Nothing to reap.", cfg.clone_tag));
            return Ok(ReapReport::default());
        };
        let mut report = ReapReport {
            candidates: tagged.len(),
            ..ReapReport::default()
        };
        if tagged.is_empty() {
            self.reporter.success("No tagged clones found. Nothing to reap.");
            return Ok(report);
        }

        let index = self.tags().timestamp_index(cfg).await?;
        let now = self.clock.now();
        let threshold = self.config.retention.threshold();

        for obj in tagged {
            self.check_cancelled("reap")?;
            let vm = match self.resolve_candidate(&obj).await {
                Ok(Some(vm)) => vm,
                Ok(None) => {
                    self.reporter
                        .warn(&format!("VM {} not found, skipping.", obj.id));
                    report.missing.push(obj.id);
                    continue;
                }
                Err(e) if lifecycle_error(&e).is_some_and(LifecycleError::is_cancelled) => {
                    return Err(e);
                }
                Err(e) => {
                    self.reporter
                        .warn(&format!("Could not look up VM {}: {e:#}", obj.id));
                    report.failed.push((obj.id, format!("{e:#}")));
                    continue;
                }
            };

            match Eligibility::evaluate(index.created(&obj), now, threshold) {
                Eligibility::Untimed => {
                    self.reporter.warn(&format!(
                        "VM {} has no valid timestamp tag, skipping.",
                        vm.name
                    ));
                    report.untimed.push(vm.name);
                }
                Eligibility::Young { age } => {
                    tracing::debug!(vm = %vm.name, age = %format_age(age), "inside retention window");
                    report.young.push(vm.name);
                }
                Eligibility::Expired { age } if dry_run => {
                    self.reporter.step(&format!(
                        "Would delete VM {} (age {}).",
                        vm.name,
                        format_age(age)
                    ));
                    report.eligible.push(vm.name);
                }
                Eligibility::Expired { age } => {
                    self.reporter.step(&format!(
                        "Deleting VM {} (age {})...",
                        vm.name,
                        format_age(age)
                    ));
                    match self.power_off_and_destroy(&vm).await {
                        Ok(()) => {
                            self.reporter.success(&format!("Deleted VM {}.", vm.name));
                            report.reaped.push(vm.name);
                        }
                        Err(e) if lifecycle_error(&e).is_some_and(LifecycleError::is_cancelled) => {
                            return Err(e);
                        }
                        Err(e) if already_gone(&e) => {
                            self.reporter.warn(&format!(
                                "VM {} was already gone before it could be deleted.",
                                vm.name
                            ));
                            report.reaped.push(vm.name);
                        }
                        Err(e) => {
                            self.reporter
                                .warn(&format!("Failed to delete VM {}: {e:#}", vm.name));
                            report.failed.push((vm.name, format!("{e:#}")));
                        }
                    }
                }
            }
        }

        tracing::info!(
            candidates = report.candidates,
            reaped = report.reaped.len(),
            failed = report.failed.len(),
            dry_run,
            "reap finished"
        );
        Ok(report)
    }

    /// Every live tagged clone with its age and verdict, in tag order.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag metadata or the inventory cannot be read.
    pub async fn list_clones(&self) -> Result<Vec<CloneListing>> {
        let Some(tagged) = self.tagged_clones().await? else {
            return Ok(Vec::new());
        };
        let index = self.tags().timestamp_index(&self.config.tagging).await?;
        let now = self.clock.now();
        let threshold = self.config.retention.threshold();

        let mut listings = Vec::with_capacity(tagged.len());
        for obj in tagged {
            let Some(vm) = self.resolve_candidate(&obj).await? else {
                continue;
            };
            let created = index.created(&obj);
            listings.push(CloneListing {
                name: vm.name,
                id: obj.id,
                power_state: vm.vm.map(|f| f.power_state).unwrap_or_default(),
                created,
                eligibility: Eligibility::evaluate(created, now, threshold),
            });
        }
        Ok(listings)
    }

    /// Objects carrying the clone tag, or `None` if the tag was never created.
    async fn tagged_clones(&self) -> Result<Option<Vec<ObjectRef>>> {
        let tags = self.tags();
        let Some(clone_tag) = tags.find_clone_tag(&self.config.tagging).await? else {
            return Ok(None);
        };
        Ok(Some(tags.list_attached_objects(&clone_tag).await?))
    }

    /// Re-fetch a tagged object; attachments can outlive the VM.
    async fn resolve_candidate(&self, obj: &ObjectRef) -> Result<Option<InventoryObject>> {
        if obj.kind != ObjectKind::VirtualMachine {
            tracing::debug!(object = %obj, "clone tag attached to a non-VM object");
            return Ok(None);
        }
        locator::find_by_id(self.platform, ObjectKind::VirtualMachine, &obj.id).await
    }
}
