//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared types crate,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDateTime;
use clonekeeper_common::{ObjectKind, ObjectRef, PowerState, TaskState};

use crate::domain::{AppConfig, TaskFault};

// ── Inventory value types ─────────────────────────────────────────────────────

/// Handle to a temporary inventory view. Must be destroyed after use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewId(pub String);

/// One object as seen through an inventory view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryObject {
    pub obj: ObjectRef,
    pub name: String,
    /// Present for virtual machines only.
    pub vm: Option<VmFacts>,
    /// Resource pool used for placement: the parent compute resource's pool
    /// for hosts, the cluster's own pool for clusters.
    pub resource_pool: Option<ObjectRef>,
}

/// Facts about a virtual machine relevant to cloning and reaping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VmFacts {
    pub template: bool,
    pub power_state: PowerState,
    /// First entry of the root snapshot list, if any.
    pub root_snapshot: Option<String>,
}

// ── Operation specs ───────────────────────────────────────────────────────────

/// Parameters for taking a snapshot of the clone source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSpec {
    pub name: String,
    pub description: String,
    pub memory: bool,
    pub quiesce: bool,
}

/// How the clone's disks relate to the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskMoveType {
    /// New child disks backed by the snapshot's disks (linked clone).
    CreateNewChildDiskBacking,
}

impl DiskMoveType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateNewChildDiskBacking => "createNewChildDiskBacking",
        }
    }
}

/// Where the clone's disks and compute live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocateSpec {
    pub datastore: ObjectRef,
    pub pool: ObjectRef,
    pub disk_move: DiskMoveType,
}

/// Full clone request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneSpec {
    pub location: RelocateSpec,
    pub power_on: bool,
    pub template: bool,
    /// Snapshot id the child disks reference.
    pub snapshot: String,
}

// ── Task value types ──────────────────────────────────────────────────────────

/// Handle returned by a mutating platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskHandle {
    /// Asynchronous task that must be polled.
    Remote(String),
    /// The platform completed the call synchronously.
    Completed,
}

/// Snapshot of a task's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub state: TaskState,
    pub fault: Option<TaskFault>,
    pub result: Option<String>,
}

// ── Tag value types ───────────────────────────────────────────────────────────

/// How many tags of one category an object may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multiple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    pub cardinality: Cardinality,
    pub associable_types: Vec<ObjectKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: String,
    pub description: String,
    pub cardinality: Cardinality,
    pub associable_types: Vec<ObjectKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    pub name: String,
    pub description: String,
    pub category_id: String,
}

// ── Platform Port Traits ──────────────────────────────────────────────────────

/// Scoped, recursive views over the inventory rooted at the datacenter root.
///
/// Listing a view returns bare references. Names and details are read per
/// object, so callers fetch details only for the objects they keep.
#[allow(async_fn_in_trait)]
pub trait InventoryView {
    /// Open a view over every object of the given kinds.
    async fn create_view(&self, kinds: &[ObjectKind]) -> Result<ViewId>;
    /// The view's members in platform order.
    async fn view_members(&self, view: &ViewId) -> Result<Vec<ObjectRef>>;
    /// Release the view.
    async fn destroy_view(&self, view: &ViewId) -> Result<()>;
    /// Name of `obj`, or `None` if it no longer exists.
    async fn object_name(&self, obj: &ObjectRef) -> Result<Option<String>>;
    /// VM facts and placement pool for `obj`, or `None` if it no longer exists.
    async fn describe(&self, obj: &ObjectRef, name: String) -> Result<Option<InventoryObject>>;
}

/// Mutating VM operations. Each yields a task handle to await.
#[allow(async_fn_in_trait)]
pub trait VmOperations {
    /// Convert a template back into a VM placed on `pool`/`host`.
    async fn mark_as_vm(&self, vm: &ObjectRef, pool: &ObjectRef, host: &ObjectRef)
    -> Result<TaskHandle>;
    /// Convert a VM into a template.
    async fn mark_as_template(&self, vm: &ObjectRef) -> Result<TaskHandle>;
    async fn create_snapshot(&self, vm: &ObjectRef, spec: &SnapshotSpec) -> Result<TaskHandle>;
    async fn clone_vm(
        &self,
        source: &ObjectRef,
        folder: &ObjectRef,
        name: &str,
        spec: &CloneSpec,
    ) -> Result<TaskHandle>;
    async fn power_off(&self, vm: &ObjectRef) -> Result<TaskHandle>;
    async fn destroy(&self, vm: &ObjectRef) -> Result<TaskHandle>;
    /// Root VM folder, used when the configured folder does not exist.
    fn root_folder(&self) -> ObjectRef;
}

/// Task status polling.
#[allow(async_fn_in_trait)]
pub trait TaskMonitor {
    async fn task_info(&self, task_id: &str) -> Result<TaskInfo>;
}

/// Tag categories, tags and their associations with objects.
#[allow(async_fn_in_trait)]
pub trait TagService {
    async fn list_categories(&self) -> Result<Vec<String>>;
    async fn get_category(&self, id: &str) -> Result<CategoryInfo>;
    async fn create_category(&self, spec: &CategorySpec) -> Result<String>;
    async fn list_tags(&self) -> Result<Vec<String>>;
    async fn get_tag(&self, id: &str) -> Result<TagInfo>;
    async fn create_tag(&self, spec: &TagSpec) -> Result<String>;
    /// Associate; attaching an already-attached tag is not an error.
    async fn attach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()>;
    /// Disassociate; detaching a tag that is not attached is not an error.
    async fn detach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()>;
    async fn list_attached_objects(&self, tag_id: &str) -> Result<Vec<ObjectRef>>;
}

/// Composite trait: any type implementing all four sub-traits is a `Platform`.
pub trait Platform: InventoryView + VmOperations + TaskMonitor + TagService {}

/// Blanket implementation: any type implementing all four sub-traits is a `Platform`.
impl<T> Platform for T where T: InventoryView + VmOperations + TaskMonitor + TagService {}

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Abstracts where the application configuration comes from.
pub trait ConfigStore {
    /// Load the effective configuration. A missing file yields defaults.
    fn load(&self) -> Result<AppConfig>;
    /// Path of the configuration file, whether or not it exists.
    fn path(&self) -> Result<PathBuf>;
}

// ── Clock Port ────────────────────────────────────────────────────────────────

/// Source of "now" for stamping and ageing clones.
pub trait Clock {
    /// Current naive local time.
    fn now(&self) -> NaiveDateTime;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
