//! In-memory platform fake and recording stubs for service tests.
//!
//! `FakePlatform` keeps inventory, tags and tasks in a `RefCell` and records
//! every mutation so tests can assert that nothing was touched.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clonekeeper_common::{ObjectKind, ObjectRef, PowerState, TaskState};

use crate::application::ports::{
    Cardinality, CategoryInfo, CategorySpec, CloneSpec, Clock, InventoryObject, InventoryView,
    ProgressReporter, SnapshotSpec, TagInfo, TagService, TagSpec, TaskHandle, TaskInfo,
    TaskMonitor, ViewId, VmFacts, VmOperations,
};
use crate::domain::{PlatformError, TaskFault};

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .unwrap_or_default()
}

// ── Fake platform ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeState {
    pub objects: Vec<InventoryObject>,
    pub categories: Vec<CategoryInfo>,
    pub tags: Vec<TagInfo>,
    pub attachments: Vec<(String, ObjectRef)>,
    pub tasks: HashMap<String, TaskInfo>,
    pub views: HashMap<String, Vec<ObjectKind>>,
    pub views_created: usize,
    pub mutations: Vec<String>,
    /// Operation name → fault reported by its task.
    pub task_failures: HashMap<&'static str, TaskFault>,
    /// Tag names whose attach call errors.
    pub failing_attach: HashSet<String>,
    /// Tag names whose detach call errors.
    pub failing_detach: HashSet<String>,
    pub fail_view_members: bool,
    /// Object ids still listed by views but already deleted when read.
    pub vanished: HashSet<String>,
    /// Object ids whose reads fail outright.
    pub failing_reads: HashSet<String>,
    pub names_read: usize,
    pub describes: usize,
    /// Operation names whose call is rejected as if the object had vanished.
    pub rejected_as_missing: HashSet<&'static str>,
    /// Clone succeeds but the new VM gets this name instead.
    pub clone_name_override: Option<String>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakePlatform {
    pub state: RefCell<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host, datastore, cluster and folder matching `PlacementConfig::default()`.
    pub fn with_default_placement() -> Self {
        let fake = Self::new();
        fake.add_host("192.168.2.60");
        fake.add_object(ObjectKind::Datastore, "datastore1", None, None);
        fake.add_cluster("home");
        fake.add_object(ObjectKind::Folder, "vm", None, None);
        fake
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }

    pub fn add_object(
        &self,
        kind: ObjectKind,
        name: &str,
        vm: Option<VmFacts>,
        resource_pool: Option<ObjectRef>,
    ) -> ObjectRef {
        let prefix = match kind {
            ObjectKind::VirtualMachine => "vm",
            ObjectKind::HostSystem => "host",
            ObjectKind::Datastore => "datastore",
            ObjectKind::ClusterComputeResource => "domain-c",
            ObjectKind::Folder => "group-v",
            ObjectKind::ResourcePool => "resgroup",
        };
        let obj = ObjectRef::new(kind, self.next_id(prefix));
        self.state.borrow_mut().objects.push(InventoryObject {
            obj: obj.clone(),
            name: name.to_string(),
            vm,
            resource_pool,
        });
        obj
    }

    pub fn add_host(&self, name: &str) -> ObjectRef {
        let pool = ObjectRef::new(ObjectKind::ResourcePool, "resgroup-host");
        self.add_object(ObjectKind::HostSystem, name, None, Some(pool))
    }

    pub fn add_cluster(&self, name: &str) -> ObjectRef {
        let pool = ObjectRef::new(ObjectKind::ResourcePool, "resgroup-cluster");
        self.add_object(ObjectKind::ClusterComputeResource, name, None, Some(pool))
    }

    pub fn add_vm(&self, name: &str, facts: VmFacts) -> ObjectRef {
        self.add_object(ObjectKind::VirtualMachine, name, Some(facts), None)
    }

    pub fn add_template(&self, name: &str) -> ObjectRef {
        self.add_vm(
            name,
            VmFacts {
                template: true,
                ..VmFacts::default()
            },
        )
    }

    pub fn add_category(&self, name: &str) -> String {
        let id = self.next_id("urn:category");
        self.state.borrow_mut().categories.push(CategoryInfo {
            id: id.clone(),
            name: name.to_string(),
            cardinality: Cardinality::Single,
            associable_types: vec![ObjectKind::VirtualMachine],
        });
        id
    }

    pub fn add_tag(&self, name: &str, category_id: &str) -> String {
        let id = self.next_id("urn:tag");
        self.state.borrow_mut().tags.push(TagInfo {
            id: id.clone(),
            name: name.to_string(),
            category_id: category_id.to_string(),
            description: String::new(),
        });
        id
    }

    pub fn attach_raw(&self, tag_id: &str, obj: &ObjectRef) {
        self.state
            .borrow_mut()
            .attachments
            .push((tag_id.to_string(), obj.clone()));
    }

    pub fn fail_task(&self, operation: &'static str, fault: TaskFault) {
        self.state.borrow_mut().task_failures.insert(operation, fault);
    }

    pub fn reject_as_missing(&self, operation: &'static str) {
        self.state.borrow_mut().rejected_as_missing.insert(operation);
    }

    pub fn fail_attach(&self, tag_name: &str) {
        self.state
            .borrow_mut()
            .failing_attach
            .insert(tag_name.to_string());
    }

    pub fn fail_detach(&self, tag_name: &str) {
        self.state
            .borrow_mut()
            .failing_detach
            .insert(tag_name.to_string());
    }

    /// Keep `obj` in view listings but report it deleted when read.
    pub fn vanish_after_listing(&self, obj: &ObjectRef) {
        self.state.borrow_mut().vanished.insert(obj.id.clone());
    }

    pub fn fail_reads(&self, obj: &ObjectRef) {
        self.state.borrow_mut().failing_reads.insert(obj.id.clone());
    }

    /// Remove an object behind the controller's back.
    pub fn remove_externally(&self, obj: &ObjectRef) {
        self.state.borrow_mut().objects.retain(|o| &o.obj != obj);
    }

    pub fn find(&self, name: &str) -> Option<InventoryObject> {
        self.state
            .borrow()
            .objects
            .iter()
            .find(|o| o.name == name)
            .cloned()
    }

    pub fn exists(&self, obj: &ObjectRef) -> bool {
        self.state.borrow().objects.iter().any(|o| &o.obj == obj)
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state.borrow().mutations.clone()
    }

    pub fn open_views(&self) -> usize {
        self.state.borrow().views.len()
    }

    pub fn category_count(&self, name: &str) -> usize {
        self.state
            .borrow()
            .categories
            .iter()
            .filter(|c| c.name == name)
            .count()
    }

    pub fn tag_count(&self, name: &str) -> usize {
        self.state.borrow().tags.iter().filter(|t| t.name == name).count()
    }

    /// Names of tags from `category` attached to `obj`.
    pub fn tags_on(&self, obj: &ObjectRef, category: &str) -> Vec<String> {
        let state = self.state.borrow();
        let Some(category_id) = state
            .categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.id.clone())
        else {
            return Vec::new();
        };
        state
            .attachments
            .iter()
            .filter(|(_, o)| o == obj)
            .filter_map(|(tag_id, _)| state.tags.iter().find(|t| &t.id == tag_id))
            .filter(|t| t.category_id == category_id)
            .map(|t| t.name.clone())
            .collect()
    }

    fn record(&self, mutation: String) {
        self.state.borrow_mut().mutations.push(mutation);
    }

    fn name_of(&self, obj: &ObjectRef) -> Option<String> {
        self.state
            .borrow()
            .objects
            .iter()
            .find(|o| &o.obj == obj)
            .map(|o| o.name.clone())
    }

    fn task(&self, state: TaskState, fault: Option<TaskFault>, result: Option<String>) -> TaskHandle {
        let id = self.next_id("task");
        self.state.borrow_mut().tasks.insert(
            id.clone(),
            TaskInfo {
                state,
                fault,
                result,
            },
        );
        TaskHandle::Remote(id)
    }

    fn injected_failure(&self, operation: &'static str) -> Option<TaskHandle> {
        let fault = self.state.borrow().task_failures.get(operation).cloned()?;
        Some(self.task(TaskState::Error, Some(fault), None))
    }

    fn gone(&self, obj: &ObjectRef) -> TaskHandle {
        self.task(
            TaskState::Error,
            Some(TaskFault::object_not_found(format!(
                "The object '{}' has already been deleted or has not been completely created",
                obj.id
            ))),
            None,
        )
    }

    fn read(&self, obj: &ObjectRef) -> Result<Option<InventoryObject>> {
        let state = self.state.borrow();
        anyhow::ensure!(
            !state.failing_reads.contains(&obj.id),
            "reading {} failed",
            obj.id
        );
        if state.vanished.contains(&obj.id) {
            return Ok(None);
        }
        Ok(state.objects.iter().find(|o| &o.obj == obj).cloned())
    }

    fn update_vm(&self, obj: &ObjectRef, f: impl FnOnce(&mut VmFacts)) {
        let mut state = self.state.borrow_mut();
        if let Some(facts) = state
            .objects
            .iter_mut()
            .find(|o| &o.obj == obj)
            .and_then(|o| o.vm.as_mut())
        {
            f(facts);
        }
    }
}

impl InventoryView for FakePlatform {
    async fn create_view(&self, kinds: &[ObjectKind]) -> Result<ViewId> {
        let id = self.next_id("session[view]");
        let mut state = self.state.borrow_mut();
        state.views.insert(id.clone(), kinds.to_vec());
        state.views_created += 1;
        Ok(ViewId(id))
    }

    async fn view_members(&self, view: &ViewId) -> Result<Vec<ObjectRef>> {
        let state = self.state.borrow();
        anyhow::ensure!(!state.fail_view_members, "view enumeration failed");
        let kinds = state
            .views
            .get(&view.0)
            .ok_or_else(|| anyhow::anyhow!("unknown view {}", view.0))?;
        Ok(state
            .objects
            .iter()
            .filter(|o| kinds.contains(&o.obj.kind))
            .map(|o| o.obj.clone())
            .collect())
    }

    async fn destroy_view(&self, view: &ViewId) -> Result<()> {
        self.state.borrow_mut().views.remove(&view.0);
        Ok(())
    }

    async fn object_name(&self, obj: &ObjectRef) -> Result<Option<String>> {
        self.state.borrow_mut().names_read += 1;
        Ok(self.read(obj)?.map(|o| o.name))
    }

    async fn describe(&self, obj: &ObjectRef, name: String) -> Result<Option<InventoryObject>> {
        self.state.borrow_mut().describes += 1;
        Ok(self.read(obj)?.map(|o| InventoryObject { name, ..o }))
    }
}

impl VmOperations for FakePlatform {
    async fn mark_as_vm(&self, vm: &ObjectRef, _: &ObjectRef, _: &ObjectRef) -> Result<TaskHandle> {
        if let Some(failed) = self.injected_failure("mark_as_vm") {
            return Ok(failed);
        }
        self.record(format!("mark_as_vm:{}", vm.id));
        self.update_vm(vm, |f| f.template = false);
        Ok(TaskHandle::Completed)
    }

    async fn mark_as_template(&self, vm: &ObjectRef) -> Result<TaskHandle> {
        if let Some(failed) = self.injected_failure("mark_as_template") {
            return Ok(failed);
        }
        self.record(format!("mark_as_template:{}", vm.id));
        self.update_vm(vm, |f| f.template = true);
        Ok(TaskHandle::Completed)
    }

    async fn create_snapshot(&self, vm: &ObjectRef, spec: &SnapshotSpec) -> Result<TaskHandle> {
        if let Some(failed) = self.injected_failure("create_snapshot") {
            return Ok(failed);
        }
        assert!(!spec.memory && !spec.quiesce, "snapshot must be crash-consistent only");
        self.record(format!("create_snapshot:{}", vm.id));
        let snapshot = self.next_id("snapshot");
        self.update_vm(vm, |f| f.root_snapshot = Some(snapshot.clone()));
        Ok(self.task(TaskState::Success, None, Some(snapshot)))
    }

    async fn clone_vm(
        &self,
        source: &ObjectRef,
        _: &ObjectRef,
        name: &str,
        spec: &CloneSpec,
    ) -> Result<TaskHandle> {
        if let Some(failed) = self.injected_failure("clone_vm") {
            return Ok(failed);
        }
        self.record(format!("clone_vm:{}:{name}", source.id));
        let actual = self
            .state
            .borrow()
            .clone_name_override
            .clone()
            .unwrap_or_else(|| name.to_string());
        let power_state = if spec.power_on {
            PowerState::PoweredOn
        } else {
            PowerState::PoweredOff
        };
        let vm = self.add_vm(
            &actual,
            VmFacts {
                template: spec.template,
                power_state,
                root_snapshot: None,
            },
        );
        Ok(self.task(TaskState::Success, None, Some(vm.id)))
    }

    async fn power_off(&self, vm: &ObjectRef) -> Result<TaskHandle> {
        if let Some(failed) = self.injected_failure("power_off") {
            return Ok(failed);
        }
        if !self.exists(vm) {
            return Ok(self.gone(vm));
        }
        self.record(format!("power_off:{}", vm.id));
        self.update_vm(vm, |f| f.power_state = PowerState::PoweredOff);
        Ok(self.task(TaskState::Success, None, None))
    }

    async fn destroy(&self, vm: &ObjectRef) -> Result<TaskHandle> {
        if self.state.borrow().rejected_as_missing.contains("destroy") {
            return Err(PlatformError::ObjectNotFound(vm.id.clone()).into());
        }
        if let Some(failed) = self.injected_failure("destroy") {
            return Ok(failed);
        }
        if !self.exists(vm) {
            return Ok(self.gone(vm));
        }
        let powered_on = self.state.borrow().objects.iter().any(|o| {
            &o.obj == vm && o.vm.as_ref().is_some_and(|f| f.power_state == PowerState::PoweredOn)
        });
        if powered_on {
            return Ok(self.task(
                TaskState::Error,
                Some(TaskFault::other("The attempted operation cannot be performed in the current state (Powered on).")),
                None,
            ));
        }
        self.record(format!(
            "destroy:{}",
            self.name_of(vm).unwrap_or_else(|| vm.id.clone())
        ));
        let mut state = self.state.borrow_mut();
        state.objects.retain(|o| &o.obj != vm);
        state.attachments.retain(|(_, o)| o != vm);
        drop(state);
        Ok(self.task(TaskState::Success, None, None))
    }

    fn root_folder(&self) -> ObjectRef {
        ObjectRef::new(ObjectKind::Folder, "group-v1")
    }
}

impl TaskMonitor for FakePlatform {
    async fn task_info(&self, task_id: &str) -> Result<TaskInfo> {
        self.state
            .borrow()
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown task {task_id}"))
    }
}

impl TagService for FakePlatform {
    async fn list_categories(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().categories.iter().map(|c| c.id.clone()).collect())
    }

    async fn get_category(&self, id: &str) -> Result<CategoryInfo> {
        self.state
            .borrow()
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown category {id}"))
    }

    async fn create_category(&self, spec: &CategorySpec) -> Result<String> {
        self.record(format!("create_category:{}", spec.name));
        let id = self.next_id("urn:category");
        self.state.borrow_mut().categories.push(CategoryInfo {
            id: id.clone(),
            name: spec.name.clone(),
            cardinality: spec.cardinality,
            associable_types: spec.associable_types.clone(),
        });
        Ok(id)
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().tags.iter().map(|t| t.id.clone()).collect())
    }

    async fn get_tag(&self, id: &str) -> Result<TagInfo> {
        self.state
            .borrow()
            .tags
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown tag {id}"))
    }

    async fn create_tag(&self, spec: &TagSpec) -> Result<String> {
        self.record(format!("create_tag:{}", spec.name));
        let id = self.next_id("urn:tag");
        self.state.borrow_mut().tags.push(TagInfo {
            id: id.clone(),
            name: spec.name.clone(),
            category_id: spec.category_id.clone(),
            description: spec.description.clone(),
        });
        Ok(id)
    }

    async fn attach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()> {
        let tag = self.get_tag(tag_id).await?;
        anyhow::ensure!(
            !self.state.borrow().failing_attach.contains(&tag.name),
            "attach of '{}' rejected",
            tag.name
        );
        self.record(format!("attach:{}", tag.name));
        let mut state = self.state.borrow_mut();
        let single = state
            .categories
            .iter()
            .any(|c| c.id == tag.category_id && c.cardinality == Cardinality::Single);
        let sibling = state.attachments.iter().any(|(t, o)| {
            o == obj
                && t != tag_id
                && state
                    .tags
                    .iter()
                    .any(|other| &other.id == t && other.category_id == tag.category_id)
        });
        anyhow::ensure!(
            !(single && sibling),
            "'{}' already carries a tag of single-cardinality category {}",
            obj.id,
            tag.category_id
        );
        if !state.attachments.iter().any(|(t, o)| t == tag_id && o == obj) {
            state.attachments.push((tag_id.to_string(), obj.clone()));
        }
        Ok(())
    }

    async fn detach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()> {
        let tag = self.get_tag(tag_id).await?;
        anyhow::ensure!(
            !self.state.borrow().failing_detach.contains(&tag.name),
            "detach of '{}' rejected",
            tag.name
        );
        self.record(format!("detach:{tag_id}"));
        self.state
            .borrow_mut()
            .attachments
            .retain(|(t, o)| !(t == tag_id && o == obj));
        Ok(())
    }

    async fn list_attached_objects(&self, tag_id: &str) -> Result<Vec<ObjectRef>> {
        Ok(self
            .state
            .borrow()
            .attachments
            .iter()
            .filter(|(t, _)| t == tag_id)
            .map(|(_, o)| o.clone())
            .collect())
    }
}

// ── Clock and reporter stubs ──────────────────────────────────────────────────

pub struct FixedClock(pub Cell<NaiveDateTime>);

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self(Cell::new(now))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0.get()
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub lines: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|l| l.strip_prefix("warn: ").map(String::from))
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.lines.borrow_mut().push(format!("step: {message}"));
    }
    fn success(&self, message: &str) {
        self.lines.borrow_mut().push(format!("success: {message}"));
    }
    fn warn(&self, message: &str) {
        self.lines.borrow_mut().push(format!("warn: {message}"));
    }
}
