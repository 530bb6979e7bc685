//! VI/JSON side of the client: inventory views, VM operations and tasks.

use anyhow::{Context, Result};
use clonekeeper_common::{ObjectKind, ObjectRef, PowerState, TaskState};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{VsphereClient, check, decode, decode_optional};
use crate::application::ports::{
    CloneSpec, InventoryObject, InventoryView, SnapshotSpec, TaskHandle, TaskInfo, TaskMonitor,
    ViewId, VmFacts, VmOperations,
};
use crate::domain::{FaultKind, PlatformError, TaskFault};

const MOREF_TYPE_NAME: &str = "ManagedObjectReference";

// ── Wire types ────────────────────────────────────────────────────────────────

/// Managed object reference as encoded by VI/JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoRef {
    #[serde(rename = "_typeName", default = "moref_type_name")]
    type_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

fn moref_type_name() -> String {
    MOREF_TYPE_NAME.to_string()
}

impl MoRef {
    fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: moref_type_name(),
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl From<&ObjectRef> for MoRef {
    fn from(obj: &ObjectRef) -> Self {
        Self::new(obj.kind.type_name(), obj.id.clone())
    }
}

impl TryFrom<MoRef> for ObjectRef {
    type Error = clonekeeper_common::UnknownObjectKind;

    fn try_from(moref: MoRef) -> Result<Self, Self::Error> {
        Ok(Self::new(moref.kind.parse()?, moref.value))
    }
}

/// The parts of `ServiceContent` this client uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: MoRef,
    pub view_manager: MoRef,
    pub session_manager: MoRef,
}

#[derive(Debug, Deserialize)]
struct ConfigInfo {
    #[serde(default)]
    template: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotInfo {
    #[serde(default)]
    root_snapshot_list: Vec<SnapshotTree>,
}

#[derive(Debug, Deserialize)]
struct SnapshotTree {
    snapshot: MoRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeInfo {
    #[serde(default)]
    power_state: PowerState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTaskInfo {
    state: TaskState,
    error: Option<MethodFault>,
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MethodFault {
    localized_message: Option<String>,
    fault: Option<FaultType>,
}

#[derive(Debug, Deserialize)]
struct FaultType {
    #[serde(rename = "_typeName")]
    type_name: String,
}

impl From<MethodFault> for TaskFault {
    fn from(err: MethodFault) -> Self {
        let type_name = err.fault.map(|f| f.type_name).unwrap_or_default();
        let kind = if type_name == "ManagedObjectNotFound" {
            FaultKind::ObjectNotFound
        } else {
            FaultKind::Other
        };
        let message = err
            .localized_message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| if type_name.is_empty() { "task failed".to_string() } else { type_name });
        Self { kind, message }
    }
}

/// Task results are either a managed object (clone, snapshot) or a value.
fn task_result(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(ref map) => map
            .get("value")
            .or_else(|| map.get("_value"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        other => Some(other.to_string()),
    }
}

// ── Request helpers ───────────────────────────────────────────────────────────

impl VsphereClient {
    async fn get_property<T: DeserializeOwned>(&self, obj: &MoRef, property: &str) -> Result<Option<T>> {
        let path = format!("{}/{}/{property}", obj.kind, obj.value);
        let resp = self
            .vim(Method::GET, &path)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        decode_optional(check(resp, &path).await?, &path).await
    }

    async fn require_property<T: DeserializeOwned>(&self, obj: &MoRef, property: &str) -> Result<T> {
        self.get_property(obj, property).await?.ok_or_else(|| {
            PlatformError::Decode {
                path: format!("{}/{}/{property}", obj.kind, obj.value),
                message: "property is unset".to_string(),
            }
            .into()
        })
    }

    async fn invoke(&self, obj: &MoRef, method: &str, body: Option<serde_json::Value>) -> Result<reqwest::Response> {
        let path = format!("{}/{}/{method}", obj.kind, obj.value);
        let mut request = self.vim(Method::POST, &path);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        check(resp, &path).await
    }

    /// Call a `*_Task` method and return the task it started.
    async fn invoke_task(&self, obj: &MoRef, method: &str, body: Option<serde_json::Value>) -> Result<TaskHandle> {
        let resp = self.invoke(obj, method, body).await?;
        let task: MoRef = decode(resp, method).await?;
        tracing::debug!(method, target = %obj.value, task = %task.value, "task started");
        Ok(TaskHandle::Remote(task.value))
    }

    async fn vm_facts(&self, vm: &MoRef) -> Result<VmFacts> {
        let config: Option<ConfigInfo> = self.get_property(vm, "config").await?;
        let runtime: Option<RuntimeInfo> = self.get_property(vm, "runtime").await?;
        let snapshot: Option<SnapshotInfo> = self.get_property(vm, "snapshot").await?;
        Ok(VmFacts {
            template: config.is_some_and(|c| c.template),
            power_state: runtime.map(|r| r.power_state).unwrap_or_default(),
            root_snapshot: snapshot
                .and_then(|s| s.root_snapshot_list.into_iter().next())
                .map(|t| t.snapshot.value),
        })
    }

    /// Pool used to place objects on a host (its compute resource's pool) or
    /// in a cluster (the cluster's own pool).
    async fn placement_pool(&self, obj: &MoRef) -> Result<Option<ObjectRef>> {
        let owner = match obj.kind.as_str() {
            "HostSystem" => self.require_property::<MoRef>(obj, "parent").await?,
            "ClusterComputeResource" => obj.clone(),
            _ => return Ok(None),
        };
        let pool: Option<MoRef> = self.get_property(&owner, "resourcePool").await?;
        Ok(pool.map(|p| ObjectRef::new(ObjectKind::ResourcePool, p.value)))
    }
}

/// Maps a read that failed because `obj` was deleted to `None`.
fn unless_gone<T>(obj: &ObjectRef, read: Result<T>) -> Result<Option<T>> {
    match read {
        Ok(value) => Ok(Some(value)),
        Err(e) if matches!(e.downcast_ref::<PlatformError>(), Some(PlatformError::ObjectNotFound(_))) => {
            tracing::debug!(object = %obj.id, "object vanished while being read");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ── Port implementations ──────────────────────────────────────────────────────

impl InventoryView for VsphereClient {
    async fn create_view(&self, kinds: &[ObjectKind]) -> Result<ViewId> {
        let types: Vec<&str> = kinds.iter().map(|k| k.type_name()).collect();
        let resp = self
            .invoke(
                &self.content.view_manager,
                "CreateContainerView",
                Some(json!({
                    "container": self.content.root_folder,
                    "type": types,
                    "recursive": true,
                })),
            )
            .await?;
        let view: MoRef = decode(resp, "CreateContainerView").await?;
        Ok(ViewId(view.value))
    }

    async fn view_members(&self, view: &ViewId) -> Result<Vec<ObjectRef>> {
        let view = MoRef::new("ContainerView", view.0.clone());
        let members: Vec<MoRef> = self.get_property(&view, "view").await?.unwrap_or_default();
        members
            .into_iter()
            .map(|member| {
                let kind = member.kind.clone();
                ObjectRef::try_from(member).with_context(|| format!("view returned an object of type {kind}"))
            })
            .collect()
    }

    async fn destroy_view(&self, view: &ViewId) -> Result<()> {
        self.invoke(&MoRef::new("ContainerView", view.0.clone()), "DestroyView", None)
            .await?;
        Ok(())
    }

    async fn object_name(&self, obj: &ObjectRef) -> Result<Option<String>> {
        unless_gone(obj, self.require_property::<String>(&obj.into(), "name").await)
    }

    async fn describe(&self, obj: &ObjectRef, name: String) -> Result<Option<InventoryObject>> {
        let moref = MoRef::from(obj);
        let vm = if obj.kind == ObjectKind::VirtualMachine {
            match unless_gone(obj, self.vm_facts(&moref).await)? {
                Some(facts) => Some(facts),
                None => return Ok(None),
            }
        } else {
            None
        };
        let Some(resource_pool) = unless_gone(obj, self.placement_pool(&moref).await)? else {
            return Ok(None);
        };
        Ok(Some(InventoryObject {
            obj: obj.clone(),
            name,
            vm,
            resource_pool,
        }))
    }
}

impl VmOperations for VsphereClient {
    async fn mark_as_vm(&self, vm: &ObjectRef, pool: &ObjectRef, host: &ObjectRef) -> Result<TaskHandle> {
        self.invoke(
            &vm.into(),
            "MarkAsVirtualMachine",
            Some(json!({ "pool": MoRef::from(pool), "host": MoRef::from(host) })),
        )
        .await?;
        Ok(TaskHandle::Completed)
    }

    async fn mark_as_template(&self, vm: &ObjectRef) -> Result<TaskHandle> {
        self.invoke(&vm.into(), "MarkAsTemplate", None).await?;
        Ok(TaskHandle::Completed)
    }

    async fn create_snapshot(&self, vm: &ObjectRef, spec: &SnapshotSpec) -> Result<TaskHandle> {
        self.invoke_task(
            &vm.into(),
            "CreateSnapshot_Task",
            Some(json!({
                "name": spec.name,
                "description": spec.description,
                "memory": spec.memory,
                "quiesce": spec.quiesce,
            })),
        )
        .await
    }

    async fn clone_vm(
        &self,
        source: &ObjectRef,
        folder: &ObjectRef,
        name: &str,
        spec: &CloneSpec,
    ) -> Result<TaskHandle> {
        let body = json!({
            "folder": MoRef::from(folder),
            "name": name,
            "spec": {
                "_typeName": "VirtualMachineCloneSpec",
                "location": {
                    "_typeName": "VirtualMachineRelocateSpec",
                    "datastore": MoRef::from(&spec.location.datastore),
                    "pool": MoRef::from(&spec.location.pool),
                    "diskMoveType": spec.location.disk_move.as_str(),
                },
                "powerOn": spec.power_on,
                "template": spec.template,
                "snapshot": MoRef::new("VirtualMachineSnapshot", spec.snapshot.clone()),
            },
        });
        self.invoke_task(&source.into(), "CloneVM_Task", Some(body)).await
    }

    async fn power_off(&self, vm: &ObjectRef) -> Result<TaskHandle> {
        self.invoke_task(&vm.into(), "PowerOffVM_Task", None).await
    }

    async fn destroy(&self, vm: &ObjectRef) -> Result<TaskHandle> {
        self.invoke_task(&vm.into(), "Destroy_Task", None).await
    }

    fn root_folder(&self) -> ObjectRef {
        ObjectRef::new(ObjectKind::Folder, self.content.root_folder.value.clone())
    }
}

impl TaskMonitor for VsphereClient {
    async fn task_info(&self, task_id: &str) -> Result<TaskInfo> {
        let info: WireTaskInfo = self
            .require_property(&MoRef::new("Task", task_id), "info")
            .await?;
        Ok(TaskInfo {
            state: info.state,
            fault: info.error.map(TaskFault::from),
            result: info.result.and_then(task_result),
        })
    }
}
