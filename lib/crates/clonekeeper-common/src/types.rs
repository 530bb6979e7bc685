use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a platform inventory object.
///
/// The serialized form is the platform's managed-object type name, which is
/// also what the tag association service expects in an object id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    VirtualMachine,
    HostSystem,
    Datastore,
    ClusterComputeResource,
    Folder,
    ResourcePool,
}

impl ObjectKind {
    /// Platform type name, e.g. `"VirtualMachine"`.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::VirtualMachine => "VirtualMachine",
            Self::HostSystem => "HostSystem",
            Self::Datastore => "Datastore",
            Self::ClusterComputeResource => "ClusterComputeResource",
            Self::Folder => "Folder",
            Self::ResourcePool => "ResourcePool",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown object kind: {0}")]
pub struct UnknownObjectKind(pub String);

impl FromStr for ObjectKind {
    type Err = UnknownObjectKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VirtualMachine" => Ok(Self::VirtualMachine),
            "HostSystem" => Ok(Self::HostSystem),
            "Datastore" => Ok(Self::Datastore),
            "ClusterComputeResource" => Ok(Self::ClusterComputeResource),
            "Folder" => Ok(Self::Folder),
            "ResourcePool" => Ok(Self::ResourcePool),
            other => Err(UnknownObjectKind(other.to_string())),
        }
    }
}

/// Opaque reference to an object owned by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub id: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn vm(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::VirtualMachine, id)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Power state of a virtual machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PowerState {
    PoweredOn,
    #[default]
    PoweredOff,
    Suspended,
}

/// State of an asynchronous platform task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}
