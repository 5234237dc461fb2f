//! Resource data model
//!
//! Every resource kind is stored as a Nomad Variable whose items are flat
//! string pairs. [`ResourceRecord`] is that envelope; the typed kinds decode
//! from and encode to it.

mod git_repository;
mod items;
mod job_group;

pub use git_repository::{GitRepository, SourceKind};
pub use job_group::{NomadJobGroup, PathSelector};
pub(crate) use job_group::{KEY_CONTROLLER_NAME, KEY_PARENT_JOB_GROUP};

use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Flat key/value items of a record.
pub type Items = BTreeMap<String, String>;

/// A stored resource: the KV envelope shared by every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
    pub namespace: String,
    /// Unique key within the namespace
    pub path: String,
    pub items: Items,
    pub modify_index: u64,
    pub modify_time: i64,
}

impl ResourceRecord {
    #[must_use]
    pub fn new(namespace: impl Into<String>, path: impl Into<String>, items: Items) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
            items,
            ..Self::default()
        }
    }
}

impl From<nomad::Variable> for ResourceRecord {
    fn from(variable: nomad::Variable) -> Self {
        Self {
            namespace: variable.namespace,
            path: variable.path,
            items: variable.items,
            modify_index: variable.modify_index,
            modify_time: variable.modify_time,
        }
    }
}

impl From<ResourceRecord> for nomad::Variable {
    fn from(record: ResourceRecord) -> Self {
        nomad::Variable {
            namespace: record.namespace,
            path: record.path,
            items: record.items,
            modify_index: record.modify_index,
            modify_time: record.modify_time,
            ..nomad::Variable::default()
        }
    }
}

/// The (name, namespace) pair scoping which resources this instance reconciles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerIdentity {
    name: String,
    namespace: String,
}

impl ControllerIdentity {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Ownership predicate: both controller name and namespace must match.
    #[must_use]
    pub fn owns(&self, object: &impl ControllerObject) -> bool {
        object.controller_name() == self.name && object.namespace() == self.namespace
    }
}

impl fmt::Display for ControllerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Capabilities the ownership filter needs from any resource kind.
pub trait ControllerObject {
    fn path(&self) -> &str;
    fn namespace(&self) -> &str;
    fn controller_name(&self) -> &str;
}

/// A typed resource kind with a strict schema over [`ResourceRecord`] items.
pub trait ResourceKind: ControllerObject + Sized {
    /// Human-readable kind name, used in logs
    const KIND: &'static str;

    /// Decode a record, rejecting missing required keys and unknown keys.
    fn decode(record: &ResourceRecord) -> Result<Self>;

    /// Encode back into a record carrying exactly the schema keys.
    fn encode(&self) -> ResourceRecord;
}

/// Keep only objects owned by `identity`, preserving order.
pub fn filter_owned<T: ResourceKind>(objects: Vec<T>, identity: &ControllerIdentity) -> Vec<T> {
    debug!(
        kind = T::KIND,
        controller = %identity,
        candidates = objects.len(),
        "Filtering resources for controller relevance"
    );

    let owned: Vec<T> = objects
        .into_iter()
        .filter(|object| {
            let owned = identity.owns(object);
            if owned {
                debug!(
                    kind = T::KIND,
                    path = object.path(),
                    namespace = object.namespace(),
                    "Accepting resource owned by this controller"
                );
            } else {
                warn!(
                    kind = T::KIND,
                    path = object.path(),
                    namespace = object.namespace(),
                    controller_name = object.controller_name(),
                    "Skipping resource that does not match controller name and namespace"
                );
            }
            owned
        })
        .collect();

    info!(kind = T::KIND, to_process = owned.len(), "Resource filtering complete");
    owned
}
