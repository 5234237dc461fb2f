//! Resource Store Gateway
//!
//! Read/write access to the KV store holding resource records. The engine
//! only depends on [`ResourceStore`]; [`nomad::NomadClient`] implements it on
//! top of Nomad Variables.

use async_trait::async_trait;
use nomad::NomadClient;

use crate::error::{Error, Result};
use crate::resources::{Items, ResourceRecord};

/// Listing entry: identity of a record without its items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMetadata {
    pub namespace: String,
    pub path: String,
    pub modify_index: u64,
    pub modify_time: i64,
}

/// KV operations the engine needs. No schema validation happens here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List records whose path starts with `prefix`, in store order.
    async fn list(&self, prefix: &str) -> Result<Vec<RecordMetadata>>;

    /// Fetch the items of one record.
    async fn read_items(&self, path: &str, namespace: &str) -> Result<Items>;

    /// Create or overwrite a record, returning what was stored.
    async fn upsert(&self, record: ResourceRecord) -> Result<ResourceRecord>;
}

#[async_trait]
impl ResourceStore for NomadClient {
    async fn list(&self, prefix: &str) -> Result<Vec<RecordMetadata>> {
        let listed = self
            .list_variables(prefix, nomad::ALL_NAMESPACES)
            .await
            .map_err(|source| Error::Store {
                path: prefix.to_string(),
                source,
            })?;

        Ok(listed
            .into_iter()
            .map(|meta| RecordMetadata {
                namespace: meta.namespace,
                path: meta.path,
                modify_index: meta.modify_index,
                modify_time: meta.modify_time,
            })
            .collect())
    }

    async fn read_items(&self, path: &str, namespace: &str) -> Result<Items> {
        self.read_variable(path, namespace)
            .await
            .map(|variable| variable.items)
            .map_err(|source| Error::Store {
                path: path.to_string(),
                source,
            })
    }

    async fn upsert(&self, record: ResourceRecord) -> Result<ResourceRecord> {
        let path = record.path.clone();
        self.upsert_variable(&record.into())
            .await
            .map(ResourceRecord::from)
            .map_err(|source| Error::Store { path, source })
    }
}
