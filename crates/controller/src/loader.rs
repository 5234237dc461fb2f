//! Resource Loader & Ownership Filter

use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::resources::{filter_owned, ControllerIdentity, ResourceKind, ResourceRecord};
use crate::store::ResourceStore;

/// Lists, decodes and filters resources of one kind.
#[derive(Clone)]
pub struct ResourceLoader {
    store: Arc<dyn ResourceStore>,
    identity: ControllerIdentity,
}

impl ResourceLoader {
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, identity: ControllerIdentity) -> Self {
        Self { store, identity }
    }

    #[must_use]
    pub fn identity(&self) -> &ControllerIdentity {
        &self.identity
    }

    /// Fetch full records under `prefix`.
    ///
    /// Only the listing itself can fail; a record whose items cannot be read
    /// is logged and left out.
    pub async fn load_records(&self, prefix: &str) -> Result<Vec<ResourceRecord>> {
        let listed = self.store.list(prefix).await?;
        info!(prefix, count = listed.len(), "Fetched resource listing");

        let mut records = Vec::with_capacity(listed.len());
        for meta in listed {
            match self.store.read_items(&meta.path, &meta.namespace).await {
                Ok(items) => records.push(ResourceRecord {
                    namespace: meta.namespace,
                    path: meta.path,
                    items,
                    modify_index: meta.modify_index,
                    modify_time: meta.modify_time,
                }),
                Err(e) => {
                    error!(
                        path = %meta.path,
                        namespace = %meta.namespace,
                        error = %e,
                        "Failed to fetch resource items, skipping"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Load every owned resource of kind `K` under `prefix`, in listing order.
    #[instrument(skip(self), fields(kind = K::KIND))]
    pub async fn load<K: ResourceKind>(&self, prefix: &str) -> Result<Vec<K>> {
        let records = self.load_records(prefix).await?;
        let decoded = decode_all::<K>(&records);
        Ok(filter_owned(decoded, &self.identity))
    }
}

/// Decode records, dropping (and logging) the ones that violate the schema.
pub fn decode_all<K: ResourceKind>(records: &[ResourceRecord]) -> Vec<K> {
    records
        .iter()
        .filter_map(|record| match K::decode(record) {
            Ok(resource) => Some(resource),
            Err(e) => {
                error!(
                    kind = K::KIND,
                    path = %record.path,
                    namespace = %record.namespace,
                    error = %e,
                    "Failed to decode resource items to expected format"
                );
                None
            }
        })
        .collect()
}
