//! Status Reporter

use std::sync::Arc;
use tracing::{error, info};

use crate::resources::GitRepository;
use crate::store::ResourceStore;

/// Writes the synchronized revision back onto `GitRepository` records.
#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn ResourceStore>,
}

impl StatusReporter {
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Record `revision` as the repository's current commit.
    ///
    /// Only `status_current_commit` changes; every other stored item is
    /// written back as read. Returns whether the write succeeded. Failures
    /// are logged and left for the next pass to correct.
    pub async fn report(&self, repo: &GitRepository, revision: &str) -> bool {
        match self.store.upsert(repo.record_with_commit(revision)).await {
            Ok(stored) => {
                info!(
                    git_repository = %repo.path,
                    revision,
                    modify_index = stored.modify_index,
                    "Updated GitRepository status"
                );
                true
            }
            Err(e) => {
                error!(
                    git_repository = %repo.path,
                    revision,
                    error = %e,
                    "Failed to update GitRepository status"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resources::{Items, ResourceRecord, SourceKind};
    use crate::store::MockResourceStore;

    fn repo() -> GitRepository {
        let items: Items = [
            ("controller_name", "nomadops"),
            ("url", "https://example.test/repo.git"),
            ("type", "git"),
            ("branch", "main"),
            ("status_current_commit", "old"),
        ]
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();

        GitRepository {
            namespace: "default".to_string(),
            path: "teams/web".to_string(),
            controller_name: "nomadops".to_string(),
            url: "https://example.test/repo.git".to_string(),
            source_kind: SourceKind::Git,
            branch: "main".to_string(),
            status_current_commit: Some("old".to_string()),
            record: ResourceRecord {
                modify_index: 41,
                ..ResourceRecord::new("default", "teams/web", items)
            },
        }
    }

    #[tokio::test]
    async fn report_replaces_only_current_commit() {
        let mut store = MockResourceStore::new();
        store.expect_upsert().times(1).returning(|record| {
            assert_eq!(record.path, "teams/web");
            assert_eq!(record.namespace, "default");
            assert_eq!(record.items["status_current_commit"], "new");
            assert_eq!(record.items["url"], "https://example.test/repo.git");
            assert_eq!(record.items["branch"], "main");
            assert_eq!(record.items.len(), 5);
            Ok(ResourceRecord {
                modify_index: 42,
                ..record
            })
        });

        let reporter = StatusReporter::new(Arc::new(store));
        assert!(reporter.report(&repo(), "new").await);
    }

    #[tokio::test]
    async fn write_failure_is_not_fatal() {
        let mut store = MockResourceStore::new();
        store
            .expect_upsert()
            .returning(|_| Err(Error::Config("store unavailable".to_string())));

        let reporter = StatusReporter::new(Arc::new(store));
        assert!(!reporter.report(&repo(), "new").await);
    }
}
