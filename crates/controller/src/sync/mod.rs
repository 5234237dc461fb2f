//! Repository Synchronizer
//!
//! Brings the local working copy of a `GitRepository` up to date. Content is
//! staged next to the working copy and swapped in only once complete, so a
//! failed sync leaves the previous copy in place.

mod copy;
mod git;

pub use copy::copy_tree;
pub use git::{GitCli, GitTransport};

#[cfg(test)]
pub use git::MockGitTransport;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::paths::RepositoryPathResolver;
use crate::resources::{GitRepository, SourceKind};

const STAGING_PREFIX: &str = ".staging-";

/// Result of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Working-copy directory, now holding fresh content
    pub path: PathBuf,
    /// Revision checked out; `None` for local-directory sources
    pub revision: Option<String>,
}

/// Clones or copies repository content into resolver-assigned directories.
#[derive(Clone)]
pub struct RepositorySynchronizer {
    resolver: RepositoryPathResolver,
    transport: Arc<dyn GitTransport>,
}

impl RepositorySynchronizer {
    #[must_use]
    pub fn new(resolver: RepositoryPathResolver, transport: Arc<dyn GitTransport>) -> Self {
        Self {
            resolver,
            transport,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &RepositoryPathResolver {
        &self.resolver
    }

    /// Synchronize `repo` into its working-copy directory.
    #[instrument(skip(self, repo), fields(repository = %repo.path, kind = %repo.source_kind))]
    pub async fn sync(&self, repo: &GitRepository) -> Result<SyncOutcome> {
        let resource_dir = self.resolver.resource_dir(repo);
        let target = self.resolver.resolve(repo);

        tokio::fs::create_dir_all(&resource_dir)
            .await
            .map_err(|e| Error::io(&resource_dir, e))?;

        let staging = resource_dir.join(format!("{STAGING_PREFIX}{}", Uuid::new_v4()));
        debug!(staging = %staging.display(), "Staging repository content");

        let revision = match self.fetch(repo, &staging).await {
            Ok(revision) => revision,
            Err(e) => {
                discard(&staging).await;
                return Err(e);
            }
        };

        if let Err(e) = swap_into_place(&staging, &target).await {
            discard(&staging).await;
            return Err(e);
        }
        prune_stale_entries(&resource_dir, &target).await;

        info!(
            path = %target.display(),
            revision = revision.as_deref().unwrap_or("-"),
            "Repository synchronized"
        );
        Ok(SyncOutcome {
            path: target,
            revision,
        })
    }

    async fn fetch(&self, repo: &GitRepository, staging: &Path) -> Result<Option<String>> {
        let wrap = |e: Error| match e {
            Error::Sync { reason, .. } => Error::Sync {
                repository: repo.path.clone(),
                reason,
            },
            other => Error::Sync {
                repository: repo.path.clone(),
                reason: other.to_string(),
            },
        };

        match repo.source_kind {
            SourceKind::Git => self
                .transport
                .clone_shallow(&repo.url, &repo.branch, staging)
                .await
                .map(Some)
                .map_err(wrap),
            SourceKind::LocalDirectory => {
                let source = PathBuf::from(&repo.url);
                let destination = staging.to_path_buf();
                tokio::task::spawn_blocking(move || copy_tree(&source, &destination))
                    .await
                    .map_err(|e| Error::Sync {
                        repository: repo.path.clone(),
                        reason: format!("copy task failed: {e}"),
                    })?
                    .map(|()| None)
                    .map_err(wrap)
            }
        }
    }
}

async fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
    match tokio::fs::symlink_metadata(target).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(target)
            .await
            .map_err(|e| Error::io(target, e))?,
        Ok(_) => tokio::fs::remove_file(target)
            .await
            .map_err(|e| Error::io(target, e))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(target, e)),
    }

    tokio::fs::rename(staging, target)
        .await
        .map_err(|e| Error::io(target, e))
}

async fn discard(staging: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(staging).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %staging.display(), error = %e, "Failed to remove staging directory");
        }
    }
}

/// Remove leftovers from earlier URLs or interrupted syncs.
async fn prune_stale_entries(resource_dir: &Path, keep: &Path) {
    let mut entries = match tokio::fs::read_dir(resource_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                path = %resource_dir.display(),
                error = %e,
                "Failed to list repository directory"
            );
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(
                    path = %resource_dir.display(),
                    error = %e,
                    "Failed to list repository directory"
                );
                break;
            }
        };
        let path = entry.path();
        if path == keep {
            continue;
        }
        let removed = match entry.file_type().await {
            Ok(kind) if kind.is_dir() => tokio::fs::remove_dir_all(&path).await,
            _ => tokio::fs::remove_file(&path).await,
        };
        match removed {
            Ok(()) => debug!(path = %path.display(), "Removed stale working copy"),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove stale working copy"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceRecord;
    use std::fs;
    use tempfile::TempDir;

    fn repo(path: &str, url: &str, kind: SourceKind) -> GitRepository {
        GitRepository {
            namespace: "default".to_string(),
            path: path.to_string(),
            controller_name: "nomadops".to_string(),
            url: url.to_string(),
            source_kind: kind,
            branch: "main".to_string(),
            status_current_commit: None,
            record: ResourceRecord::default(),
        }
    }

    fn fake_clone(revision: &'static str) -> MockGitTransport {
        let mut transport = MockGitTransport::new();
        transport
            .expect_clone_shallow()
            .returning(move |_, _, destination| {
                fs::create_dir_all(destination.join("jobs")).unwrap();
                fs::write(destination.join("jobs/web.nomad"), revision).unwrap();
                Ok(revision.to_string())
            });
        transport
    }

    #[tokio::test]
    async fn git_sync_reports_revision_and_replaces_content() {
        let base = TempDir::new().unwrap();
        let synchronizer = RepositorySynchronizer::new(
            RepositoryPathResolver::new(base.path()),
            Arc::new(fake_clone("abc123")),
        );
        let repo = repo("teams/web", "https://example.test/web.git", SourceKind::Git);

        let target = synchronizer.resolver().resolve(&repo);
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        let outcome = synchronizer.sync(&repo).await.unwrap();

        assert_eq!(outcome.revision.as_deref(), Some("abc123"));
        assert_eq!(outcome.path, target);
        assert!(!target.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(target.join("jobs/web.nomad")).unwrap(), "abc123");
    }

    #[tokio::test]
    async fn failed_clone_keeps_previous_copy() {
        let base = TempDir::new().unwrap();
        let mut transport = MockGitTransport::new();
        transport.expect_clone_shallow().returning(|url, _, _| {
            Err(Error::Sync {
                repository: url.to_string(),
                reason: "could not resolve host".to_string(),
            })
        });
        let synchronizer = RepositorySynchronizer::new(
            RepositoryPathResolver::new(base.path()),
            Arc::new(transport),
        );
        let repo = repo("teams/web", "https://unreachable.test/web.git", SourceKind::Git);

        let target = synchronizer.resolver().resolve(&repo);
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("web.nomad"), "previous").unwrap();

        let err = synchronizer.sync(&repo).await.unwrap_err();
        assert!(matches!(err, Error::Sync { ref repository, .. } if repository == "teams/web"));

        assert_eq!(fs::read_to_string(target.join("web.nomad")).unwrap(), "previous");
        let leftovers: Vec<_> = fs::read_dir(synchronizer.resolver().resource_dir(&repo))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("web.git")]);
    }

    #[tokio::test]
    async fn local_directory_sync_has_no_revision() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("job.spec"), "job").unwrap();
        let base = TempDir::new().unwrap();

        let mut transport = MockGitTransport::new();
        transport.expect_clone_shallow().never();
        let synchronizer = RepositorySynchronizer::new(
            RepositoryPathResolver::new(base.path()),
            Arc::new(transport),
        );
        let repo = repo(
            "teams/payments",
            &source.path().display().to_string(),
            SourceKind::LocalDirectory,
        );

        let outcome = synchronizer.sync(&repo).await.unwrap();
        assert!(outcome.revision.is_none());
        assert!(outcome.path.join("job.spec").is_file());
    }

    #[tokio::test]
    async fn url_change_prunes_old_working_copy() {
        let base = TempDir::new().unwrap();
        let synchronizer = RepositorySynchronizer::new(
            RepositoryPathResolver::new(base.path()),
            Arc::new(fake_clone("def456")),
        );

        let old = repo("teams/web", "https://example.test/old.git", SourceKind::Git);
        let new = repo("teams/web", "https://example.test/new.git", SourceKind::Git);

        let old_path = synchronizer.sync(&old).await.unwrap().path;
        let new_path = synchronizer.sync(&new).await.unwrap().path;

        assert!(!old_path.exists());
        assert!(new_path.exists());
    }
}
