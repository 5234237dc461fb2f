//! Reconciliation Driver
//!
//! One pass runs the `GitRepository` controller, then the `NomadJobGroup`
//! controller. Every resource is handled in listing order, one at a time;
//! a failure is logged against the resource and the pass moves on.

use chrono::{DateTime, Utc};
use nomad::NomadClient;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::apply::{ApplyEngine, ApplyReport, JobRegistrar};
use crate::config::ControllerConfig;
use crate::discovery::discover_selected;
use crate::error::{Error, Result};
use crate::loader::ResourceLoader;
use crate::materialize::{NomadSpecParser, Provenance, SpecMaterializer, SpecParser};
use crate::paths::RepositoryPathResolver;
use crate::resources::{GitRepository, NomadJobGroup, ResourceKind, KEY_CONTROLLER_NAME};
use crate::status::StatusReporter;
use crate::store::ResourceStore;
use crate::sync::{GitCli, GitTransport, RepositorySynchronizer};

/// Counters describing one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub repositories_synced: usize,
    pub repositories_failed: usize,
    pub statuses_reported: usize,
    pub job_groups_reconciled: usize,
    pub job_groups_skipped: usize,
    pub job_groups_generated: usize,
    pub jobs: ApplyReport,
}

/// State of one repository after this pass's sync.
#[derive(Debug, Clone)]
struct RepositoryState {
    repo: GitRepository,
    /// Working copy, present only when this pass synchronized it
    working_copy: Option<PathBuf>,
    revision: Option<String>,
}

impl RepositoryState {
    fn commit(&self) -> String {
        self.revision
            .clone()
            .or_else(|| self.repo.status_current_commit.clone())
            .unwrap_or_default()
    }
}

/// Drives reconciliation passes. Safe to share; overlapping passes are
/// refused rather than run concurrently.
pub struct Reconciler {
    loader: ResourceLoader,
    store: Arc<dyn ResourceStore>,
    synchronizer: RepositorySynchronizer,
    materializer: SpecMaterializer,
    applier: ApplyEngine,
    reporter: StatusReporter,
    git_repository_prefix: String,
    job_group_prefix: String,
    in_flight: Mutex<()>,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        config: &ControllerConfig,
        store: Arc<dyn ResourceStore>,
        transport: Arc<dyn GitTransport>,
        parser: Arc<dyn SpecParser>,
        registrar: Arc<dyn JobRegistrar>,
    ) -> Self {
        Self {
            loader: ResourceLoader::new(Arc::clone(&store), config.identity()),
            reporter: StatusReporter::new(Arc::clone(&store)),
            store,
            synchronizer: RepositorySynchronizer::new(
                RepositoryPathResolver::new(config.clone_base_path()),
                transport,
            ),
            materializer: SpecMaterializer::new(parser),
            applier: ApplyEngine::new(registrar),
            git_repository_prefix: config.git_repository_prefix.clone(),
            job_group_prefix: config.job_group_prefix.clone(),
            in_flight: Mutex::new(()),
        }
    }

    /// Wire every stage to a single Nomad cluster and the `git` CLI.
    #[must_use]
    pub fn for_nomad(config: &ControllerConfig, client: NomadClient) -> Self {
        let transport = GitCli::new().with_timeout(config.git_timeout());
        let parser = NomadSpecParser::new(client.clone());
        let client = Arc::new(client);
        Self::new(
            config,
            client.clone(),
            Arc::new(transport),
            Arc::new(parser),
            client,
        )
    }

    /// Run one full pass.
    ///
    /// Returns `None` without doing anything when another pass is still in
    /// flight.
    pub async fn run_pass(&self) -> Option<PassReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Reconciliation pass already in progress, skipping trigger");
            return None;
        };

        let mut report = PassReport {
            started_at: Utc::now(),
            ..PassReport::default()
        };
        info!(
            controller = %self.loader.identity(),
            started_at = %report.started_at,
            "Starting reconciliation pass"
        );

        let repositories = self.reconcile_git_repositories(&mut report).await;
        self.reconcile_job_groups(&repositories, &mut report).await;

        info!(
            repositories_synced = report.repositories_synced,
            repositories_failed = report.repositories_failed,
            job_groups_reconciled = report.job_groups_reconciled,
            job_groups_skipped = report.job_groups_skipped,
            job_groups_generated = report.job_groups_generated,
            jobs_registered = report.jobs.registered,
            jobs_failed = report.jobs.failed,
            "Reconciliation pass complete"
        );
        Some(report)
    }

    #[instrument(skip_all, fields(kind = GitRepository::KIND))]
    async fn reconcile_git_repositories(
        &self,
        report: &mut PassReport,
    ) -> HashMap<String, RepositoryState> {
        let repos: Vec<GitRepository> = match self.loader.load(&self.git_repository_prefix).await {
            Ok(repos) => repos,
            Err(e) => {
                error!(error = %e, "Failed to load GitRepository resources");
                return HashMap::new();
            }
        };

        let mut states = HashMap::with_capacity(repos.len());
        for repo in repos {
            let state = match self.synchronizer.sync(&repo).await {
                Ok(outcome) => {
                    report.repositories_synced += 1;
                    if let Some(revision) = &outcome.revision {
                        if self.reporter.report(&repo, revision).await {
                            report.statuses_reported += 1;
                        }
                    }
                    RepositoryState {
                        repo,
                        working_copy: Some(outcome.path),
                        revision: outcome.revision,
                    }
                }
                Err(e) => {
                    report.repositories_failed += 1;
                    error!(
                        git_repository = %repo.path,
                        category = e.category(),
                        error = %e,
                        "Failed to synchronize GitRepository"
                    );
                    RepositoryState {
                        repo,
                        working_copy: None,
                        revision: None,
                    }
                }
            };
            states.insert(state.repo.path.clone(), state);
        }
        states
    }

    #[instrument(skip_all, fields(kind = NomadJobGroup::KIND))]
    async fn reconcile_job_groups(
        &self,
        repositories: &HashMap<String, RepositoryState>,
        report: &mut PassReport,
    ) {
        let groups: Vec<NomadJobGroup> = match self.loader.load(&self.job_group_prefix).await {
            Ok(groups) => groups,
            Err(e) => {
                error!(error = %e, "Failed to load NomadJobGroup resources");
                return;
            }
        };

        let index: HashMap<&str, &NomadJobGroup> =
            groups.iter().map(|g| (g.path.as_str(), g)).collect();

        for group in &groups {
            match self
                .reconcile_job_group(group, &index, repositories, report)
                .await
            {
                Ok(()) => report.job_groups_reconciled += 1,
                Err(e) => {
                    report.job_groups_skipped += 1;
                    error!(
                        job_group = %group.path,
                        category = e.category(),
                        error = %e,
                        "Skipping NomadJobGroup"
                    );
                }
            }
        }
    }

    async fn reconcile_job_group(
        &self,
        group: &NomadJobGroup,
        index: &HashMap<&str, &NomadJobGroup>,
        repositories: &HashMap<String, RepositoryState>,
        report: &mut PassReport,
    ) -> Result<()> {
        let state = repositories
            .get(&group.git_repository_name)
            .ok_or_else(|| Error::MissingRepository {
                job_group: group.path.clone(),
                repository: group.git_repository_name.clone(),
            })?;
        let working_copy = state.working_copy.as_ref().ok_or_else(|| Error::Sync {
            repository: state.repo.path.clone(),
            reason: "not synchronized in this pass".to_string(),
        })?;

        if let Some(selector) = &group.groups {
            match discover_selected(working_copy, selector) {
                Ok(files) => {
                    let generated = self.materializer.materialize_groups(&files, group).await;
                    for child in generated {
                        if self.write_generated(group, child, index).await {
                            report.job_groups_generated += 1;
                        }
                    }
                }
                Err(e) => error!(
                    job_group = %group.path,
                    error = %e,
                    "Failed to discover job group descriptors"
                ),
            }
        }

        let files = discover_selected(working_copy, &group.jobs)?;
        info!(job_group = %group.path, files = files.len(), "Discovered job files");

        let provenance = Provenance {
            commit: state.commit(),
            reconciled_at: report.started_at,
            job_group: group.path.clone(),
            git_repository: state.repo.path.clone(),
            controller: self.loader.identity().clone(),
        };
        let jobs = self.materializer.materialize_jobs(&files, &provenance).await;
        report.jobs.merge(self.applier.apply_all(&jobs).await);
        Ok(())
    }

    async fn write_generated(
        &self,
        generator: &NomadJobGroup,
        child: NomadJobGroup,
        index: &HashMap<&str, &NomadJobGroup>,
    ) -> bool {
        let checked = self
            .check_scope(&child, generator)
            .await
            .and_then(|()| reject_cycle(&child, generator, index));
        if let Err(e) = checked {
            error!(
                job_group = %generator.path,
                generated = %child.path,
                category = e.category(),
                error = %e,
                "Rejecting generated NomadJobGroup"
            );
            return false;
        }

        match self.store.upsert(child.encode()).await {
            Ok(_) => {
                info!(
                    job_group = %generator.path,
                    generated = %child.path,
                    namespace = %child.namespace,
                    "Wrote generated NomadJobGroup"
                );
                true
            }
            Err(e) => {
                error!(
                    job_group = %generator.path,
                    generated = %child.path,
                    error = %e,
                    "Failed to write generated NomadJobGroup"
                );
                false
            }
        }
    }

    /// A generated group must be an owned record under the job group prefix.
    /// It may not replace a stored record that another controller owns.
    async fn check_scope(&self, child: &NomadJobGroup, generator: &NomadJobGroup) -> Result<()> {
        let identity = self.loader.identity();
        let out_of_scope = |reason: String| Error::OutOfScope {
            path: child.path.clone(),
            generator: generator.path.clone(),
            reason,
        };

        let named = child
            .path
            .strip_prefix(self.job_group_prefix.as_str())
            .is_some_and(|name| !name.is_empty());
        if !named {
            return Err(out_of_scope(format!("path is outside '{}'", self.job_group_prefix)));
        }
        if !identity.owns(child) {
            return Err(out_of_scope(format!("not owned by controller '{identity}'")));
        }

        // a missing record reads as an error; only a foreign owner blocks the write
        if let Ok(existing) = self.store.read_items(&child.path, &child.namespace).await {
            let owner = existing.get(KEY_CONTROLLER_NAME).map(String::as_str);
            if owner != Some(identity.name()) {
                return Err(out_of_scope(format!(
                    "existing record is owned by '{}'",
                    owner.unwrap_or_default()
                )));
            }
        }
        Ok(())
    }
}

/// Fail when `child` is `generator` or one of its ancestors.
fn reject_cycle(
    child: &NomadJobGroup,
    generator: &NomadJobGroup,
    index: &HashMap<&str, &NomadJobGroup>,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut current = Some(generator);
    while let Some(group) = current {
        if !seen.insert(group.path.as_str()) {
            break;
        }
        if group.path == child.path {
            return Err(Error::Cycle {
                path: child.path.clone(),
                generator: generator.path.clone(),
            });
        }
        current = group
            .parent_job_group
            .as_deref()
            .and_then(|parent| index.get(parent).copied());
    }
    Ok(())
}
