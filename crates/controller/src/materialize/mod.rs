//! Spec Materializer
//!
//! Turns discovered files into either stamped job specs ready for
//! registration, or `NomadJobGroup` resources generated by a parent group.

mod descriptor;
mod job;

pub use descriptor::parse_group_descriptor;
pub use job::{
    JobSpec, Provenance, META_CONTROLLER_NAME, META_CONTROLLER_NAMESPACE, META_CURRENT_COMMIT,
    META_GIT_REPOSITORY, META_JOB_GROUP, META_LAST_RECONCILIATION, META_MANAGED,
};

use async_trait::async_trait;
use nomad::NomadClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::resources::{NomadJobGroup, ResourceKind, ResourceRecord, KEY_PARENT_JOB_GROUP};

/// Decodes file content. Pure with respect to the filesystem.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpecParser: Send + Sync {
    /// Parse a job specification. `file` only labels errors.
    async fn parse_workload_spec(&self, file: &str, text: &str) -> Result<JobSpec>;

    /// Parse a job group descriptor. `file` only labels errors.
    async fn parse_group_descriptor(&self, file: &str, text: &str) -> Result<ResourceRecord>;
}

/// Parses jobs through the Nomad API and descriptors locally.
#[derive(Clone)]
pub struct NomadSpecParser {
    client: NomadClient,
}

impl NomadSpecParser {
    #[must_use]
    pub fn new(client: NomadClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpecParser for NomadSpecParser {
    async fn parse_workload_spec(&self, file: &str, text: &str) -> Result<JobSpec> {
        self.client
            .parse_job(text)
            .await
            .map(JobSpec::new)
            .map_err(|e| Error::Parse {
                file: file.to_string(),
                reason: e.to_string(),
            })
    }

    async fn parse_group_descriptor(&self, file: &str, text: &str) -> Result<ResourceRecord> {
        parse_group_descriptor(file, text)
    }
}

/// A job parsed from one file and stamped with provenance.
#[derive(Debug, Clone)]
pub struct MaterializedJob {
    pub file: PathBuf,
    pub spec: JobSpec,
}

/// Reads and parses discovered files, skipping the ones that fail.
#[derive(Clone)]
pub struct SpecMaterializer {
    parser: Arc<dyn SpecParser>,
}

impl SpecMaterializer {
    #[must_use]
    pub fn new(parser: Arc<dyn SpecParser>) -> Self {
        Self { parser }
    }

    /// Parse each file as a job and stamp it with `provenance`.
    pub async fn materialize_jobs(
        &self,
        files: &[PathBuf],
        provenance: &Provenance,
    ) -> Vec<MaterializedJob> {
        let mut jobs = Vec::with_capacity(files.len());
        for file in files {
            match self.materialize_job(file, provenance).await {
                Ok(spec) => {
                    debug!(file = %file.display(), job = spec.name(), "Materialized job");
                    jobs.push(MaterializedJob {
                        file: file.clone(),
                        spec,
                    });
                }
                Err(e) => error!(
                    file = %file.display(),
                    job_group = %provenance.job_group,
                    error = %e,
                    "Failed to materialize job, skipping"
                ),
            }
        }
        jobs
    }

    async fn materialize_job(&self, file: &Path, provenance: &Provenance) -> Result<JobSpec> {
        let text = read(file).await?;
        let mut spec = self
            .parser
            .parse_workload_spec(&file.display().to_string(), &text)
            .await?;
        provenance.stamp(&mut spec);
        Ok(spec)
    }

    /// Parse each file as a descriptor of a job group generated by `generator`.
    ///
    /// Generated groups default to the generator's namespace and always
    /// carry `parent_job_group = generator.path`.
    pub async fn materialize_groups(
        &self,
        files: &[PathBuf],
        generator: &NomadJobGroup,
    ) -> Vec<NomadJobGroup> {
        let mut groups = Vec::with_capacity(files.len());
        for file in files {
            match self.materialize_group(file, generator).await {
                Ok(group) => {
                    debug!(
                        file = %file.display(),
                        job_group = %group.path,
                        "Materialized job group"
                    );
                    groups.push(group);
                }
                Err(e) => error!(
                    file = %file.display(),
                    job_group = %generator.path,
                    error = %e,
                    "Failed to materialize job group, skipping"
                ),
            }
        }
        groups
    }

    async fn materialize_group(
        &self,
        file: &Path,
        generator: &NomadJobGroup,
    ) -> Result<NomadJobGroup> {
        let text = read(file).await?;
        let mut record = self
            .parser
            .parse_group_descriptor(&file.display().to_string(), &text)
            .await?;
        if record.namespace.is_empty() {
            record.namespace.clone_from(&generator.namespace);
        }
        record
            .items
            .insert(KEY_PARENT_JOB_GROUP.to_string(), generator.path.clone());
        NomadJobGroup::decode(&record)
    }
}

async fn read(file: &Path) -> Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .map_err(|e| Error::io(file, e))
}
