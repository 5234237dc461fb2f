//! Apply Engine
//!
//! Submits materialized jobs to Nomad one at a time. A failed registration is
//! logged and counted; it never stops the rest of the batch.

use async_trait::async_trait;
use nomad::NomadClient;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::materialize::{JobSpec, MaterializedJob};

/// Registers jobs with the orchestrator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRegistrar: Send + Sync {
    /// Submit `spec`, returning the evaluation ID.
    async fn register(&self, spec: &JobSpec) -> Result<String>;
}

#[async_trait]
impl JobRegistrar for NomadClient {
    async fn register(&self, spec: &JobSpec) -> Result<String> {
        self.register_job(spec.as_map())
            .await
            .map(|response| response.eval_id)
            .map_err(|e| Error::Register {
                job: spec.name().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Outcome counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub registered: usize,
    pub failed: usize,
}

impl ApplyReport {
    pub fn merge(&mut self, other: ApplyReport) {
        self.registered += other.registered;
        self.failed += other.failed;
    }
}

#[derive(Clone)]
pub struct ApplyEngine {
    registrar: Arc<dyn JobRegistrar>,
}

impl ApplyEngine {
    #[must_use]
    pub fn new(registrar: Arc<dyn JobRegistrar>) -> Self {
        Self { registrar }
    }

    pub async fn apply(&self, spec: &JobSpec) -> Result<String> {
        let eval_id = self.registrar.register(spec).await?;
        info!(job = spec.name(), eval_id = %eval_id, "Job registered");
        Ok(eval_id)
    }

    pub async fn apply_all(&self, jobs: &[MaterializedJob]) -> ApplyReport {
        let mut report = ApplyReport::default();
        for job in jobs {
            match self.apply(&job.spec).await {
                Ok(_) => report.registered += 1,
                Err(e) => {
                    error!(
                        job = job.spec.name(),
                        file = %job.file.display(),
                        error = %e,
                        "Failed to register job, continuing"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}
