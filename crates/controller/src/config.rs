//! Controller Configuration
//!
//! All settings come from command-line flags with environment variable
//! fallbacks, so the controller can be configured entirely through the `env`
//! block of the Nomad job that runs it.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::resources::ControllerIdentity;

/// Default KV prefix for `GitRepository` resources
pub const DEFAULT_GIT_REPOSITORY_PREFIX: &str = "nomadops/v1/gitrepository/";
/// Default KV prefix for `NomadJobGroup` resources
pub const DEFAULT_JOB_GROUP_PREFIX: &str = "nomadops/v1/nomadjobgroup/";
/// Parent of the per-controller clone directory
pub const DEFAULT_CLONE_ROOT: &str = "/local/tmp/nomad";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Main controller configuration structure
#[derive(Debug, Clone, Parser)]
#[command(name = "gitops-controller")]
#[command(about = "Reconciles Nomad jobs from git repositories described in Nomad Variables")]
#[command(version)]
pub struct ControllerConfig {
    /// Sync schedule as a 6-field cron expression (seconds first)
    #[arg(
        long,
        env = "NOMAD_GITOPS_CONTROLLER_SYNC_CRON_EXPRESSION",
        default_value = "*/15 * * * * *"
    )]
    pub sync_cron: String,

    /// Run a single reconciliation pass and exit
    #[arg(
        long,
        env = "NOMAD_GITOPS_ONE_OFF",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub one_off: bool,

    /// Name resources must carry in `controller_name` to be reconciled
    #[arg(long, env = "NOMAD_GITOPS_CONTROLLER_NAME", default_value = "nomadops")]
    pub controller_name: String,

    /// Namespace resources must live in to be reconciled
    #[arg(long, env = "NOMAD_GITOPS_CONTROLLER_NAMESPACE", default_value = "default")]
    pub controller_namespace: String,

    /// Variable path prefix for GitRepository resources
    #[arg(
        long,
        env = "NOMAD_GITOPS_GITREPOSITORY_PREFIX",
        default_value = DEFAULT_GIT_REPOSITORY_PREFIX
    )]
    pub git_repository_prefix: String,

    /// Variable path prefix for NomadJobGroup resources
    #[arg(
        long,
        env = "NOMAD_GITOPS_NOMADJOBGROUP_PREFIX",
        default_value = DEFAULT_JOB_GROUP_PREFIX
    )]
    pub job_group_prefix: String,

    /// Where repositories are cloned (defaults to /local/tmp/nomad/<controller-name>)
    #[arg(long, env = "NOMAD_GITOPS_CLONE_BASE_PATH")]
    pub clone_base_path: Option<PathBuf>,

    /// Upper bound for a single git command, in seconds
    #[arg(long, env = "NOMAD_GITOPS_GIT_TIMEOUT_SECONDS")]
    pub git_timeout_seconds: Option<u64>,

    /// Log output format
    #[arg(long, env = "NOMAD_GITOPS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Nomad agent address
    #[arg(long, env = "NOMAD_ADDR", default_value = nomad::DEFAULT_ADDRESS)]
    pub nomad_addr: String,

    /// Nomad ACL token
    #[arg(long, env = "NOMAD_TOKEN", hide_env_values = true)]
    pub nomad_token: Option<String>,

    /// Nomad region
    #[arg(long, env = "NOMAD_REGION")]
    pub nomad_region: Option<String>,
}

impl ControllerConfig {
    /// Identity used by the ownership filter.
    #[must_use]
    pub fn identity(&self) -> ControllerIdentity {
        ControllerIdentity::new(&self.controller_name, &self.controller_namespace)
    }

    /// Base directory for repository working copies.
    #[must_use]
    pub fn clone_base_path(&self) -> PathBuf {
        self.clone_base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLONE_ROOT).join(&self.controller_name))
    }

    /// Timeout applied to each git invocation, if configured.
    #[must_use]
    pub fn git_timeout(&self) -> Option<Duration> {
        self.git_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Parsed sync schedule.
    pub fn schedule(&self) -> Result<cron::Schedule> {
        cron::Schedule::from_str(&self.sync_cron).map_err(|e| {
            Error::Config(format!("invalid sync cron expression '{}': {e}", self.sync_cron))
        })
    }

    /// Connection settings for the Nomad client.
    #[must_use]
    pub fn nomad_client_config(&self) -> nomad::ClientConfig {
        nomad::ClientConfig {
            address: self.nomad_addr.clone(),
            token: self.nomad_token.clone(),
            region: self.nomad_region.clone(),
        }
    }

    /// Validate configuration has required fields
    pub fn validate(&self) -> Result<()> {
        if self.controller_name.trim().is_empty() {
            return Err(Error::Config("controller name must not be empty".to_string()));
        }
        if self.controller_namespace.trim().is_empty() {
            return Err(Error::Config(
                "controller namespace must not be empty".to_string(),
            ));
        }
        if self.git_repository_prefix.trim().is_empty() || self.job_group_prefix.trim().is_empty()
        {
            return Err(Error::Config(
                "resource prefixes must not be empty".to_string(),
            ));
        }
        if self.git_repository_prefix == self.job_group_prefix {
            return Err(Error::Config(format!(
                "GitRepository and NomadJobGroup prefixes must differ (both '{}')",
                self.git_repository_prefix
            )));
        }
        if !self.one_off {
            self.schedule()?;
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sync_cron: "*/15 * * * * *".to_string(),
            one_off: false,
            controller_name: "nomadops".to_string(),
            controller_namespace: "default".to_string(),
            git_repository_prefix: DEFAULT_GIT_REPOSITORY_PREFIX.to_string(),
            job_group_prefix: DEFAULT_JOB_GROUP_PREFIX.to_string(),
            clone_base_path: None,
            git_timeout_seconds: None,
            log_format: LogFormat::Json,
            nomad_addr: nomad::DEFAULT_ADDRESS.to_string(),
            nomad_token: None,
            nomad_region: None,
        }
    }
}
