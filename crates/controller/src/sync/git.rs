//! Git operations using shell commands.
//!
//! Uses `tokio::process::Command` for async git operations.

use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Fetches repository content into a local directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitTransport: Send + Sync {
    /// Shallow, single-branch clone of `reference` into `destination`.
    ///
    /// `destination` must not exist yet. Returns the checked-out revision.
    async fn clone_shallow(&self, url: &str, reference: &str, destination: &Path)
        -> Result<String>;
}

/// [`GitTransport`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    timeout: Option<Duration>,
}

impl GitCli {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every git invocation by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, url: &str, command: &mut Command) -> Result<Output> {
        command.kill_on_drop(true).env("GIT_TERMINAL_PROMPT", "0");

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| Error::Sync {
                    repository: redact_url(url),
                    reason: format!("git timed out after {}s", limit.as_secs()),
                })?,
            None => command.output().await,
        };

        output.map_err(|e| Error::Sync {
            repository: redact_url(url),
            reason: format!("failed to execute git: {e}"),
        })
    }
}

#[async_trait]
impl GitTransport for GitCli {
    async fn clone_shallow(
        &self,
        url: &str,
        reference: &str,
        destination: &Path,
    ) -> Result<String> {
        debug!(
            url = %redact_url(url),
            reference,
            destination = %destination.display(),
            "Cloning repository"
        );

        let mut clone = Command::new("git");
        clone.args(["clone", "--quiet", "--depth", "1", "--single-branch"]);
        let branch = branch_argument(reference);
        if !branch.is_empty() {
            clone.args(["--branch", branch]);
        }
        clone.arg("--").arg(url).arg(destination);

        let output = self.run(url, &mut clone).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Sync {
                repository: redact_url(url),
                reason: format!("git clone failed: {}", scrub(stderr.trim(), url)),
            });
        }

        let mut rev_parse = Command::new("git");
        rev_parse
            .arg("-C")
            .arg(destination)
            .args(["rev-parse", "HEAD"]);

        let output = self.run(url, &mut rev_parse).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Sync {
                repository: redact_url(url),
                reason: format!("git rev-parse failed: {}", stderr.trim()),
            });
        }

        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if revision.is_empty() {
            return Err(Error::Sync {
                repository: redact_url(url),
                reason: "git rev-parse returned no revision".to_string(),
            });
        }
        Ok(revision)
    }
}

/// `git clone --branch` takes short names for both branches and tags.
fn branch_argument(reference: &str) -> &str {
    let reference = reference.trim();
    reference
        .strip_prefix("refs/heads/")
        .or_else(|| reference.strip_prefix("refs/tags/"))
        .unwrap_or(reference)
}

/// Hide credentials embedded in a URL's userinfo.
pub(crate) fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://[REDACTED]@{}", &rest[at + 1..]),
        None => url.to_string(),
    }
}

fn scrub(message: &str, url: &str) -> String {
    let redacted = redact_url(url);
    if redacted == url {
        message.to_string()
    } else {
        message.replace(url, &redacted)
    }
}
