use std::fmt;

use super::items::ItemsDecoder;
use super::{ControllerObject, Items, ResourceKind, ResourceRecord};
use crate::error::{Error, Result};

pub(crate) const KEY_CONTROLLER_NAME: &str = "controller_name";
pub(crate) const KEY_URL: &str = "url";
pub(crate) const KEY_TYPE: &str = "type";
pub(crate) const KEY_BRANCH: &str = "branch";
pub(crate) const KEY_STATUS_CURRENT_COMMIT: &str = "status_current_commit";

/// Where a repository's content comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// Shallow clone of a remote git repository
    #[default]
    Git,
    /// Plain copy of a directory on the controller's filesystem
    LocalDirectory,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Git => "git",
            SourceKind::LocalDirectory => "local-directory",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "" | "git" | "remote-git" => Some(SourceKind::Git),
            "local-directory" => Some(SourceKind::LocalDirectory),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `GitRepository` resource: a source of workload definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRepository {
    pub namespace: String,
    pub path: String,
    pub controller_name: String,
    /// Remote URL, or a local directory for [`SourceKind::LocalDirectory`]
    pub url: String,
    pub source_kind: SourceKind,
    /// Branch name or full ref to check out
    pub branch: String,
    /// Last revision successfully synchronized, if any
    pub status_current_commit: Option<String>,
    /// The record this resource was decoded from, kept so status write-back
    /// preserves every stored item
    pub record: ResourceRecord,
}

impl GitRepository {
    /// Copy of the originating record with the current-commit status replaced.
    #[must_use]
    pub fn record_with_commit(&self, revision: &str) -> ResourceRecord {
        let mut record = self.record.clone();
        record
            .items
            .insert(KEY_STATUS_CURRENT_COMMIT.to_string(), revision.to_string());
        record
    }
}

impl ControllerObject for GitRepository {
    fn path(&self) -> &str {
        &self.path
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn controller_name(&self) -> &str {
        &self.controller_name
    }
}

impl ResourceKind for GitRepository {
    const KIND: &'static str = "GitRepository";

    fn decode(record: &ResourceRecord) -> Result<Self> {
        let mut decoder = ItemsDecoder::new(&record.path, &record.items);

        let controller_name = decoder.required(KEY_CONTROLLER_NAME)?;
        let url = decoder.required(KEY_URL)?;
        let raw_type = decoder.required(KEY_TYPE)?;
        let branch = decoder.required(KEY_BRANCH)?;
        // Status fields are always optional on read
        let status_current_commit = decoder.optional(KEY_STATUS_CURRENT_COMMIT);
        decoder.finish()?;

        let source_kind = SourceKind::parse(&raw_type).ok_or_else(|| {
            Error::decode(
                &record.path,
                format!("unsupported repository type '{raw_type}'"),
            )
        })?;
        if url.trim().is_empty() {
            return Err(Error::decode(&record.path, "'url' must not be empty"));
        }

        Ok(Self {
            namespace: record.namespace.clone(),
            path: record.path.clone(),
            controller_name,
            url,
            source_kind,
            branch,
            status_current_commit,
            record: record.clone(),
        })
    }

    fn encode(&self) -> ResourceRecord {
        let mut items = Items::new();
        items.insert(KEY_CONTROLLER_NAME.to_string(), self.controller_name.clone());
        items.insert(KEY_URL.to_string(), self.url.clone());
        items.insert(KEY_TYPE.to_string(), self.source_kind.as_str().to_string());
        items.insert(KEY_BRANCH.to_string(), self.branch.clone());
        if let Some(commit) = &self.status_current_commit {
            items.insert(KEY_STATUS_CURRENT_COMMIT.to_string(), commit.clone());
        }
        ResourceRecord {
            items,
            ..ResourceRecord::new(&self.namespace, &self.path, Items::new())
        }
    }
}
