use super::items::ItemsDecoder;
use super::{ControllerObject, Items, ResourceKind, ResourceRecord};
use crate::error::Result;

pub(crate) const KEY_CONTROLLER_NAME: &str = "controller_name";
const KEY_GIT_REPOSITORY_NAME: &str = "git_repository_name";
const KEY_JOB_RELATIVE_PATH: &str = "nomad_job_relative_path";
const KEY_JOB_PATH_FILTER: &str = "nomad_job_regex_path_filter";
const KEY_JOB_RECURSE: &str = "nomad_job_recurse";
const KEY_GROUP_RELATIVE_PATH: &str = "nomad_job_group_relative_path";
const KEY_GROUP_PATH_FILTER: &str = "nomad_job_group_regex_path_filter";
const KEY_GROUP_RECURSE: &str = "nomad_job_group_recurse";
pub(crate) const KEY_PARENT_JOB_GROUP: &str = "parent_job_group";
const KEY_STATUS: &str = "status";

/// Which files inside a repository to pick up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSelector {
    /// Directory relative to the repository root
    pub relative_path: String,
    /// Regular expression matched against file names
    pub pattern: String,
    /// Descend into subdirectories
    pub recurse: bool,
}

/// A `NomadJobGroup` resource.
///
/// `jobs` points at Nomad job specifications to register. `groups`, when
/// present, points at descriptors of further `NomadJobGroup` resources that
/// this one generates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NomadJobGroup {
    pub namespace: String,
    pub path: String,
    pub controller_name: String,
    /// Path of the owning `GitRepository`
    pub git_repository_name: String,
    pub jobs: PathSelector,
    pub groups: Option<PathSelector>,
    /// Set on records generated from another job group's descriptors
    pub parent_job_group: Option<String>,
    pub status: Option<String>,
}

impl ControllerObject for NomadJobGroup {
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

impl ResourceKind for NomadJobGroup {
    const KIND: &'static str = "NomadJobGroup";

    fn decode(record: &ResourceRecord) -> Result<Self> {
        let mut decoder = ItemsDecoder::new(&record.path, &record.items);

        let controller_name = decoder.required(KEY_CONTROLLER_NAME)?;
        let git_repository_name = decoder.required(KEY_GIT_REPOSITORY_NAME)?;
        let jobs = PathSelector {
            relative_path: decoder.required(KEY_JOB_RELATIVE_PATH)?,
            pattern: decoder.required(KEY_JOB_PATH_FILTER)?,
            recurse: decoder.optional_bool(KEY_JOB_RECURSE)?,
        };

        let group_relative_path = decoder.optional(KEY_GROUP_RELATIVE_PATH);
        let group_pattern = decoder.optional(KEY_GROUP_PATH_FILTER);
        let group_recurse = decoder.optional_bool(KEY_GROUP_RECURSE)?;
        let groups = group_pattern.map(|pattern| PathSelector {
            relative_path: group_relative_path.unwrap_or_default(),
            pattern,
            recurse: group_recurse,
        });

        let parent_job_group = decoder.optional(KEY_PARENT_JOB_GROUP);
        let status = decoder.optional(KEY_STATUS);
        decoder.finish()?;

        Ok(Self {
            namespace: record.namespace.clone(),
            path: record.path.clone(),
            controller_name,
            git_repository_name,
            jobs,
            groups,
            parent_job_group,
            status,
        })
    }

    fn encode(&self) -> ResourceRecord {
        let mut items = Items::new();
        items.insert(KEY_CONTROLLER_NAME.to_string(), self.controller_name.clone());
        items.insert(
            KEY_GIT_REPOSITORY_NAME.to_string(),
            self.git_repository_name.clone(),
        );
        items.insert(
            KEY_JOB_RELATIVE_PATH.to_string(),
            self.jobs.relative_path.clone(),
        );
        items.insert(KEY_JOB_PATH_FILTER.to_string(), self.jobs.pattern.clone());
        if self.jobs.recurse {
            items.insert(KEY_JOB_RECURSE.to_string(), "true".to_string());
        }
        if let Some(groups) = &self.groups {
            if !groups.relative_path.is_empty() {
                items.insert(
                    KEY_GROUP_RELATIVE_PATH.to_string(),
                    groups.relative_path.clone(),
                );
            }
            items.insert(KEY_GROUP_PATH_FILTER.to_string(), groups.pattern.clone());
            if groups.recurse {
                items.insert(KEY_GROUP_RECURSE.to_string(), "true".to_string());
            }
        }
        if let Some(parent) = &self.parent_job_group {
            items.insert(KEY_PARENT_JOB_GROUP.to_string(), parent.clone());
        }
        if let Some(status) = &self.status {
            items.insert(KEY_STATUS.to_string(), status.clone());
        }
        ResourceRecord::new(&self.namespace, &self.path, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> ResourceRecord {
        ResourceRecord::new(
            "default",
            "nomadops/v1/nomadjobgroup/web",
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    const BASE: [(&str, &str); 4] = [
        ("controller_name", "nomadops"),
        ("git_repository_name", "nomadops/v1/gitrepository/payments"),
        ("nomad_job_relative_path", "jobs"),
        ("nomad_job_regex_path_filter", r".*\.nomad$"),
    ];

    #[test]
    fn decodes_job_only_group() {
        let group = NomadJobGroup::decode(&record(&BASE)).unwrap();
        assert_eq!(group.jobs.relative_path, "jobs");
        assert!(!group.jobs.recurse);
        assert!(group.groups.is_none());
        assert!(group.parent_job_group.is_none());
    }

    #[test]
    fn decodes_group_projection_when_filter_present() {
        let mut pairs = BASE.to_vec();
        pairs.push(("nomad_job_group_relative_path", "groups"));
        pairs.push(("nomad_job_group_regex_path_filter", r".*\.hcl$"));
        pairs.push(("nomad_job_group_recurse", "true"));
        pairs.push(("nomad_job_recurse", "false"));

        let group = NomadJobGroup::decode(&record(&pairs)).unwrap();
        let groups = group.groups.expect("group projection");
        assert_eq!(groups.relative_path, "groups");
        assert!(groups.recurse);
    }

    #[test]
    fn empty_group_filter_disables_projection() {
        let mut pairs = BASE.to_vec();
        pairs.push(("nomad_job_group_relative_path", "groups"));
        pairs.push(("nomad_job_group_regex_path_filter", ""));

        let group = NomadJobGroup::decode(&record(&pairs)).unwrap();
        assert!(group.groups.is_none());
    }

    #[test]
    fn rejects_missing_repository_reference() {
        let pairs: Vec<_> = BASE
            .iter()
            .copied()
            .filter(|(k, _)| *k != "git_repository_name")
            .collect();
        assert!(NomadJobGroup::decode(&record(&pairs)).is_err());
    }

    #[test]
    fn rejects_bad_recurse_flag() {
        let mut pairs = BASE.to_vec();
        pairs.push(("nomad_job_recurse", "sometimes"));
        assert!(NomadJobGroup::decode(&record(&pairs)).is_err());
    }

    #[test]
    fn encoding_keeps_schema_keys_only() {
        let mut pairs = BASE.to_vec();
        pairs.push(("nomad_job_group_regex_path_filter", r".*\.hcl$"));
        pairs.push(("parent_job_group", "nomadops/v1/nomadjobgroup/root"));

        let group = NomadJobGroup::decode(&record(&pairs)).unwrap();
        let encoded = group.encode();
        assert_eq!(NomadJobGroup::decode(&encoded).unwrap(), group);
        assert!(!encoded.items.contains_key("status"));
        assert!(!encoded.items.contains_key("nomad_job_group_relative_path"));
    }
}
