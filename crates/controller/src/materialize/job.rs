use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::resources::ControllerIdentity;

pub const META_MANAGED: &str = "nomad_gitops_managed";
pub const META_CURRENT_COMMIT: &str = "nomad_gitops_current_commit";
pub const META_LAST_RECONCILIATION: &str = "nomad_gitops_last_reconciliation_timestamp";
pub const META_JOB_GROUP: &str = "nomad_gitops_nomad_job_group";
pub const META_GIT_REPOSITORY: &str = "nomad_gitops_git_repository";
pub const META_CONTROLLER_NAME: &str = "nomad_gitops_controller_name";
pub const META_CONTROLLER_NAMESPACE: &str = "nomad_gitops_controller_namespace";

/// A parsed Nomad job in its canonical JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec(Map<String, Value>);

impl JobSpec {
    #[must_use]
    pub fn new(job: Map<String, Value>) -> Self {
        Self(job)
    }

    /// Job ID, falling back to its name.
    #[must_use]
    pub fn name(&self) -> &str {
        ["ID", "Name"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
            .unwrap_or("<unnamed>")
    }

    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.0
            .get("Meta")
            .and_then(Value::as_object)
            .and_then(|meta| meta.get(key))
            .and_then(Value::as_str)
    }

    /// Set a `Meta` entry, creating the map when the job has none.
    pub fn set_meta(&mut self, key: &str, value: impl Into<String>) {
        let meta = self
            .0
            .entry("Meta")
            .or_insert_with(|| Value::Object(Map::new()));
        if !meta.is_object() {
            *meta = Value::Object(Map::new());
        }
        if let Value::Object(meta) = meta {
            meta.insert(key.to_string(), Value::String(value.into()));
        }
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Where a job came from, written into its `Meta` before registration.
#[derive(Debug, Clone)]
pub struct Provenance {
    /// Source revision; empty when the repository never reported one
    pub commit: String,
    /// Start of the pass
    pub reconciled_at: DateTime<Utc>,
    pub job_group: String,
    pub git_repository: String,
    pub controller: ControllerIdentity,
}

impl Provenance {
    #[must_use]
    pub fn entries(&self) -> [(&'static str, String); 7] {
        [
            (META_MANAGED, "true".to_string()),
            (META_CURRENT_COMMIT, self.commit.clone()),
            (
                META_LAST_RECONCILIATION,
                self.reconciled_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (META_JOB_GROUP, self.job_group.clone()),
            (META_GIT_REPOSITORY, self.git_repository.clone()),
            (META_CONTROLLER_NAME, self.controller.name().to_string()),
            (
                META_CONTROLLER_NAMESPACE,
                self.controller.namespace().to_string(),
            ),
        ]
    }

    pub fn stamp(&self, spec: &mut JobSpec) {
        for (key, value) in self.entries() {
            spec.set_meta(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn job(value: Value) -> JobSpec {
        match value {
            Value::Object(map) => JobSpec::new(map),
            other => panic!("not an object: {other}"),
        }
    }

    fn provenance() -> Provenance {
        Provenance {
            commit: "abc123".to_string(),
            reconciled_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap(),
            job_group: "nomadops/v1/nomadjobgroup/web".to_string(),
            git_repository: "teams/payments".to_string(),
            controller: ControllerIdentity::new("nomadops", "default"),
        }
    }

    #[test]
    fn stamp_creates_meta_when_null() {
        let mut spec = job(json!({"ID": "web", "Meta": null}));
        provenance().stamp(&mut spec);

        assert_eq!(spec.meta(META_MANAGED), Some("true"));
        assert_eq!(spec.meta(META_CURRENT_COMMIT), Some("abc123"));
        assert_eq!(
            spec.meta(META_LAST_RECONCILIATION),
            Some("2026-03-01T12:30:00Z")
        );
        assert_eq!(spec.meta(META_GIT_REPOSITORY), Some("teams/payments"));
        assert_eq!(spec.meta(META_CONTROLLER_NAMESPACE), Some("default"));
    }

    #[test]
    fn stamp_keeps_user_meta() {
        let mut spec = job(json!({"ID": "web", "Meta": {"owner": "payments"}}));
        provenance().stamp(&mut spec);

        assert_eq!(spec.meta("owner"), Some("payments"));
        assert_eq!(spec.meta(META_JOB_GROUP), Some("nomadops/v1/nomadjobgroup/web"));
    }

    #[test]
    fn name_prefers_id() {
        assert_eq!(job(json!({"ID": "api", "Name": "API"})).name(), "api");
        assert_eq!(job(json!({"Name": "API"})).name(), "API");
        assert_eq!(job(json!({})).name(), "<unnamed>");
    }
}
