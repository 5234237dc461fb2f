//! In-memory stand-ins for Nomad and git used by the pass-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use controller::materialize::parse_group_descriptor;
use controller::{
    ControllerConfig, Error, GitTransport, Items, JobRegistrar, JobSpec, Reconciler,
    RecordMetadata, ResourceRecord, ResourceStore, Result, SpecParser,
};
use serde_json::{json, Map};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const REPO_PREFIX: &str = "nomadops/v1/gitrepository/";
pub const GROUP_PREFIX: &str = "nomadops/v1/nomadjobgroup/";

pub fn items(pairs: &[(&str, &str)]) -> Items {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn config(clone_base: &Path) -> ControllerConfig {
    ControllerConfig {
        clone_base_path: Some(clone_base.to_path_buf()),
        ..ControllerConfig::default()
    }
}

/// Variables store keyed by (namespace, path), listed in insertion order.
#[derive(Default)]
pub struct FakeStore {
    records: Mutex<Vec<ResourceRecord>>,
    upserts: Mutex<Vec<ResourceRecord>>,
}

impl FakeStore {
    pub fn put(&self, namespace: &str, path: &str, items: Items) {
        let mut records = self.records.lock().unwrap();
        records.retain(|r| !(r.namespace == namespace && r.path == path));
        records.push(ResourceRecord::new(namespace, path, items));
    }

    pub fn get(&self, namespace: &str, path: &str) -> Option<ResourceRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.namespace == namespace && r.path == path)
            .cloned()
    }

    pub fn upserts(&self) -> Vec<ResourceRecord> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn list(&self, prefix: &str) -> Result<Vec<RecordMetadata>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .map(|r| RecordMetadata {
                namespace: r.namespace.clone(),
                path: r.path.clone(),
                modify_index: r.modify_index,
                modify_time: r.modify_time,
            })
            .collect())
    }

    async fn read_items(&self, path: &str, namespace: &str) -> Result<Items> {
        self.get(namespace, path)
            .map(|r| r.items)
            .ok_or_else(|| Error::Config(format!("no record at {namespace}/{path}")))
    }

    async fn upsert(&self, mut record: ResourceRecord) -> Result<ResourceRecord> {
        self.upserts.lock().unwrap().push(record.clone());
        let mut records = self.records.lock().unwrap();
        let next_index = records.iter().map(|r| r.modify_index).max().unwrap_or(0) + 1;
        record.modify_index = next_index;
        match records
            .iter_mut()
            .find(|r| r.namespace == record.namespace && r.path == record.path)
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(record)
    }
}

/// Job files contain `job "<id>"`; anything else fails to parse.
/// Descriptors go through the real HCL decoder.
pub struct FakeParser;

#[async_trait]
impl SpecParser for FakeParser {
    async fn parse_workload_spec(&self, file: &str, text: &str) -> Result<JobSpec> {
        let id = text
            .trim()
            .strip_prefix("job \"")
            .and_then(|rest| rest.split('"').next())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Parse {
                file: file.to_string(),
                reason: "expected a job block".to_string(),
            })?;
        let mut job = Map::new();
        job.insert("ID".to_string(), json!(id));
        job.insert("Meta".to_string(), json!(null));
        Ok(JobSpec::new(job))
    }

    async fn parse_group_descriptor(&self, file: &str, text: &str) -> Result<ResourceRecord> {
        parse_group_descriptor(file, text)
    }
}

/// Records every registered job.
#[derive(Default)]
pub struct FakeRegistrar {
    registered: Mutex<Vec<JobSpec>>,
}

impl FakeRegistrar {
    pub fn registered(&self) -> Vec<JobSpec> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRegistrar for FakeRegistrar {
    async fn register(&self, spec: &JobSpec) -> Result<String> {
        let mut registered = self.registered.lock().unwrap();
        registered.push(spec.clone());
        Ok(format!("eval-{}", registered.len()))
    }
}

/// "Clones" by copying a fixture tree. URLs containing `unreachable` fail.
/// Each successful clone returns the next revision: `rev-1`, `rev-2`, ...
pub struct FakeTransport {
    fixture: PathBuf,
    clones: AtomicUsize,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeTransport {
    pub fn new(fixture: &Path) -> Self {
        Self {
            fixture: fixture.to_path_buf(),
            clones: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Block each clone: notify `entered`, then wait for `release`.
    pub fn gated(fixture: &Path, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((entered, release)),
            ..Self::new(fixture)
        }
    }
}

#[async_trait]
impl GitTransport for FakeTransport {
    async fn clone_shallow(
        &self,
        url: &str,
        _reference: &str,
        destination: &Path,
    ) -> Result<String> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if url.contains("unreachable") {
            return Err(Error::Sync {
                repository: url.to_string(),
                reason: "could not resolve host".to_string(),
            });
        }
        controller::sync::copy_tree(&self.fixture, destination)?;
        let n = self.clones.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("rev-{n}"))
    }
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

pub fn reconciler(
    config: &ControllerConfig,
    store: &Arc<FakeStore>,
    transport: FakeTransport,
    registrar: &Arc<FakeRegistrar>,
) -> Reconciler {
    Reconciler::new(
        config,
        store.clone(),
        Arc::new(transport),
        Arc::new(FakeParser),
        registrar.clone(),
    )
}
