//! Wire models for the subset of the Nomad API the controller consumes.
//!
//! Nomad serializes its API structs with Go field names, so everything here
//! is `PascalCase` on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat string key/value items stored in a Nomad Variable.
pub type VariableItems = BTreeMap<String, String>;

/// Variable metadata as returned by `GET /v1/vars`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableMetadata {
    pub namespace: String,
    pub path: String,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub modify_time: i64,
}

/// A full Nomad Variable, including its items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Variable {
    pub namespace: String,
    pub path: String,
    #[serde(default)]
    pub create_index: u64,
    #[serde(default)]
    pub modify_index: u64,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub modify_time: i64,
    #[serde(default)]
    pub items: VariableItems,
}

impl Variable {
    /// Build a variable that has not been stored yet.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        path: impl Into<String>,
        items: VariableItems,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
            items,
            ..Self::default()
        }
    }
}

/// Request body for `POST /v1/jobs/parse`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct JobParseRequest<'a> {
    #[serde(rename = "JobHCL")]
    pub job_hcl: &'a str,
    pub canonicalize: bool,
}

/// Request body for `POST /v1/jobs`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct JobRegisterRequest<'a> {
    pub job: &'a Map<String, Value>,
}

/// Response body of `POST /v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRegisterResponse {
    #[serde(rename = "EvalID", default)]
    pub eval_id: String,
    #[serde(default)]
    pub eval_create_index: u64,
    #[serde(default)]
    pub job_modify_index: u64,
    #[serde(default)]
    pub warnings: String,
}
