//! HCL descriptors of generated `NomadJobGroup` resources.
//!
//! ```hcl
//! namespace = "default"
//! path      = "nomadops/v1/nomadjobgroup/child"
//!
//! items {
//!   controller_name             = "nomadops"
//!   git_repository_name         = "nomadops/v1/gitrepository/apps"
//!   nomad_job_relative_path     = "jobs"
//!   nomad_job_regex_path_filter = ".*\\.nomad$"
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::resources::{Items, ResourceRecord};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupDescriptor {
    #[serde(default)]
    namespace: Option<String>,
    path: String,
    items: Value,
}

/// Decode a descriptor into a record. A missing `namespace` leaves the
/// record's namespace empty for the caller to fill in.
pub fn parse_group_descriptor(file: &str, text: &str) -> Result<ResourceRecord> {
    let parse_error = |reason: String| Error::Parse {
        file: file.to_string(),
        reason,
    };

    let descriptor: GroupDescriptor =
        hcl::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    if descriptor.path.trim().is_empty() {
        return Err(parse_error("'path' must not be empty".to_string()));
    }

    let items = match descriptor.items {
        Value::Object(items) => items,
        // repeated blocks come back as an array
        Value::Array(mut blocks) if blocks.len() == 1 => match blocks.pop() {
            Some(Value::Object(items)) => items,
            _ => return Err(parse_error("'items' must be a block".to_string())),
        },
        _ => return Err(parse_error("'items' must be a single block".to_string())),
    };

    let mut flat = Items::new();
    for (key, value) in items {
        let value = match value {
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(parse_error(format!(
                    "item '{key}' must be a string, number or bool"
                )))
            }
        };
        flat.insert(key, value);
    }

    Ok(ResourceRecord::new(
        descriptor.namespace.unwrap_or_default(),
        descriptor.path,
        flat,
    ))
}
