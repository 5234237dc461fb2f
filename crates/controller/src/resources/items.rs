//! Strict decoding of flat variable items into typed fields.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// Walks a record's items, tracking which keys the schema consumed.
///
/// Call [`ItemsDecoder::finish`] after reading every field so that keys the
/// schema does not know about are rejected.
pub(crate) struct ItemsDecoder<'a> {
    path: &'a str,
    items: &'a BTreeMap<String, String>,
    seen: BTreeSet<&'a str>,
}

impl<'a> ItemsDecoder<'a> {
    pub(crate) fn new(path: &'a str, items: &'a BTreeMap<String, String>) -> Self {
        Self {
            path,
            items,
            seen: BTreeSet::new(),
        }
    }

    fn take(&mut self, key: &str) -> Option<&'a String> {
        let (stored_key, value) = self.items.get_key_value(key)?;
        self.seen.insert(stored_key.as_str());
        Some(value)
    }

    pub(crate) fn required(&mut self, key: &str) -> Result<String> {
        self.take(key)
            .cloned()
            .ok_or_else(|| Error::decode(self.path, format!("missing required key '{key}'")))
    }

    /// Optional string; absent and empty both decode to `None`.
    pub(crate) fn optional(&mut self, key: &str) -> Option<String> {
        self.take(key).filter(|v| !v.is_empty()).cloned()
    }

    /// Optional boolean encoded as a string; absent or empty is `false`.
    pub(crate) fn optional_bool(&mut self, key: &str) -> Result<bool> {
        match self.take(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(false),
            Some(v) if v.is_empty() || v == "false" || v == "0" => Ok(false),
            Some(v) if v == "true" || v == "1" => Ok(true),
            Some(v) => Err(Error::decode(
                self.path,
                format!("key '{key}' must be 'true' or 'false', got '{v}'"),
            )),
        }
    }

    pub(crate) fn finish(self) -> Result<()> {
        let unknown: Vec<&str> = self
            .items
            .keys()
            .map(String::as_str)
            .filter(|k| !self.seen.contains(k))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::decode(
                self.path,
                format!("unexpected keys: {}", unknown.join(", ")),
            ))
        }
    }
}
