//! Repository Path Resolver
//!
//! Maps a `GitRepository` to the local directory its content is synchronized
//! into: `<base>/<base64url(path)>/<basename(url)>`. The encoded segment is
//! derived from the resource's unique key, so two resources never share a
//! directory even when they point at the same URL.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::path::{Path, PathBuf};

use crate::resources::GitRepository;

const FALLBACK_BASENAME: &str = "repository";

/// Resolves working-copy locations under a controller-scoped base directory.
#[derive(Debug, Clone)]
pub struct RepositoryPathResolver {
    base_dir: PathBuf,
}

impl RepositoryPathResolver {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory owned exclusively by `repo`, one level above its working copy.
    #[must_use]
    pub fn resource_dir(&self, repo: &GitRepository) -> PathBuf {
        self.base_dir.join(encode_segment(&repo.path))
    }

    /// Working-copy directory for `repo`.
    #[must_use]
    pub fn resolve(&self, repo: &GitRepository) -> PathBuf {
        self.resource_dir(repo).join(url_basename(&repo.url))
    }
}

fn encode_segment(resource_path: &str) -> String {
    URL_SAFE_NO_PAD.encode(resource_path.as_bytes())
}

/// Last path component of a URL or local path, ignoring trailing slashes.
fn url_basename(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_BASENAME
    } else {
        name
    }
}
