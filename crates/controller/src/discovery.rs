//! File Discovery
//!
//! Finds the files inside a working copy that a job group projection selects.

use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::resources::PathSelector;

/// Files under `root/<selector.relative_path>` selected by `selector`.
///
/// Returned paths are absolute (joined onto the scanned directory).
pub fn discover_selected(root: &Path, selector: &PathSelector) -> Result<Vec<PathBuf>> {
    let directory = scoped_directory(root, &selector.relative_path)?;
    let files = discover(&directory, &selector.pattern, selector.recurse)?;
    Ok(files.into_iter().map(|file| directory.join(file)).collect())
}

/// Regular files in `directory` whose name matches `pattern`.
///
/// Paths are relative to `directory`, in directory listing order. Fails with
/// [`Error::DirectoryUnavailable`] when the directory cannot be listed or has
/// no entries at all.
pub fn discover(directory: &Path, pattern: &str, recurse: bool) -> Result<Vec<PathBuf>> {
    let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let unavailable = || Error::DirectoryUnavailable {
        directory: directory.to_path_buf(),
    };

    let mut entries = fs::read_dir(directory).map_err(|e| {
        debug!(directory = %directory.display(), error = %e, "Failed to list directory");
        unavailable()
    })?;
    if entries.next().is_none() {
        return Err(unavailable());
    }

    let matched = if recurse {
        walk(directory, &regex)
    } else {
        scan(directory, &regex).map_err(|_| unavailable())?
    };

    debug!(
        directory = %directory.display(),
        pattern,
        recurse,
        matched = matched.len(),
        "Discovered files"
    );
    Ok(matched)
}

fn scan(directory: &Path, regex: &Regex) -> std::io::Result<Vec<PathBuf>> {
    let mut matched = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        // DirEntry::file_type does not follow symlinks
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if regex.is_match(&name.to_string_lossy()) {
            matched.push(PathBuf::from(name));
        }
    }
    Ok(matched)
}

/// Git metadata is never job content; `.git/config` may even carry credentials.
const GIT_DIR: &str = ".git";

fn walk(directory: &Path, regex: &Regex) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != GIT_DIR)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(
                    directory = %directory.display(),
                    error = %e,
                    "Skipping unreadable entry"
                );
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| regex.is_match(&entry.file_name().to_string_lossy()))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(directory)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect()
}

/// Join `relative` onto `root` without letting it escape `root`.
fn scoped_directory(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut directory = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => directory.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(Error::DirectoryUnavailable {
                    directory: root.join(relative),
                });
            }
        }
    }
    Ok(directory)
}
