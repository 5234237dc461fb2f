//! Recursive directory copy for local-directory sources.

use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Copy the tree at `source` into `destination`.
///
/// Regular files keep their permission bits. Symbolic links are not
/// followed and not copied. Blocking; run it off the async executor.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::metadata(source).map_err(|e| Error::io(source, e))?;
    if !metadata.is_dir() {
        return Err(Error::io(
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source is not a directory"),
        ));
    }

    fs::create_dir_all(destination).map_err(|e| Error::io(destination, e))?;

    let mut files = 0usize;
    for entry in WalkDir::new(source).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            Error::io(path, io)
        })?;

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::io(entry.path(), std::io::Error::other(e.to_string())))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            debug!(path = %entry.path().display(), "Skipping symbolic link");
        } else if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else if file_type.is_file() {
            // fs::copy carries the permission bits over
            fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
            files += 1;
        }
    }

    debug!(
        source = %source.display(),
        destination = %destination.display(),
        files,
        "Copied directory tree"
    );
    Ok(())
}
