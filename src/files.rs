//! Output-tree primitives.
//!
//! Every helper here is a no-op when the filesystem already has the desired
//! shape, so setup performs no writes on an unchanged site.

use crate::error::BuildError;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Create `dir` and its parents. Returns whether anything was created.
pub fn ensure_dir(dir: &Path) -> io::Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir)?;
    Ok(true)
}

/// Point `link` at `source`.
///
/// Skipped when `source` does not exist. An existing link to the same
/// target is left alone; a link pointing elsewhere is replaced. Returns
/// whether a link was created.
pub fn ensure_symlink(source: &Path, link: &Path) -> io::Result<bool> {
    if !source.exists() {
        return Ok(false);
    }
    let source = std::path::absolute(source)?;

    match std::fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if std::fs::read_link(link)? == source {
                return Ok(false);
            }
            remove_link(link)?;
        }
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a symlink", link.display()),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent)?;
    }
    create_link(&source, link)?;
    Ok(true)
}

#[cfg(unix)]
fn create_link(source: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn create_link(source: &Path, link: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, link)
    } else {
        std::os::windows::fs::symlink_file(source, link)
    }
}

#[cfg(unix)]
fn remove_link(link: &Path) -> io::Result<()> {
    std::fs::remove_file(link)
}

#[cfg(windows)]
fn remove_link(link: &Path) -> io::Result<()> {
    std::fs::remove_file(link).or_else(|_| std::fs::remove_dir(link))
}

/// Regular files directly inside `dir`, sorted by name, dotfiles excluded.
///
/// A missing directory yields an empty list. With `extension` set, only
/// files with that extension are returned.
pub fn list_files(dir: &Path, extension: Option<&str>) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        if let Some(ext) = extension
            && entry.path().extension().and_then(|e| e.to_str()) != Some(ext)
        {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| BuildError::io(path, e))
}
