//! Incremental file output

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tablegen_core::prelude::*;
use tracing::{debug, info};

/// Write `content` unless the file already holds exactly these bytes.
///
/// Returns whether the file was written. Unchanged files keep their
/// modification time.
pub fn write_if_changed(path: &Path, content: &[u8]) -> Result<bool> {
    if let Ok(existing) = fs::read(path) {
        if existing == content {
            debug!("unchanged {}", path.display());
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    info!("write {}", path.display());
    Ok(true)
}

/// Write a file only if it does not exist yet
pub fn write_if_absent(path: &Path, content: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_if_changed(path, content)
}

/// Delete files in `dir` (not recursive) whose name ends with one of
/// `suffixes` and that are not in `keep`
pub fn remove_stale(dir: &Path, suffixes: &[&str], keep: &HashSet<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(removed);
    };
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || keep.contains(&path) {
            continue;
        }
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if suffixes.iter().any(|suffix| name.ends_with(suffix)) {
            fs::remove_file(&path)?;
            info!("remove stale {}", path.display());
            removed.push(path);
        }
    }
    removed.sort();
    Ok(removed)
}

/// Scratch directory removed on drop, on success and failure alike
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Recreate `path` empty
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        fs::create_dir_all(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            debug!("failed to clean {}: {e}", self.path.display());
        }
    }
}
