//! Scoped working directory holding the combined package before zipping.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

/// Working tree for one combine call.
///
/// Backed by a [`TempDir`], so the directory and everything in it is removed
/// when the tree is dropped, on success and on every error path alike.
#[derive(Debug)]
pub struct OutputTree {
    dir: TempDir,
}

impl OutputTree {
    /// Create a fresh, empty working tree in the system temp directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("epub_combine_").tempdir()?;
        tracing::debug!(dir = %dir.path().display(), "created working tree");
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` at a slash-separated path relative to the root,
    /// creating parent directories as needed.
    pub fn write(&self, rel_path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, bytes)?;
        Ok(())
    }

    /// Every file in the tree as slash-separated relative paths, sorted
    /// lexically so packaging order is reproducible.
    pub fn files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        collect_files(self.root(), "", &mut files)?;
        files.sort();
        Ok(files)
    }

    /// Absolute filesystem path for a relative tree path.
    pub fn resolve(&self, rel_path: &str) -> PathBuf {
        rel_path
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root().to_path_buf(), |acc, seg| acc.join(seg))
    }
}

fn collect_files(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if entry.file_type()?.is_dir() {
            collect_files(&entry.path(), &rel, out)?;
        } else {
            out.push(rel);
        }
    }
    Ok(())
}
