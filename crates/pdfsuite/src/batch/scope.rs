//! Scoped temp directories for jobs and items.
//!
//! Every temp artifact lives under a per-job workspace, with one directory
//! per item. Scopes remove their directory on `close()`; `Drop` is the
//! backstop so early returns and panics cannot leak artifacts.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ScopeError;

pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    pub fn create(temp_root: &Path, job_id: &str) -> Result<Self, ScopeError> {
        let root = temp_root.join(format!("pdfsuite-job-{}", job_id));
        std::fs::create_dir_all(&root).map_err(|e| ScopeError::Create {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A fresh directory for one item. The uuid component keeps retried
    /// indices from colliding.
    pub fn item_scope(&self, index: usize) -> Result<ItemScope, ScopeError> {
        let dir = self.root.join(format!("{:03}-{}", index, Uuid::new_v4()));
        std::fs::create_dir_all(&dir).map_err(|e| ScopeError::Create {
            path: dir.clone(),
            source: e,
        })?;
        Ok(ItemScope { dir })
    }

    /// Removes the workspace, reporting cleanup failures the `Drop` path
    /// would swallow.
    pub fn close(self) -> Result<(), ScopeError> {
        let root = self.root.clone();
        std::mem::forget(self);
        remove_tree(&root)
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

pub struct ItemScope {
    dir: PathBuf,
}

impl ItemScope {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes input bytes into the scope. Only the final path component of
    /// the display name is used, so submitted names cannot escape the scope.
    pub fn materialize(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ScopeError> {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("input.pdf");
        let path = self.dir.join(name);
        std::fs::write(&path, bytes).map_err(|e| ScopeError::Write {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// A unique output location inside the scope.
    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.dir
            .join(format!("output-{}.{}", Uuid::new_v4(), extension))
    }

    pub fn read_output(&self, path: &Path) -> Result<Vec<u8>, ScopeError> {
        std::fs::read(path).map_err(|e| ScopeError::Read {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn close(self) -> Result<(), ScopeError> {
        let dir = self.dir.clone();
        std::mem::forget(self);
        remove_tree(&dir)
    }
}

impl Drop for ItemScope {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn remove_tree(path: &Path) -> Result<(), ScopeError> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::remove_dir_all(path).map_err(|e| ScopeError::Cleanup {
        path: path.to_path_buf(),
        source: e,
    })
}
