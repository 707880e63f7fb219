//! Ephemeral, per-request compilation directories.
//!
//! A [`Workspace`] owns a freshly created temporary directory holding exactly
//! one seed file. The directory is removed by [`Workspace::release`] or, at
//! the latest, when the handle is dropped.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{CompilerError, CompilerResult};

const WORKSPACE_PREFIX: &str = "project-dir-";

/// An isolated directory seeded with one source file.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    seed_file: String,
}

/// Create a uniquely named workspace containing `file_name` with `content`.
///
/// On failure nothing is left behind on disk.
pub async fn create_workspace(file_name: &str, content: &str) -> CompilerResult<Workspace> {
    if file_name.is_empty() || file_name.contains(&['/', '\\'][..]) || file_name == ".." {
        return Err(CompilerError::Workspace(format!(
            "invalid seed file name '{file_name}'"
        )));
    }

    let dir = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir()
        .map_err(|e| CompilerError::Workspace(format!("cannot create directory: {e}")))?;
    let path = dir.path().to_path_buf();

    // `dir` is dropped (and the directory removed) if the write fails.
    tokio::fs::write(path.join(file_name), content)
        .await
        .map_err(|e| CompilerError::Workspace(format!("cannot write {file_name}: {e}")))?;

    debug!(workspace = %path.display(), seed = file_name, "workspace created");
    Ok(Workspace {
        dir: Some(dir),
        path,
        seed_file: file_name.to_string(),
    })
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn seed_file(&self) -> &str {
        &self.seed_file
    }

    /// Absolute path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    /// Recursively delete the workspace. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(workspace = %self.path.display(), error = %e, "failed to remove workspace");
            } else {
                debug!(workspace = %self.path.display(), "workspace released");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}
