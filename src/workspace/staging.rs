//! Disposable per-run workspace
//!
//! All transient state of a publish run lives under one uniquely named
//! directory. It is removed by [`StagingWorkspace::close`], or from `Drop` when
//! the run is abandoned (panic, cancelled future).

use crate::core::error::{PublishError, Result};
use crate::core::traits::{FileSystem, IdGenerator};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// UUID v4 names for workspaces
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// An exclusively owned staging directory
pub struct StagingWorkspace {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    closed: bool,
}

impl std::fmt::Debug for StagingWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingWorkspace")
            .field("path", &self.path)
            .field("closed", &self.closed)
            .finish()
    }
}

impl StagingWorkspace {
    /// Create `<temp_root>/<unique id>`
    pub async fn open(
        fs: Arc<dyn FileSystem>,
        ids: &dyn IdGenerator,
        temp_root: &Path,
    ) -> Result<Self> {
        let path = temp_root.join(ids.generate());

        fs.create_dir(&path)
            .await
            .map_err(|e| PublishError::io(&path, e))?;

        log::info!("Staging workspace created at {}", path.display());

        Ok(Self {
            path,
            fs,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace recursively
    ///
    /// Failures are logged and swallowed so they never replace the outcome of
    /// the run.
    pub async fn close(mut self) {
        self.closed = true;

        match self.fs.remove_dir_all(&self.path).await {
            Ok(()) => log::info!("Staging workspace removed: {}", self.path.display()),
            Err(e) => log::warn!(
                "Failed to remove staging workspace {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for StagingWorkspace {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        log::warn!(
            "Staging workspace {} dropped without close, removing",
            self.path.display()
        );
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!(
                "Failed to remove staging workspace {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
