//! Temp-file custodian.
//!
//! Every intermediate a job creates lives under one scoped directory.
//! The directory is removed on every exit path: explicitly with
//! logging on the normal path, and via `Drop` on early returns, panics,
//! and cancellation.

use crate::error::Result;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Scoped per-job temp directory.
pub struct TempScope {
    dir: Option<TempDir>,
}

impl TempScope {
    /// Create the job's temp directory under `root`.
    pub fn create(root: &Path, job_id: &str) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(root)?;
        debug!(path = %dir.path().display(), "Created job temp directory");
        Ok(Self { dir: Some(dir) })
    }

    /// Path all intermediates must be created under.
    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .expect("temp scope used after cleanup")
            .path()
    }

    /// Delete everything now, logging failures. Best-effort; a failed
    /// delete never aborts the job.
    pub fn cleanup(mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), "Failed to remove job temp directory: {}", e);
            } else {
                debug!(path = %path.display(), "Removed job temp directory");
            }
        }
    }
}

// Dropping the inner TempDir removes the directory tree; this covers
// panics and cancellation where `cleanup` never runs.
