//! Per-session scratch directories.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Prefix for workspace directory names under the workspace root.
pub const WORKSPACE_PREFIX: &str = "reel.";

/// A temporary directory owned by exactly one session.
///
/// Removed by [`Workspace::remove`], or on drop if the session is torn down
/// without an orderly close.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, empty workspace under `root`.
    pub fn create(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)?;
        info!(workspace = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where fetched source media lands.
    pub fn media_dir(&self) -> PathBuf {
        self.dir.path().join("media")
    }

    /// Delete the directory and everything in it. Failures are logged, not returned.
    pub fn remove(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(workspace = %path.display(), "Removed workspace"),
            Err(e) => warn!(workspace = %path.display(), error = %e, "Failed to remove workspace"),
        }
    }
}
