//! The persisted code artifact.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::Result;

/// Destination for the current candidate code. Written synchronously and
/// only by the engine.
pub trait ArtifactSink: Send + Sync {
    fn write(&self, code: &str) -> Result<()>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Artifact stored in a single file on disk.
#[derive(Debug, Clone)]
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the backup copy: the file name with `.bak` appended.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".bak");
        self.path.with_file_name(name)
    }

    /// Copy an existing, non-empty target aside before the run overwrites it.
    /// Returns the backup path when a copy was made.
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                let backup = self.backup_path();
                std::fs::copy(&self.path, &backup)?;
                info!(from = %self.path.display(), to = %backup.display(), "Backed up target file");
                Ok(Some(backup))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ArtifactSink for FileArtifact {
    fn write(&self, code: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, code).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to write code");
            e
        })?;
        info!(path = %self.path.display(), bytes = code.len(), "Wrote code");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
