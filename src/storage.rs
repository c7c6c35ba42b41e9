//! Directory-backed storage for exported backups and CSV files.

use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use crate::error::BackupError;

/// An entry in the export directory listing.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub name: String,
    pub size: u64,
}

/// A flat directory of exported files.
pub struct ExportDir {
    base_path: PathBuf,
}

impl ExportDir {
    /// Create a store rooted at `base_path`. The directory is created on first write.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a file name to its path in the directory.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Write (overwrite) a file. Returns the full path written.
    pub async fn write(&self, name: &str, content: &str) -> Result<PathBuf, BackupError> {
        fs::create_dir_all(&self.base_path).await?;
        let path = self.resolve_path(name);
        fs::write(&path, content).await?;
        debug!(path = %path.display(), bytes = content.len(), "Export written");
        Ok(path)
    }

    /// Read a file by name.
    pub async fn read(&self, name: &str) -> Result<String, BackupError> {
        Ok(fs::read_to_string(self.resolve_path(name)).await?)
    }

    /// List files, sorted by name. A missing directory lists as empty.
    pub async fn list(&self) -> Result<Vec<ExportEntry>, BackupError> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                entries.push(ExportEntry {
                    name: entry.file_name().to_string_lossy().to_string(),
                    size: metadata.len(),
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
