//! Storage Gateway
//!
//! Owns the shared directory tree used to hand files to and from the stage
//! services. Paths are always the storage root joined with one of the fixed
//! area names; file names come from [`StorageFile`].

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fleetflow_core::domain::storage::{StorageArea, StorageFile};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Filesystem failure, carrying the offending path
#[derive(Debug, Error)]
#[error("storage I/O failed for {}: {source}", .path.display())]
pub struct StorageError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StorageError {
    fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// File counts per storage area
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorageStats {
    pub input: usize,
    pub output: usize,
    pub temp: usize,
}

#[derive(Debug, Clone)]
pub struct StorageGateway {
    root: PathBuf,
}

impl StorageGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn area_dir(&self, area: StorageArea) -> PathBuf {
        self.root.join(area.dir_name())
    }

    /// Full path a derived file lives at
    pub fn path_for(&self, file: &StorageFile) -> PathBuf {
        self.area_dir(file.area()).join(file.file_name())
    }

    /// Create the root and every area directory
    pub async fn ensure_directories(&self) -> Result<()> {
        for area in StorageArea::ALL {
            let dir = self.area_dir(area);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StorageError::new(&dir, e))?;
        }
        tracing::debug!("Storage directories ready under {}", self.root.display());
        Ok(())
    }

    /// Write `content` to `area/file_name`, creating the area if needed
    pub async fn write(
        &self,
        area: StorageArea,
        file_name: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<PathBuf> {
        let dir = self.area_dir(area);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::new(&dir, e))?;

        let path = dir.join(file_name);
        let content = content.as_ref();
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StorageError::new(&path, e))?;

        tracing::info!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(path)
    }

    /// Write a file under its derived name
    pub async fn save(&self, file: &StorageFile, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        self.write(file.area(), &file.file_name(), content).await
    }

    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        tracing::debug!("Reading {}", path.display());
        tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::new(path, e))
    }

    pub async fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::new(path, e))
    }

    /// True if `path` exists and is a regular file
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        tokio::fs::metadata(path.as_ref())
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| StorageError::new(path, e))?;
        tracing::info!("Deleted {}", path.display());
        Ok(())
    }

    /// Remove files in `area` last modified more than `max_age` ago
    ///
    /// Best-effort: failures are logged and skipped. Returns the number of
    /// files removed.
    pub async fn cleanup_older_than(&self, area: StorageArea, max_age: Duration) -> usize {
        let dir = self.area_dir(area);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cleanup skipped, cannot list {}: {}", dir.display(), e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Cleanup of {} stopped early: {}", dir.display(), e);
                    break;
                }
            };

            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!("Removed stale file {}", path.display());
                    removed += 1;
                }
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        if removed > 0 {
            tracing::info!("Cleaned up {} file(s) from {}", removed, dir.display());
        }
        removed
    }

    /// Count files per area; a missing area counts as empty
    pub async fn stats(&self) -> StorageStats {
        StorageStats {
            input: self.count_files(StorageArea::Input).await,
            output: self.count_files(StorageArea::Output).await,
            temp: self.count_files(StorageArea::Temp).await,
        }
    }

    async fn count_files(&self, area: StorageArea) -> usize {
        let Ok(mut entries) = tokio::fs::read_dir(self.area_dir(area)).await else {
            return 0;
        };

        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry_is_file(&entry).await {
                count += 1;
            }
        }
        count
    }
}

async fn entry_is_file(entry: &tokio::fs::DirEntry) -> bool {
    entry.file_type().await.map(|t| t.is_file()).unwrap_or(false)
}

/// Periodically purge stale files from the temp area
pub fn spawn_cleanup_task(
    storage: StorageGateway,
    interval: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            "Starting temp cleanup task (interval: {:?}, max age: {:?})",
            interval,
            max_age
        );

        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            storage.cleanup_older_than(StorageArea::Temp, max_age).await;
        }
    })
}
