// Local-directory archive.
//
// A site is a directory under `<data_dir>/sites/<host>/`. Archive paths are
// resolved relative to that root and may not escape it. Writes land on disk
// immediately; commit syncs the root directory.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::traits::{Archive, ArchiveOpener, EntryStat};
use crate::error::StoreError;
use crate::site::url::{normalize_url, site_host};

pub struct LocalArchive {
    url: String,
    root: PathBuf,
}

impl LocalArchive {
    /// Open (creating if needed) the directory backing `url`.
    pub fn open(url: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create site directory {}", root.display()))?;
        Ok(Self {
            url: url.to_string(),
            root,
        })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(StoreError::Validation(format!(
                        "path escapes the site root: {path}"
                    )))
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl Archive for LocalArchive {
    fn url(&self) -> &str {
        &self.url
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| not_found_as(e, path))
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, data)
            .await
            .map_err(|e| not_found_as(e, path))
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let full = self.resolve(path)?;
        let mut dir = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| not_found_as(e, path))?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn stat(&self, path: &str) -> Result<EntryStat, StoreError> {
        let full = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| not_found_as(e, path))?;
        Ok(EntryStat {
            is_dir: meta.is_dir(),
            size: meta.len(),
        })
    }

    async fn mkdir(&self, path: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir(&full)
            .await
            .map_err(|e| not_found_as(e, path))
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let root = self.root.clone();
        // Directory fsync is not supported everywhere; opening it is enough
        // to surface a vanished root.
        let dir = tokio::fs::File::open(&root).await?;
        if let Err(e) = dir.sync_all().await {
            debug!(root = %root.display(), error = %e, "Directory sync unsupported");
        }
        Ok(())
    }
}

fn not_found_as(e: std::io::Error, path: &str) -> StoreError {
    match e.kind() {
        std::io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
        _ => StoreError::Io(format!("{path}: {e}")),
    }
}

/// Maps each site URL to `<data_dir>/sites/<host>/`.
pub struct LocalOpener {
    sites_dir: PathBuf,
}

impl LocalOpener {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            sites_dir: data_dir.join("sites"),
        }
    }

    pub fn site_dir(&self, url: &str) -> Result<PathBuf> {
        Ok(self.sites_dir.join(site_host(url)?))
    }
}

impl ArchiveOpener for LocalOpener {
    fn open(&self, url: &str) -> Result<Arc<dyn Archive>> {
        let origin = normalize_url(url)?;
        let archive = LocalArchive::open(&origin, self.site_dir(&origin)?)?;
        Ok(Arc::new(archive))
    }
}
