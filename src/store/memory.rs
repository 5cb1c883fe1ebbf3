// In-process archive.
//
// Holds a site's files and directories in memory. Besides being the store the
// integration tests run against, it can be switched offline or given an
// artificial latency so partial-failure behavior can be exercised without a
// network.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{Archive, ArchiveOpener, EntryStat};
use crate::error::StoreError;
use crate::site::url::normalize_url;

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

pub struct MemoryArchive {
    url: String,
    state: Mutex<MemoryState>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    version: AtomicU64,
}

impl MemoryArchive {
    pub fn new(url: &str) -> Self {
        let mut state = MemoryState::default();
        state.dirs.insert("/".to_string());
        Self {
            url: url.to_string(),
            state: Mutex::new(state),
            offline: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            version: AtomicU64::new(0),
        }
    }

    /// While offline every call fails with an I/O error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every call by `latency` before it touches the data.
    pub fn set_latency(&self, latency: Option<Duration>) {
        let ms = latency.map(|d| d.as_millis() as u64).unwrap_or(0);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of commits so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Seed a file directly, creating any missing parent directories.
    /// Bypasses latency, offline mode and commit.
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        let path = clean_path(path);
        let mut state = self.lock();
        let mut dir = parent_of(&path);
        while dir != "/" {
            state.dirs.insert(dir.clone());
            dir = parent_of(&dir);
        }
        state.files.insert(path, data.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn gate(&self) -> Result<(), StoreError> {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Io(format!("{} is offline", self.url)));
        }
        Ok(())
    }
}

#[async_trait]
impl Archive for MemoryArchive {
    fn url(&self) -> &str {
        &self.url
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.gate().await?;
        let path = clean_path(path);
        let state = self.lock();
        state
            .files
            .get(&path)
            .cloned()
            .ok_or(StoreError::NotFound(path))
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.gate().await?;
        let path = clean_path(path);
        let mut state = self.lock();
        let parent = parent_of(&path);
        if !state.dirs.contains(&parent) {
            return Err(StoreError::NotFound(parent));
        }
        if state.dirs.contains(&path) {
            return Err(StoreError::Io(format!("{path} is a directory")));
        }
        state.files.insert(path, data.to_vec());
        Ok(())
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.gate().await?;
        let path = clean_path(path);
        let state = self.lock();
        if !state.dirs.contains(&path) {
            return Err(StoreError::NotFound(path));
        }
        let names: BTreeSet<String> = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|p| p.as_str() != "/" && parent_of(p) == path)
            .filter_map(|p| p.rsplit('/').next().map(str::to_string))
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn stat(&self, path: &str) -> Result<EntryStat, StoreError> {
        self.gate().await?;
        let path = clean_path(path);
        let state = self.lock();
        if let Some(data) = state.files.get(&path) {
            return Ok(EntryStat {
                is_dir: false,
                size: data.len() as u64,
            });
        }
        if state.dirs.contains(&path) {
            return Ok(EntryStat {
                is_dir: true,
                size: 0,
            });
        }
        Err(StoreError::NotFound(path))
    }

    async fn mkdir(&self, path: &str) -> Result<(), StoreError> {
        self.gate().await?;
        let path = clean_path(path);
        let mut state = self.lock();
        if state.dirs.contains(&path) || state.files.contains_key(&path) {
            return Err(StoreError::Io(format!("{path} already exists")));
        }
        let parent = parent_of(&path);
        if !state.dirs.contains(&parent) {
            return Err(StoreError::NotFound(parent));
        }
        state.dirs.insert(path);
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        self.gate().await?;
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one MemoryArchive per normalized URL.
#[derive(Default)]
pub struct MemoryOpener {
    archives: DashMap<String, Arc<MemoryArchive>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// The archive for `url`, created empty on first use.
    pub fn archive(&self, url: &str) -> Result<Arc<MemoryArchive>> {
        let key = normalize_url(url)?;
        Ok(self
            .archives
            .entry(key.clone())
            .or_insert_with(|| Arc::new(MemoryArchive::new(&key)))
            .clone())
    }
}

impl ArchiveOpener for MemoryOpener {
    fn open(&self, url: &str) -> Result<Arc<dyn Archive>> {
        let archive: Arc<dyn Archive> = self.archive(url)?;
        Ok(archive)
    }
}

fn clean_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}
