// Archive trait — the swap-ready abstraction over one site's store.
//
// Replication, persistence and conflict resolution live behind this trait.
// The aggregator only reads, lists, writes and commits. Implementors:
// MemoryArchive (in-process) and LocalArchive (a directory on disk).

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::StoreError;

/// Metadata for a single path in an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStat {
    pub is_dir: bool,
    pub size: u64,
}

/// One site's store. Paths are absolute within the archive (`/profile.json`).
#[async_trait]
pub trait Archive: Send + Sync {
    /// The URL this archive is published under.
    fn url(&self) -> &str;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), StoreError>;

    /// List the names (not full paths) of the entries in a directory.
    async fn readdir(&self, path: &str) -> Result<Vec<String>, StoreError>;

    async fn stat(&self, path: &str) -> Result<EntryStat, StoreError>;

    /// Create a single directory. Fails if it already exists.
    async fn mkdir(&self, path: &str) -> Result<(), StoreError>;

    /// Publish pending writes so other readers can see them.
    async fn commit(&self) -> Result<(), StoreError>;
}

/// Opens an archive for a site URL. Used by the registry when a site is
/// first referenced by URL rather than by an already-open archive.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<Arc<dyn Archive>>;
}
